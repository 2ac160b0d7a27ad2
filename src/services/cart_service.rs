use sea_orm::sea_query::{Expr, LockType};
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    entity::{
        Products,
        cart_items::{self, ActiveModel as CartActive, Column as CartCol, Entity as CartItems},
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Page},
    routes::params::{CartQuery, text_filter},
    services::loaders,
    state::AppState,
};

/// Roles that may read other users' carts.
const VIEW_ANY_CART: &[Role] = &[Role::Admin, Role::Support];

async fn hydrate(state: &AppState, rows: Vec<cart_items::Model>) -> AppResult<Vec<CartItem>> {
    let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let products = loaders::load_products(&state.orm, &product_ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let product = products.get(&row.product_id).cloned();
            CartItem::from_entity(row, product)
        })
        .collect())
}

async fn hydrate_one(state: &AppState, row: cart_items::Model) -> AppResult<CartItem> {
    hydrate(state, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Cart item"))
}

pub async fn list_cart(
    state: &AppState,
    user: &AuthUser,
    query: CartQuery,
) -> AppResult<Page<CartItem>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(owner) = user.scope_to_owner(query.user_id, VIEW_ANY_CART) {
        condition = condition.add(CartCol::UserId.eq(owner));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(CartCol::ProductId.eq(product_id));
    }

    let mut finder = CartItems::find().filter(condition);
    if let Some(search) = text_filter(&query.name) {
        finder = finder
            .join(JoinType::InnerJoin, cart_items::Relation::Products.def())
            .filter(Expr::col((Products, ProdCol::Name)).ilike(format!("%{}%", search)));
    }
    let finder = finder.order_by_desc(CartCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    Ok(Page::new(hydrate(state, rows).await?, page, limit, total))
}

pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let product = Products::find_by_id(payload.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Product not found".into()))?;

    if payload.quantity > product.stock {
        return Err(AppError::BadRequest("Not enough stock".into()));
    }

    let exists = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::ProductId.eq(payload.product_id))
        .one(&txn)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest("Product already in cart".into()));
    }

    let item = CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        quantity: Set(payload.quantity),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::from_write(e, "Product already in cart"))?;

    txn.commit().await?;

    tracing::info!(user_id = %user.user_id, product_id = %item.product_id, "added to cart");
    Ok(ApiResponse::success("Added to cart", hydrate_one(state, item).await?))
}

pub async fn update_cart_item(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest(
            "Quantity must be greater than 0".to_string(),
        ));
    }

    let txn = state.orm.begin().await?;

    let item = CartItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Cart item"))?;
    user.ensure_owner_or(item.user_id, &[])?;

    let product = Products::find_by_id(item.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if payload.quantity > product.stock {
        return Err(AppError::BadRequest("Not enough stock".into()));
    }

    let mut active: CartActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&txn).await?;

    txn.commit().await?;

    Ok(ApiResponse::success("Cart item updated", hydrate_one(state, item).await?))
}

pub async fn remove_from_cart(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let item = CartItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Cart item"))?;
    user.ensure_owner_or(item.user_id, &[])?;

    CartItems::delete_by_id(id).exec(&state.orm).await?;

    tracing::info!(user_id = %user.user_id, cart_item_id = %id, "removed from cart");
    Ok(ApiResponse::message("Cart item deleted"))
}
