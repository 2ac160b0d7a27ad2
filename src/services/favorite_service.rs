use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::favorites::{AddFavoriteRequest, FavoriteCheckResponse},
    entity::{
        Products,
        favorite_items::{
            self, ActiveModel as FavoriteActive, Column as FavCol, Entity as FavoriteItems,
        },
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::FavoriteItem,
    response::{ApiResponse, Page},
    routes::params::{FavoriteCheckQuery, FavoriteDeleteQuery, FavoriteQuery, text_filter},
    services::loaders,
    state::AppState,
};

const VIEW_ANY_FAVORITES: &[Role] = &[Role::Admin, Role::Support];
const MANAGE_ANY_FAVORITES: &[Role] = &[Role::Admin];

async fn hydrate(
    state: &AppState,
    rows: Vec<favorite_items::Model>,
) -> AppResult<Vec<FavoriteItem>> {
    let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let products = loaders::load_products(&state.orm, &product_ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let product = products.get(&row.product_id).cloned();
            FavoriteItem::from_entity(row, product)
        })
        .collect())
}

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    query: FavoriteQuery,
) -> AppResult<Page<FavoriteItem>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(owner) = user.scope_to_owner(query.user_id, VIEW_ANY_FAVORITES) {
        condition = condition.add(FavCol::UserId.eq(owner));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(FavCol::ProductId.eq(product_id));
    }

    let mut finder = FavoriteItems::find().filter(condition);
    if let Some(search) = text_filter(&query.filter) {
        finder = finder
            .join(JoinType::InnerJoin, favorite_items::Relation::Products.def())
            .filter(Expr::col((Products, ProdCol::Name)).ilike(format!("%{}%", search)));
    }
    let finder = finder.order_by_desc(FavCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    Ok(Page::new(hydrate(state, rows).await?, page, limit, total))
}

pub async fn get_favorite(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<FavoriteItem>> {
    let row = FavoriteItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Favorite item"))?;
    user.ensure_owner_or(row.user_id, MANAGE_ANY_FAVORITES)?;

    let item = hydrate(state, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Favorite item"))?;
    Ok(ApiResponse::success("Favorite item", item))
}

pub async fn check_favorite(
    state: &AppState,
    user: &AuthUser,
    query: FavoriteCheckQuery,
) -> AppResult<FavoriteCheckResponse> {
    let owner = query.user_id.unwrap_or(user.user_id);
    user.ensure_owner_or(owner, VIEW_ANY_FAVORITES)?;

    let found = FavoriteItems::find()
        .filter(FavCol::UserId.eq(owner))
        .filter(FavCol::ProductId.eq(query.product_id))
        .one(&state.orm)
        .await?;

    Ok(FavoriteCheckResponse {
        favorited: found.is_some(),
        favorite_item_id: found.map(|f| f.id),
    })
}

pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<FavoriteItem>> {
    if Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::BadRequest("Product not found".into()));
    }

    let row = FavoriteActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        product_id: Set(payload.product_id),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_write(e, "Product already in favorites"))?;

    tracing::info!(user_id = %user.user_id, product_id = %row.product_id, "favorite added");
    let item = hydrate(state, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Favorite item"))?;
    Ok(ApiResponse::success("Added to favorites", item))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let row = FavoriteItems::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Favorite item"))?;
    user.ensure_owner_or(row.user_id, &[])?;

    FavoriteItems::delete_by_id(id).exec(&state.orm).await?;
    Ok(ApiResponse::message("Favorite item deleted"))
}

pub async fn remove_favorite_by_product(
    state: &AppState,
    user: &AuthUser,
    query: FavoriteDeleteQuery,
) -> AppResult<ApiResponse<()>> {
    let owner = query.user_id.unwrap_or(user.user_id);
    user.ensure_owner_or(owner, MANAGE_ANY_FAVORITES)?;

    let result = FavoriteItems::delete_many()
        .filter(FavCol::UserId.eq(owner))
        .filter(FavCol::ProductId.eq(query.product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Favorite item"));
    }
    Ok(ApiResponse::message("Favorite item deleted"))
}
