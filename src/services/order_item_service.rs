use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderItemRequest, UpdateOrderItemRequest},
    entity::{
        OrderItems, Orders, Products,
        order_items::{self, ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{ActiveModel as OrderActive, Model as OrderModel},
    },
    error::{AppError, AppResult},
    models::{OrderItem, OrderStatus},
    response::{ApiResponse, Page},
    routes::params::OrderItemQuery,
    services::{loaders, order_service::adjust_stock},
    state::AppState,
};

async fn hydrate(
    state: &AppState,
    rows: Vec<order_items::Model>,
) -> AppResult<Vec<OrderItem>> {
    let product_ids: Vec<Uuid> = rows.iter().map(|r| r.product_id).collect();
    let products = loaders::load_products(&state.orm, &product_ids).await?;
    Ok(rows
        .into_iter()
        .map(|row| {
            let product = products.get(&row.product_id).cloned();
            OrderItem::from_entity(row, product)
        })
        .collect())
}

async fn hydrate_one(state: &AppState, row: order_items::Model) -> AppResult<OrderItem> {
    hydrate(state, vec![row])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Order item"))
}

/// Lock the order and make sure its items may still change.
async fn lock_pending_order(txn: &DatabaseTransaction, order_id: Uuid) -> AppResult<OrderModel> {
    let order = Orders::find_by_id(order_id)
        .lock(LockType::Update)
        .one(txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    if order.status != OrderStatus::Pending.as_str() {
        return Err(AppError::BadRequest(
            "Only pending orders can be changed".into(),
        ));
    }
    Ok(order)
}

async fn add_to_total(
    txn: &DatabaseTransaction,
    order: OrderModel,
    delta: i64,
) -> AppResult<()> {
    let total = order.total.saturating_add(delta).max(0);
    let mut active: OrderActive = order.into();
    active.total = Set(total);
    active.update(txn).await?;
    Ok(())
}

pub async fn list_order_items(
    state: &AppState,
    query: OrderItemQuery,
) -> AppResult<Page<OrderItem>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(order_id) = query.order_id {
        condition = condition.add(OrderItemCol::OrderId.eq(order_id));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(OrderItemCol::ProductId.eq(product_id));
    }

    let finder = OrderItems::find()
        .filter(condition)
        .order_by_asc(OrderItemCol::OrderId);
    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    Ok(Page::new(hydrate(state, rows).await?, page, limit, total))
}

pub async fn create_order_item(
    state: &AppState,
    payload: CreateOrderItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be greater than 0".into()));
    }

    let txn = state.orm.begin().await?;
    let order = lock_pending_order(&txn, payload.order_id).await?;

    let product = Products::find_by_id(payload.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    if payload.quantity > product.stock {
        return Err(AppError::BadRequest("Not enough stock".into()));
    }

    let item = OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        product_id: Set(product.id),
        quantity: Set(payload.quantity),
        price: Set(product.price),
    }
    .insert(&txn)
    .await?;

    adjust_stock(&txn, product.id, -payload.quantity).await?;
    add_to_total(&txn, order, product.price.saturating_mul(i64::from(payload.quantity))).await?;

    txn.commit().await?;

    tracing::info!(order_id = %item.order_id, order_item_id = %item.id, "order item added");
    Ok(ApiResponse::success(
        "Order item added successfully",
        hydrate_one(state, item).await?,
    ))
}

pub async fn update_order_item(
    state: &AppState,
    id: Uuid,
    payload: UpdateOrderItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be greater than 0".into()));
    }

    let txn = state.orm.begin().await?;
    let item = OrderItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order item"))?;
    let order = lock_pending_order(&txn, item.order_id).await?;

    let product = Products::find_by_id(item.product_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Product"))?;
    let delta = payload.quantity - item.quantity;
    if delta > product.stock {
        return Err(AppError::BadRequest("Not enough stock".into()));
    }

    let price = item.price;
    let mut active: OrderItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&txn).await?;

    adjust_stock(&txn, product.id, -delta).await?;
    add_to_total(&txn, order, price.saturating_mul(i64::from(delta))).await?;

    txn.commit().await?;

    Ok(ApiResponse::success(
        "Order item updated successfully",
        hydrate_one(state, item).await?,
    ))
}

pub async fn delete_order_item(state: &AppState, id: Uuid) -> AppResult<ApiResponse<()>> {
    let txn = state.orm.begin().await?;
    let item = OrderItems::find_by_id(id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order item"))?;
    let order = lock_pending_order(&txn, item.order_id).await?;

    OrderItems::delete_by_id(id).exec(&txn).await?;
    adjust_stock(&txn, item.product_id, item.quantity).await?;
    add_to_total(&txn, order, -item.price.saturating_mul(i64::from(item.quantity))).await?;

    txn.commit().await?;

    tracing::info!(order_item_id = %id, "order item deleted");
    Ok(ApiResponse::message("Order item deleted successfully"))
}
