use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseTransaction, DbErr,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::orders::{LineItemRequest, PlaceOrderRequest, UpdateOrderRequest},
    entity::{
        OrderItems, Orders, Products, Users,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Model as OrderModel},
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{OrderDetail, OrderStatus},
    response::{ApiResponse, Page},
    routes::params::{OrderQuery, text_filter},
    services::loaders,
    state::AppState,
};

/// Roles that may read any user's orders.
pub const VIEW_ANY_ORDER: &[Role] = &[Role::Admin, Role::Support];
/// Roles that may place, change or delete orders on behalf of other users.
pub const MANAGE_ANY_ORDER: &[Role] = &[Role::Admin];

/// What a validated order header resolves to.
#[derive(Debug, PartialEq, Eq)]
pub struct OrderHeader {
    pub user_id: Uuid,
    pub status: OrderStatus,
    pub total: Option<i64>,
}

/// Checks that need no database access.
pub fn validate_header(caller: &AuthUser, payload: &PlaceOrderRequest) -> AppResult<OrderHeader> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest(
            "Order must contain at least one item".into(),
        ));
    }
    if payload.items.iter().any(|item| item.quantity <= 0) {
        return Err(AppError::BadRequest(
            "Quantity must be greater than 0".into(),
        ));
    }
    let status = match text_filter(&payload.status) {
        Some(value) => value
            .parse::<OrderStatus>()
            .map_err(AppError::BadRequest)?,
        None => OrderStatus::Pending,
    };
    // Cancelled is terminal and never restocks, so it cannot be a starting state.
    if status == OrderStatus::Cancelled {
        return Err(AppError::BadRequest(
            "An order cannot be created as cancelled".into(),
        ));
    }
    if payload.total.is_some_and(|total| total < 0) {
        return Err(AppError::BadRequest("Total must not be negative".into()));
    }

    let user_id = payload.user_id.unwrap_or(caller.user_id);
    caller.ensure_owner_or(user_id, MANAGE_ANY_ORDER)?;

    Ok(OrderHeader {
        user_id,
        status,
        total: payload.total,
    })
}

fn creation_failed(err: DbErr) -> AppError {
    tracing::error!(error = %err, "order write failed");
    AppError::OrderCreation
}

/// Lock the product row, check stock, write the line item at the current
/// price and take the quantity out of stock. Returns the line amount.
async fn write_line_item(
    txn: &DatabaseTransaction,
    order_id: Uuid,
    line: &LineItemRequest,
) -> AppResult<i64> {
    let product = Products::find_by_id(line.product_id)
        .lock(LockType::Update)
        .one(txn)
        .await
        .map_err(creation_failed)?
        .ok_or(AppError::NotFound("Product"))?;

    if line.quantity > product.stock {
        return Err(AppError::BadRequest("Not enough stock".into()));
    }

    OrderItemActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        product_id: Set(product.id),
        quantity: Set(line.quantity),
        price: Set(product.price),
    }
    .insert(txn)
    .await
    .map_err(creation_failed)?;

    adjust_stock(txn, product.id, -line.quantity)
        .await
        .map_err(creation_failed)?;

    product
        .price
        .checked_mul(i64::from(line.quantity))
        .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))
}

pub(crate) async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    delta: i32,
) -> Result<(), DbErr> {
    Products::update_many()
        .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).add(delta))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Put the stock of every line item of `order_id` back.
async fn restock(txn: &DatabaseTransaction, order_id: Uuid) -> Result<(), DbErr> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(txn)
        .await?;
    for item in items {
        adjust_stock(txn, item.product_id, item.quantity).await?;
    }
    Ok(())
}

async fn load_detail(state: &AppState, order: OrderModel) -> AppResult<OrderDetail> {
    loaders::load_order_details(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound("Order"))
}

/// Place an order: header and every line item are written in one
/// transaction, or not at all.
pub async fn place_order(
    state: &AppState,
    caller: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let header = validate_header(caller, &payload)?;

    if Users::find_by_id(header.user_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound("User"));
    }

    let txn = state.orm.begin().await.map_err(creation_failed)?;

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(header.user_id),
        order_date: Set(Utc::now().into()),
        status: Set(header.status.as_str().to_string()),
        total: Set(header.total.unwrap_or(0)),
    }
    .insert(&txn)
    .await
    .map_err(creation_failed)?;

    let mut computed: i64 = 0;
    for line in &payload.items {
        let amount = write_line_item(&txn, order.id, line).await?;
        computed = computed
            .checked_add(amount)
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))?;
    }

    let order = if header.total.is_none() {
        let mut active: OrderActive = order.into();
        active.total = Set(computed);
        active.update(&txn).await.map_err(creation_failed)?
    } else {
        order
    };

    txn.commit().await.map_err(creation_failed)?;

    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        items = payload.items.len(),
        total = order.total,
        "order placed"
    );

    Ok(ApiResponse::success(
        "Order created successfully",
        load_detail(state, order).await?,
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderQuery,
) -> AppResult<Page<OrderDetail>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(owner) = user.scope_to_owner(query.user_id, VIEW_ANY_ORDER) {
        condition = condition.add(OrderCol::UserId.eq(owner));
    }
    if let Some(status) = text_filter(&query.status) {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::OrderDate);
    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    let items = loaders::load_order_details(&state.orm, rows).await?;
    Ok(Page::new(items, page, limit, total))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.ensure_owner_or(order.user_id, VIEW_ANY_ORDER)?;

    Ok(ApiResponse::success("Order", load_detail(state, order).await?))
}

pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderRequest,
) -> AppResult<ApiResponse<OrderDetail>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.ensure_owner_or(order.user_id, MANAGE_ANY_ORDER)?;

    let current = order
        .status
        .parse::<OrderStatus>()
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
    let mut active: OrderActive = order.into();

    if let Some(value) = text_filter(&payload.status) {
        let next = value.parse::<OrderStatus>().map_err(AppError::BadRequest)?;
        if !current.can_transition_to(next) {
            return Err(AppError::BadRequest(format!(
                "Cannot change order status from {current} to {next}"
            )));
        }
        if current != next && next == OrderStatus::Cancelled {
            restock(&txn, id).await?;
        }
        active.status = Set(next.as_str().to_string());
    }

    if let Some(total) = payload.total {
        user.require_any(MANAGE_ANY_ORDER)?;
        if total < 0 {
            return Err(AppError::BadRequest("Total must not be negative".into()));
        }
        active.total = Set(total);
    }

    let order = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, status = %order.status, "order updated");
    Ok(ApiResponse::success(
        "Order updated successfully",
        load_detail(state, order).await?,
    ))
}

pub async fn delete_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.ensure_owner_or(order.user_id, MANAGE_ANY_ORDER)?;

    if order.status == OrderStatus::Pending.as_str() {
        restock(&txn, id).await?;
    }

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %id, deleted_by = %user.user_id, "order deleted");
    Ok(ApiResponse::message("Order deleted successfully"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn caller(roles: &[Role]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            roles: roles.iter().copied().collect::<HashSet<_>>(),
        }
    }

    fn request(items: Vec<LineItemRequest>) -> PlaceOrderRequest {
        PlaceOrderRequest {
            user_id: None,
            status: None,
            total: None,
            items,
        }
    }

    fn line(quantity: i32) -> LineItemRequest {
        LineItemRequest {
            product_id: Uuid::new_v4(),
            quantity,
        }
    }

    #[test]
    fn defaults_to_caller_and_pending() {
        let user = caller(&[Role::User]);
        let header = validate_header(&user, &request(vec![line(2)])).unwrap();
        assert_eq!(
            header,
            OrderHeader {
                user_id: user.user_id,
                status: OrderStatus::Pending,
                total: None,
            }
        );
    }

    #[test]
    fn rejects_empty_orders() {
        let user = caller(&[Role::User]);
        assert!(matches!(
            validate_header(&user, &request(vec![])),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_non_positive_quantity() {
        let user = caller(&[Role::User]);
        assert!(validate_header(&user, &request(vec![line(1), line(0)])).is_err());
    }

    #[test]
    fn rejects_unknown_status_and_negative_total() {
        let user = caller(&[Role::User]);
        let mut req = request(vec![line(1)]);
        req.status = Some("paid".into());
        assert!(validate_header(&user, &req).is_err());

        let mut req = request(vec![line(1)]);
        req.total = Some(-1);
        assert!(validate_header(&user, &req).is_err());
    }

    #[test]
    fn cannot_start_cancelled() {
        let user = caller(&[Role::Admin]);
        let mut req = request(vec![line(1)]);
        req.status = Some("cancelled".into());
        assert!(matches!(
            validate_header(&user, &req),
            Err(AppError::BadRequest(_))
        ));

        req.status = Some("shipped".into());
        assert_eq!(
            validate_header(&user, &req).unwrap().status,
            OrderStatus::Shipped
        );
    }

    #[test]
    fn only_admin_orders_for_someone_else() {
        let other = Uuid::new_v4();

        let mut req = request(vec![line(1)]);
        req.user_id = Some(other);
        assert!(matches!(
            validate_header(&caller(&[Role::Seller]), &req),
            Err(AppError::Forbidden)
        ));

        let header = validate_header(&caller(&[Role::Admin]), &req).unwrap();
        assert_eq!(header.user_id, other);
    }

    #[test]
    fn supplied_status_and_total_are_kept() {
        let user = caller(&[Role::User]);
        let mut req = request(vec![line(1)]);
        req.status = Some("shipped".into());
        req.total = Some(1500);
        let header = validate_header(&user, &req).unwrap();
        assert_eq!(header.status, OrderStatus::Shipped);
        assert_eq!(header.total, Some(1500));
    }
}
