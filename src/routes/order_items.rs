use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::orders::{CreateOrderItemRequest, UpdateOrderItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderItem,
    response::{ApiResponse, Page},
    routes::params::OrderItemQuery,
    services::order_item_service,
    state::AppState,
};

const VIEW_ORDER_ITEMS: &[Role] = &[Role::Admin, Role::Support, Role::Seller];
const MANAGE_ORDER_ITEMS: &[Role] = &[Role::Admin, Role::Seller];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_order_items).post(create_order_item))
        .route("/{id}", put(update_order_item).delete(delete_order_item))
}

#[utoipa::path(
    get,
    path = "/order-items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("order_id" = Option<Uuid>, Query, description = "Only items of this order"),
        ("product_id" = Option<Uuid>, Query, description = "Only items of this product"),
    ),
    responses(
        (status = 200, description = "List order items", body = Page<OrderItem>)
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn list_order_items(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderItemQuery>,
) -> AppResult<Json<Page<OrderItem>>> {
    user.require_any(VIEW_ORDER_ITEMS)?;
    Ok(Json(order_item_service::list_order_items(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/order-items",
    request_body = CreateOrderItemRequest,
    responses(
        (status = 200, description = "Order item added", body = ApiResponse<OrderItem>),
        (status = 400, description = "Order is not pending or not enough stock"),
        (status = 404, description = "Order or product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn create_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    user.require_any(MANAGE_ORDER_ITEMS)?;
    Ok(Json(
        order_item_service::create_order_item(&state, payload).await?,
    ))
}

#[utoipa::path(
    put,
    path = "/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateOrderItemRequest,
    responses(
        (status = 200, description = "Order item updated", body = ApiResponse<OrderItem>),
        (status = 400, description = "Order is not pending or not enough stock"),
        (status = 404, description = "Order item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn update_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItemRequest>,
) -> AppResult<Json<ApiResponse<OrderItem>>> {
    user.require_any(MANAGE_ORDER_ITEMS)?;
    Ok(Json(
        order_item_service::update_order_item(&state, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/order-items/{id}",
    params(("id" = Uuid, Path, description = "Order item ID")),
    responses(
        (status = 200, description = "Order item deleted"),
        (status = 400, description = "Order is not pending"),
        (status = 404, description = "Order item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Order items"
)]
pub async fn delete_order_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_ORDER_ITEMS)?;
    Ok(Json(order_item_service::delete_order_item(&state, id).await?))
}
