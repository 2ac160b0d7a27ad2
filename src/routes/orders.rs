use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::orders::{PlaceOrderRequest, UpdateOrderRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderDetail,
    response::{ApiResponse, Page},
    routes::params::OrderQuery,
    services::order_service,
    state::AppState,
};

const PLACE_ORDERS: &[Role] = &[Role::Admin, Role::User, Role::Seller];
const VIEW_ORDERS: &[Role] = &[Role::Admin, Role::Support, Role::User];
const MANAGE_ORDERS: &[Role] = &[Role::Admin, Role::User];

pub fn route() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route(
            "/{id}",
            get(get_order).put(update_order).delete(delete_order),
        )
}

#[utoipa::path(
    get,
    path = "/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("user_id" = Option<Uuid>, Query, description = "Owner filter; ignored for plain users"),
        ("status" = Option<String>, Query, description = "Only orders in this status"),
    ),
    responses(
        (status = 200, description = "List orders", body = Page<OrderDetail>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<Page<OrderDetail>>> {
    user.require_any(VIEW_ORDERS)?;
    Ok(Json(order_service::list_orders(&state, &user, query).await?))
}

#[utoipa::path(
    post,
    path = "/orders",
    request_body = PlaceOrderRequest,
    responses(
        (status = 200, description = "Order placed", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Invalid order or not enough stock"),
        (status = 404, description = "User or product not found"),
        (status = 500, description = "Error creating order"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PlaceOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    user.require_any(PLACE_ORDERS)?;
    Ok(Json(order_service::place_order(&state, &user, payload).await?))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Get order", body = ApiResponse<OrderDetail>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    user.require_any(VIEW_ORDERS)?;
    Ok(Json(order_service::get_order(&state, &user, id).await?))
}

#[utoipa::path(
    put,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderRequest,
    responses(
        (status = 200, description = "Updated order", body = ApiResponse<OrderDetail>),
        (status = 400, description = "Status change not allowed"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderRequest>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    user.require_any(MANAGE_ORDERS)?;
    Ok(Json(
        order_service::update_order(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Deleted order and its items"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_ORDERS)?;
    Ok(Json(order_service::delete_order(&state, &user, id).await?))
}
