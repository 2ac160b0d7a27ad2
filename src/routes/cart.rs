use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::cart::{AddToCartRequest, UpdateCartItemRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Page},
    routes::params::CartQuery,
    services::cart_service,
    state::AppState,
};

const VIEW_CARTS: &[Role] = &[Role::Admin, Role::Support, Role::User];
const MANAGE_CART: &[Role] = &[Role::User];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart))
        .route("/{id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/cart-items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("user_id" = Option<Uuid>, Query, description = "Owner filter; ignored for plain users"),
        ("product_id" = Option<Uuid>, Query, description = "Only this product"),
        ("name" = Option<String>, Query, description = "Product name filter"),
    ),
    responses(
        (status = 200, description = "List cart items", body = Page<CartItem>)
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<CartQuery>,
) -> AppResult<Json<Page<CartItem>>> {
    user.require_any(VIEW_CARTS)?;
    Ok(Json(cart_service::list_cart(&state, &user, query).await?))
}

#[utoipa::path(
    post,
    path = "/cart-items",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Added to cart", body = ApiResponse<CartItem>),
        (status = 400, description = "Unknown product, not enough stock or already in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    user.require_any(MANAGE_CART)?;
    Ok(Json(cart_service::add_to_cart(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/cart-items/{id}",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated quantity", body = ApiResponse<CartItem>),
        (status = 400, description = "Not enough stock"),
        (status = 404, description = "Cart item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    user.require_any(MANAGE_CART)?;
    Ok(Json(
        cart_service::update_cart_item(&state, &user, id, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/cart-items/{id}",
    params(("id" = Uuid, Path, description = "Cart item ID")),
    responses(
        (status = 200, description = "Removed from cart"),
        (status = 404, description = "Cart item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_CART)?;
    Ok(Json(cart_service::remove_from_cart(&state, &user, id).await?))
}
