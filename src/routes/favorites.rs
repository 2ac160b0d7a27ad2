use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::favorites::{AddFavoriteRequest, FavoriteCheckResponse},
    error::AppResult,
    middleware::auth::AuthUser,
    models::FavoriteItem,
    response::{ApiResponse, Page},
    routes::params::{FavoriteCheckQuery, FavoriteDeleteQuery, FavoriteQuery},
    services::favorite_service,
    state::AppState,
};

const LIST_FAVORITES: &[Role] = &[Role::Admin, Role::Support, Role::User];
const VIEW_FAVORITE: &[Role] = &[Role::Admin, Role::User];
const CHECK_FAVORITE: &[Role] = &[Role::Admin, Role::Support, Role::User, Role::Seller];
const MANAGE_FAVORITES: &[Role] = &[Role::User];
const REMOVE_BY_PRODUCT: &[Role] = &[Role::Admin, Role::User];

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_favorites)
                .post(add_favorite)
                .delete(remove_favorite_by_product),
        )
        .route("/check", get(check_favorite))
        .route("/{id}", get(get_favorite).delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/favorite-items",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("user_id" = Option<Uuid>, Query, description = "Owner filter; ignored for plain users"),
        ("product_id" = Option<Uuid>, Query, description = "Only this product"),
        ("filter" = Option<String>, Query, description = "Product name filter"),
    ),
    responses(
        (status = 200, description = "List favorites", body = Page<FavoriteItem>)
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<FavoriteQuery>,
) -> AppResult<Json<Page<FavoriteItem>>> {
    user.require_any(LIST_FAVORITES)?;
    Ok(Json(
        favorite_service::list_favorites(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/favorite-items/{id}",
    params(("id" = Uuid, Path, description = "Favorite item ID")),
    responses(
        (status = 200, description = "Get favorite", body = ApiResponse<FavoriteItem>),
        (status = 404, description = "Favorite item not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn get_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<FavoriteItem>>> {
    user.require_any(VIEW_FAVORITE)?;
    Ok(Json(favorite_service::get_favorite(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/favorite-items/check",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Defaults to the caller"),
        ("product_id" = Uuid, Query, description = "Product to look up"),
    ),
    responses(
        (status = 200, description = "Whether the product is a favorite", body = FavoriteCheckResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn check_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<FavoriteCheckQuery>,
) -> AppResult<Json<FavoriteCheckResponse>> {
    user.require_any(CHECK_FAVORITE)?;
    Ok(Json(
        favorite_service::check_favorite(&state, &user, query).await?,
    ))
}

#[utoipa::path(
    post,
    path = "/favorite-items",
    request_body = AddFavoriteRequest,
    responses(
        (status = 200, description = "Added to favorites", body = ApiResponse<FavoriteItem>),
        (status = 400, description = "Product not found"),
        (status = 409, description = "Already a favorite"),
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFavoriteRequest>,
) -> AppResult<Json<ApiResponse<FavoriteItem>>> {
    user.require_any(MANAGE_FAVORITES)?;
    Ok(Json(
        favorite_service::add_favorite(&state, &user, payload).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/favorite-items/{id}",
    params(("id" = Uuid, Path, description = "Favorite item ID")),
    responses(
        (status = 200, description = "Removed from favorites"),
        (status = 404, description = "Favorite item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_FAVORITES)?;
    Ok(Json(
        favorite_service::remove_favorite(&state, &user, id).await?,
    ))
}

#[utoipa::path(
    delete,
    path = "/favorite-items",
    params(
        ("user_id" = Option<Uuid>, Query, description = "Defaults to the caller"),
        ("product_id" = Uuid, Query, description = "Product to un-favorite"),
    ),
    responses(
        (status = 200, description = "Removed from favorites"),
        (status = 404, description = "Favorite item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite_by_product(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<FavoriteDeleteQuery>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(REMOVE_BY_PRODUCT)?;
    Ok(Json(
        favorite_service::remove_favorite_by_product(&state, &user, query).await?,
    ))
}
