use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::categories::CreateCategoryRequest,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Category,
    response::{ApiResponse, Page},
    routes::params::ListQuery,
    services::category_service,
    state::AppState,
};

const MANAGE_CATEGORIES: &[Role] = &[Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", get(get_category))
}

#[utoipa::path(
    get,
    path = "/categories",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("filter" = Option<String>, Query, description = "Case-insensitive name filter"),
    ),
    responses(
        (status = 200, description = "List categories", body = Page<Category>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<Category>>> {
    Ok(Json(category_service::list_categories(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Get category", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(category_service::get_category(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Create category", body = ApiResponse<Category>),
        (status = 403, description = "Admin only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    user.require_any(MANAGE_CATEGORIES)?;
    Ok(Json(category_service::create_category(&state, payload).await?))
}
