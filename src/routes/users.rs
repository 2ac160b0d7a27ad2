use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::users::{CreateUserRequest, UpdateUserRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Page},
    routes::params::ListQuery,
    services::user_service,
    state::AppState,
};

const CREATE_USERS: &[Role] = &[Role::Admin, Role::User];
const LIST_USERS: &[Role] = &[Role::Admin, Role::Support];
const VIEW_USER: &[Role] = &[Role::Admin, Role::Support, Role::Seller];
const MANAGE_USER: &[Role] = &[Role::Admin, Role::User];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/{id}", get(get_user).put(update_user).delete(delete_user))
}

#[utoipa::path(
    get,
    path = "/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("filter" = Option<String>, Query, description = "Matches username or email"),
    ),
    responses(
        (status = 200, description = "List users", body = Page<User>),
        (status = 403, description = "Admin or Support only"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Page<User>>> {
    user.require_any(LIST_USERS)?;
    Ok(Json(user_service::list_users(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Get user", body = ApiResponse<User>),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    user.require_any(VIEW_USER)?;
    Ok(Json(user_service::get_user(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 200, description = "Create user", body = ApiResponse<User>),
        (status = 403, description = "Only Admin may grant roles other than User"),
        (status = 409, description = "Email or username taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    user.require_any(CREATE_USERS)?;
    Ok(Json(user_service::create_user(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = ApiResponse<User>),
        (status = 403, description = "Not allowed to change this user"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    user.require_any(MANAGE_USER)?;
    Ok(Json(user_service::update_user(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "Deleted user"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_USER)?;
    Ok(Json(user_service::delete_user(&state, &user, id).await?))
}
