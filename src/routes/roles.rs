use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    auth::Role,
    dto::roles::{AddUserRoleRequest, RoleRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{self, UserRole},
    response::{ApiResponse, Page},
    routes::params::{Pagination, UserRoleQuery},
    services::role_service,
    state::AppState,
};

const MANAGE_ROLES: &[Role] = &[Role::Admin];

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/roles", get(list_roles).post(create_role))
        .route(
            "/roles/{id}",
            get(get_role).put(update_role).delete(delete_role),
        )
        .route("/user-roles", get(list_user_roles).post(add_user_role))
        .route("/user-roles/{user_id}/{role_id}", delete(remove_user_role))
}

#[utoipa::path(
    get,
    path = "/roles",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
    ),
    responses((status = 200, description = "List roles", body = Page<models::Role>)),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn list_roles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<Page<models::Role>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::list_roles(&state, pagination).await?))
}

#[utoipa::path(
    get,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Get role", body = ApiResponse<models::Role>),
        (status = 404, description = "Role not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn get_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<models::Role>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::get_role(&state, id).await?))
}

#[utoipa::path(
    post,
    path = "/roles",
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Create role", body = ApiResponse<models::Role>),
        (status = 409, description = "Role already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn create_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RoleRequest>,
) -> AppResult<Json<ApiResponse<models::Role>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::create_role(&state, payload).await?))
}

#[utoipa::path(
    put,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = RoleRequest,
    responses(
        (status = 200, description = "Renamed role", body = ApiResponse<models::Role>),
        (status = 404, description = "Role not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn update_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleRequest>,
) -> AppResult<Json<ApiResponse<models::Role>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::update_role(&state, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Deleted role"),
        (status = 404, description = "Role not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn delete_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::delete_role(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/user-roles",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("limit" = Option<i64>, Query, description = "Items per page, default 10, max 100"),
        ("user_id" = Option<Uuid>, Query, description = "Only assignments of this user"),
        ("role_id" = Option<Uuid>, Query, description = "Only assignments of this role"),
    ),
    responses((status = 200, description = "List role assignments", body = Page<UserRole>)),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn list_user_roles(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserRoleQuery>,
) -> AppResult<Json<Page<UserRole>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::list_user_roles(&state, query).await?))
}

#[utoipa::path(
    post,
    path = "/user-roles",
    request_body = AddUserRoleRequest,
    responses(
        (status = 200, description = "Role assigned", body = ApiResponse<UserRole>),
        (status = 404, description = "User or role not found"),
        (status = 409, description = "Already assigned"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn add_user_role(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddUserRoleRequest>,
) -> AppResult<Json<ApiResponse<UserRole>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(role_service::add_user_role(&state, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/user-roles/{user_id}/{role_id}",
    params(
        ("user_id" = Uuid, Path, description = "User ID"),
        ("role_id" = Uuid, Path, description = "Role ID"),
    ),
    responses(
        (status = 200, description = "Role revoked"),
        (status = 404, description = "Assignment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Roles"
)]
pub async fn remove_user_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path((user_id, role_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<ApiResponse<()>>> {
    user.require_any(MANAGE_ROLES)?;
    Ok(Json(
        role_service::remove_user_role(&state, user_id, role_id).await?,
    ))
}
