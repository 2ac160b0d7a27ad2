use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::roles::{AddUserRoleRequest, RoleRequest},
    entity::{
        Roles, UserRoles, Users,
        roles::{ActiveModel as RoleActive, Column as RoleCol},
        user_roles::{ActiveModel as UserRoleActive, Column as UserRoleCol},
    },
    error::{AppError, AppResult},
    models::{Role, UserRole},
    response::{ApiResponse, Page},
    routes::params::{Pagination, UserRoleQuery},
    state::AppState,
};

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Role name is required".into()));
    }
    Ok(name.to_string())
}

pub async fn list_roles(state: &AppState, pagination: Pagination) -> AppResult<Page<Role>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Roles::find().order_by_asc(RoleCol::Name);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Role::from)
        .collect();
    Ok(Page::new(items, page, limit, total))
}

pub async fn get_role(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Role>> {
    let role = Roles::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Role"))?;
    Ok(ApiResponse::success("Role", role.into()))
}

pub async fn create_role(state: &AppState, payload: RoleRequest) -> AppResult<ApiResponse<Role>> {
    let role = RoleActive {
        id: Set(Uuid::new_v4()),
        name: Set(validate_name(&payload.name)?),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_write(e, "Role already exists"))?;
    tracing::info!(role = %role.name, "role created");
    Ok(ApiResponse::success("Role created", role.into()))
}

pub async fn update_role(
    state: &AppState,
    id: Uuid,
    payload: RoleRequest,
) -> AppResult<ApiResponse<Role>> {
    let existing = Roles::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Role"))?;
    let mut active: RoleActive = existing.into();
    active.name = Set(validate_name(&payload.name)?);
    let role = active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::from_write(e, "Role already exists"))?;
    Ok(ApiResponse::success("Role updated", role.into()))
}

pub async fn delete_role(state: &AppState, id: Uuid) -> AppResult<ApiResponse<()>> {
    let result = Roles::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Role"));
    }
    tracing::info!(role_id = %id, "role deleted");
    Ok(ApiResponse::message("Role deleted"))
}

pub async fn list_user_roles(
    state: &AppState,
    query: UserRoleQuery,
) -> AppResult<Page<UserRole>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(UserRoleCol::UserId.eq(user_id));
    }
    if let Some(role_id) = query.role_id {
        condition = condition.add(UserRoleCol::RoleId.eq(role_id));
    }

    let finder = UserRoles::find()
        .filter(condition)
        .order_by_asc(UserRoleCol::UserId);
    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(limit)
        .offset(offset)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(UserRole::from)
        .collect();
    Ok(Page::new(items, page, limit, total))
}

pub async fn add_user_role(
    state: &AppState,
    payload: AddUserRoleRequest,
) -> AppResult<ApiResponse<UserRole>> {
    if Users::find_by_id(payload.user_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound("User"));
    }
    if Roles::find_by_id(payload.role_id).one(&state.orm).await?.is_none() {
        return Err(AppError::NotFound("Role"));
    }

    let link = UserRoleActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(payload.user_id),
        role_id: Set(payload.role_id),
    }
    .insert(&state.orm)
    .await
    .map_err(|e| AppError::from_write(e, "User already has this role"))?;

    tracing::info!(user_id = %link.user_id, role_id = %link.role_id, "role assigned");
    Ok(ApiResponse::success("Role assigned", link.into()))
}

pub async fn remove_user_role(
    state: &AppState,
    user_id: Uuid,
    role_id: Uuid,
) -> AppResult<ApiResponse<()>> {
    let result = UserRoles::delete_many()
        .filter(UserRoleCol::UserId.eq(user_id))
        .filter(UserRoleCol::RoleId.eq(role_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User role"));
    }
    tracing::info!(%user_id, %role_id, "role revoked");
    Ok(ApiResponse::message("User role deleted"))
}
