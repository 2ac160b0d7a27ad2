use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddUserRoleRequest {
    pub user_id: Uuid,
    pub role_id: Uuid,
}
