use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Role names to assign; `User` when omitted.
    pub roles: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// When set, says whether `password` is already a hash. When absent the
    /// value is inspected instead.
    pub password_hashed: Option<bool>,
}
