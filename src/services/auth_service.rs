use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    auth::{Role, password},
    dto::auth::{LoginRequest, LoginResponse, ProfileResponse, RegisterRequest, RegisterResponse},
    entity::{
        Roles, Users, roles,
        user_roles::ActiveModel as UserRoleActive,
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    services::loaders,
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 6;

/// Hash on the blocking pool; Argon2 is deliberately slow.
pub async fn hash_password(plain: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AppError::Internal(e.into()))?
        .map_err(AppError::from)
}

pub async fn verify_password(hash: String, plain: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || password::verify_password(&hash, &plain))
        .await
        .map_err(|e| AppError::Internal(e.into()))
}

pub fn validate_registration(payload: &RegisterRequest) -> AppResult<Role> {
    if payload.username.trim().is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    if !payload.email.contains('@') {
        return Err(AppError::BadRequest("Invalid email".into()));
    }
    if payload.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    match payload.role.parse::<Role>() {
        Ok(role) if role.is_self_assignable() => Ok(role),
        _ => Err(AppError::BadRequest("Role must be User or Seller".into())),
    }
}

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<RegisterResponse> {
    let role = validate_registration(&payload)?;
    let RegisterRequest {
        username,
        email,
        password,
        ..
    } = payload;
    let username = username.trim().to_string();

    let exists = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(email.as_str()))
                .add(UserCol::Username.eq(username.as_str())),
        )
        .one(&state.orm)
        .await?;
    if exists.is_some() {
        return Err(AppError::BadRequest(
            "Email or username is already taken".into(),
        ));
    }

    let password_hash = hash_password(password).await?;

    let txn = state.orm.begin().await?;

    let role_row = Roles::find()
        .filter(roles::Column::Name.eq(role.as_str()))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("role {role} is not seeded")))?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        email: Set(email),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest("Email or username is already taken".into())
        }
        _ => AppError::OrmError(err),
    })?;

    UserRoleActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.id),
        role_id: Set(role_row.id),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(user_id = %user.id, %role, "user registered");

    let token = state.tokens.issue(user.id, &[role.as_str().to_string()])?;
    Ok(RegisterResponse {
        message: "User registered successfully".into(),
        token,
    })
}

pub async fn login_user(state: &AppState, payload: LoginRequest) -> AppResult<LoginResponse> {
    let LoginRequest { email, password } = payload;
    let invalid = || AppError::Unauthorized("Invalid email or password");

    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(user.password_hash.clone(), password).await? {
        tracing::debug!(user_id = %user.id, "password mismatch");
        return Err(invalid());
    }

    let roles = loaders::role_names(&state.orm, user.id).await?;
    let token = state.tokens.issue(user.id, &roles)?;
    Ok(LoginResponse { token })
}

pub async fn profile(state: &AppState, user: &AuthUser) -> AppResult<ProfileResponse> {
    let found = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(ProfileResponse {
        id: found.id,
        name: found.username,
        email: found.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(role: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: password.into(),
            role: role.into(),
        }
    }

    #[test]
    fn accepts_self_assignable_roles() {
        assert_eq!(validate_registration(&request("User", "secret1")).unwrap(), Role::User);
        assert_eq!(
            validate_registration(&request("Seller", "secret1")).unwrap(),
            Role::Seller
        );
    }

    #[test]
    fn rejects_privileged_or_unknown_roles() {
        assert!(validate_registration(&request("Admin", "secret1")).is_err());
        assert!(validate_registration(&request("Support", "secret1")).is_err());
        assert!(validate_registration(&request("Root", "secret1")).is_err());
    }

    #[test]
    fn rejects_short_password() {
        assert!(matches!(
            validate_registration(&request("User", "12345")),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn rejects_email_without_at() {
        let mut req = request("User", "secret1");
        req.email = "alice.example.com".into();
        assert!(validate_registration(&req).is_err());
    }

    #[tokio::test]
    async fn blocking_hash_verifies() {
        let hash = hash_password("secret1".into()).await.unwrap();
        assert!(verify_password(hash.clone(), "secret1".into()).await.unwrap());
        assert!(!verify_password(hash, "secret2".into()).await.unwrap());
    }
}
