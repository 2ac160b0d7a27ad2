use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    auth::{Role, password},
    dto::users::{CreateUserRequest, UpdateUserRequest},
    entity::{
        Roles, Users, roles,
        user_roles::ActiveModel as UserRoleActive,
        users::{ActiveModel as UserActive, Column as UserCol, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Page},
    routes::params::{ListQuery, text_filter},
    services::{auth_service, loaders},
    state::AppState,
};

/// Roles that may manage any user record, not just their own.
const MANAGE_ANY_USER: &[Role] = &[Role::Admin];

async fn hydrate(state: &AppState, rows: Vec<UserModel>) -> AppResult<Vec<User>> {
    let ids: Vec<Uuid> = rows.iter().map(|u| u.id).collect();
    let mut roles = loaders::load_roles_by_user(&state.orm, &ids).await?;
    Ok(rows
        .into_iter()
        .map(|u| {
            let assigned = roles.remove(&u.id).unwrap_or_default();
            User::from_entity(u, assigned)
        })
        .collect())
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<User> {
    let model = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    hydrate(state, vec![model])
        .await?
        .pop()
        .ok_or(AppError::NotFound("User"))
}

pub async fn list_users(state: &AppState, query: ListQuery) -> AppResult<Page<User>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(search) = text_filter(&query.filter) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Username).ilike(pattern.clone()))
                .add(Expr::col(UserCol::Email).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await?;
    let rows = finder.limit(limit).offset(offset).all(&state.orm).await?;

    Ok(Page::new(hydrate(state, rows).await?, page, limit, total))
}

pub async fn get_user(state: &AppState, id: Uuid) -> AppResult<ApiResponse<User>> {
    Ok(ApiResponse::success("User", find_user(state, id).await?))
}

/// Resolve the role names for a new account. Anything beyond the plain
/// `User` role may only be granted by an Admin.
pub fn requested_roles(caller: &AuthUser, roles: Option<Vec<String>>) -> AppResult<Vec<String>> {
    let mut role_names = match roles {
        Some(names) if !names.is_empty() => names,
        _ => vec![Role::User.as_str().to_string()],
    };
    role_names.sort();
    role_names.dedup();
    if role_names != [Role::User.as_str()] {
        caller.require_any(MANAGE_ANY_USER)?;
    }
    Ok(role_names)
}

pub async fn create_user(
    state: &AppState,
    caller: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let CreateUserRequest {
        username,
        email,
        password,
        roles,
    } = payload;
    if username.trim().is_empty() || !email.contains('@') {
        return Err(AppError::BadRequest("Username and a valid email are required".into()));
    }
    if password.is_empty() {
        return Err(AppError::BadRequest("Password is required".into()));
    }
    let role_names = requested_roles(caller, roles)?;

    let password_hash = auth_service::hash_password(password).await?;

    let txn = state.orm.begin().await?;
    let role_rows = Roles::find()
        .filter(roles::Column::Name.is_in(role_names.clone()))
        .all(&txn)
        .await?;
    if role_rows.len() != role_names.len() {
        return Err(AppError::BadRequest("Unknown role".into()));
    }

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        created_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(|e| AppError::from_write(e, "Email or username is already taken"))?;

    for role in &role_rows {
        UserRoleActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            role_id: Set(role.id),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!(user_id = %user.id, created_by = %caller.user_id, roles = ?role_names, "user created");
    Ok(ApiResponse::success("User created", find_user(state, user.id).await?))
}

/// Decide what goes into `password_hash` for an update.
///
/// An explicit `password_hashed` flag wins. Without it the value is inspected
/// with [`password::looks_like_password_hash`].
pub async fn resolve_password(value: String, hashed: Option<bool>) -> AppResult<String> {
    match hashed {
        Some(true) if password::looks_like_password_hash(&value) => Ok(value),
        Some(true) => Err(AppError::BadRequest(
            "password_hashed is set but the value is not a password hash".into(),
        )),
        Some(false) => auth_service::hash_password(value).await,
        None if password::looks_like_password_hash(&value) => Ok(value),
        None => auth_service::hash_password(value).await,
    }
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    user.ensure_owner_or(id, MANAGE_ANY_USER)?;

    let existing = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let mut active: UserActive = existing.into();
    if let Some(username) = payload.username {
        if username.trim().is_empty() {
            return Err(AppError::BadRequest("Username must not be empty".into()));
        }
        active.username = Set(username.trim().to_string());
    }
    if let Some(email) = payload.email {
        if !email.contains('@') {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
        active.email = Set(email);
    }
    if let Some(value) = payload.password {
        active.password_hash = Set(resolve_password(value, payload.password_hashed).await?);
    }

    active
        .update(&state.orm)
        .await
        .map_err(|e| AppError::from_write(e, "Email or username is already taken"))?;

    Ok(ApiResponse::success("User updated", find_user(state, id).await?))
}

pub async fn delete_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<()>> {
    user.ensure_owner_or(id, MANAGE_ANY_USER)?;
    let result = Users::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound("User"));
    }
    tracing::info!(user_id = %id, deleted_by = %user.user_id, "user deleted");
    Ok(ApiResponse::message("User deleted"))
}

/// Re-hash any stored password that is not a password hash. Returns how many
/// rows were repaired.
pub async fn repair_plaintext_passwords(state: &AppState) -> AppResult<usize> {
    let rows = Users::find().all(&state.orm).await?;
    let mut repaired = 0;
    for row in rows {
        if password::looks_like_password_hash(&row.password_hash) {
            continue;
        }
        let id = row.id;
        let hash = auth_service::hash_password(row.password_hash.clone()).await?;
        let mut active: UserActive = row.into();
        active.password_hash = Set(hash);
        active.update(&state.orm).await?;
        tracing::warn!(user_id = %id, "stored password was not hashed; re-hashed");
        repaired += 1;
    }
    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_flag_keeps_a_real_hash() {
        let hash = password::hash_password("secret1").unwrap();
        let stored = resolve_password(hash.clone(), Some(true)).await.unwrap();
        assert_eq!(stored, hash);
    }

    #[tokio::test]
    async fn explicit_flag_rejects_plaintext_claimed_as_hash() {
        let result = resolve_password("secret1".into(), Some(true)).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn explicit_false_always_hashes() {
        let hash = password::hash_password("secret1").unwrap();
        let stored = resolve_password(hash.clone(), Some(false)).await.unwrap();
        assert_ne!(stored, hash);
        assert!(password::verify_password(&stored, &hash));
    }

    #[tokio::test]
    async fn heuristic_applies_without_flag() {
        let stored = resolve_password("secret1".into(), None).await.unwrap();
        assert!(password::verify_password(&stored, "secret1"));

        let again = resolve_password(stored.clone(), None).await.unwrap();
        assert_eq!(again, stored);
    }

    #[tokio::test]
    async fn phc_shaped_plaintext_is_hashed_without_flag() {
        for value in ["$argon2id$garbage", "$argon2i$mypassword", "$argon2id$v=19$hunter2"] {
            let stored = resolve_password(value.to_string(), None).await.unwrap();
            assert_ne!(stored, value);
            assert!(password::verify_password(&stored, value));
        }
    }

    fn caller(roles: &[Role]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            roles: roles.iter().copied().collect(),
        }
    }

    #[test]
    fn plain_user_may_only_create_plain_users() {
        let user = caller(&[Role::User]);
        assert_eq!(requested_roles(&user, None).unwrap(), vec!["User".to_string()]);
        assert_eq!(
            requested_roles(&user, Some(vec!["User".into(), "User".into()])).unwrap(),
            vec!["User".to_string()]
        );
        for roles in [vec!["Admin"], vec!["User", "Seller"], vec!["Support"]] {
            let roles = roles.into_iter().map(String::from).collect();
            assert!(matches!(
                requested_roles(&user, Some(roles)),
                Err(AppError::Forbidden)
            ));
        }
    }

    #[test]
    fn admin_may_grant_any_role() {
        let admin = caller(&[Role::Admin]);
        let roles = requested_roles(&admin, Some(vec!["Seller".into(), "Admin".into()])).unwrap();
        assert_eq!(roles, vec!["Admin".to_string(), "Seller".to_string()]);
    }
}
