use std::{collections::HashSet, sync::Arc};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    auth::{Role, TokenIssuer},
    error::AppError,
};

/// The verified caller of a request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub roles: HashSet<Role>,
}

impl AuthUser {
    pub fn has_any(&self, allowed: &[Role]) -> bool {
        allowed.iter().any(|role| self.roles.contains(role))
    }

    pub fn require_any(&self, allowed: &[Role]) -> Result<(), AppError> {
        authorize(self, allowed)
    }

    /// Callers holding one of `privileged` may touch anyone's rows, others only their own.
    pub fn ensure_owner_or(&self, owner: Uuid, privileged: &[Role]) -> Result<(), AppError> {
        if owner == self.user_id || self.has_any(privileged) {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    /// Narrow a list filter to the caller's own rows unless they are privileged.
    pub fn scope_to_owner(&self, requested: Option<Uuid>, privileged: &[Role]) -> Option<Uuid> {
        if self.has_any(privileged) {
            requested
        } else {
            Some(self.user_id)
        }
    }
}

pub fn authorize(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if !user.has_any(allowed) {
        tracing::debug!(user_id = %user.user_id, ?allowed, "role check failed");
        return Err(AppError::Forbidden);
    }
    Ok(())
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<TokenIssuer>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or(AppError::Unauthorized("Missing Authorization header"))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header"))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized("Invalid Authorization scheme"))?;

        let issuer = Arc::<TokenIssuer>::from_ref(state);
        let identity = issuer.verify(token)?;

        let roles = identity
            .roles
            .iter()
            .filter_map(|name| name.parse::<Role>().ok())
            .collect();

        Ok(AuthUser {
            user_id: identity.user_id,
            roles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: &[Role]) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            roles: roles.iter().copied().collect(),
        }
    }

    #[test]
    fn any_shared_role_passes() {
        let user = caller(&[Role::User, Role::Seller]);
        assert!(authorize(&user, &[Role::Admin, Role::Seller]).is_ok());
    }

    #[test]
    fn disjoint_roles_are_forbidden() {
        let user = caller(&[Role::User]);
        assert!(matches!(
            authorize(&user, &[Role::Admin]),
            Err(AppError::Forbidden)
        ));
    }

    #[test]
    fn empty_role_set_is_forbidden() {
        let user = caller(&[]);
        assert!(user.require_any(&Role::ALL).is_err());
    }

    #[test]
    fn owner_passes_without_privilege() {
        let user = caller(&[Role::User]);
        assert!(user.ensure_owner_or(user.user_id, &[Role::Admin]).is_ok());
        assert!(user.ensure_owner_or(Uuid::new_v4(), &[Role::Admin]).is_err());
    }

    #[test]
    fn privileged_caller_reaches_other_rows() {
        let admin = caller(&[Role::Admin]);
        assert!(admin.ensure_owner_or(Uuid::new_v4(), &[Role::Admin]).is_ok());
    }

    #[test]
    fn scope_pins_unprivileged_callers_to_themselves() {
        let user = caller(&[Role::User]);
        let other = Uuid::new_v4();
        assert_eq!(
            user.scope_to_owner(Some(other), &[Role::Admin]),
            Some(user.user_id)
        );
        assert_eq!(user.scope_to_owner(None, &[Role::Admin]), Some(user.user_id));

        let support = caller(&[Role::Support]);
        assert_eq!(support.scope_to_owner(Some(other), &[Role::Support]), Some(other));
        assert_eq!(support.scope_to_owner(None, &[Role::Support]), None);
    }
}
