use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Role names recognised by endpoint allow-lists.
///
/// The names match the rows seeded into the `roles` table. Other role rows
/// may exist in the store but never grant access to anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Admin,
    User,
    Seller,
    Support,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::User, Role::Seller, Role::Support];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::User => "User",
            Role::Seller => "Seller",
            Role::Support => "Support",
        }
    }

    /// Roles a caller may pick for themselves at registration.
    pub fn is_self_assignable(&self) -> bool {
        matches!(self, Role::User | Role::Seller)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role '{}'", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    // Exact match: role names are case-sensitive in the store.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
