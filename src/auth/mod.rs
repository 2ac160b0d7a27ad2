//! Credentials and session tokens.
//!
//! Password hashing, signed session tokens and the closed set of role names
//! the authorization gate understands.

pub mod password;
pub mod roles;
pub mod token;

pub use roles::Role;
pub use token::{Identity, TokenIssuer};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token signing failed: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}
