use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::{auth::AuthError, response::ApiResponse};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(&'static str),

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    Conflict(String),

    #[error("Error creating order")]
    OrderCreation,

    #[error("Could not hash password")]
    Hashing,

    #[error("Could not generate token")]
    Token,

    #[error("Database error")]
    OrmError(#[from] DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    fn kind(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "validation",
            AppError::Unauthorized(_) => "unauthenticated",
            AppError::Forbidden => "forbidden",
            AppError::Conflict(_) => "conflict",
            AppError::OrderCreation => "order_creation",
            AppError::Hashing => "hashing",
            AppError::Token => "token",
            AppError::OrmError(_) => "storage",
            AppError::Internal(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::OrderCreation
            | AppError::Hashing
            | AppError::Token
            | AppError::OrmError(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Map a failed write, turning constraint violations into a conflict with
    /// `message` instead of a storage failure.
    pub fn from_write(err: DbErr, message: &str) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(_))
            | Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::Conflict(message.to_string())
            }
            _ => AppError::OrmError(err),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidToken => AppError::Unauthorized("Invalid or expired token"),
            AuthError::Hashing(detail) => {
                tracing::error!(error = %detail, "password hashing failed");
                AppError::Hashing
            }
            AuthError::Signing(err) => {
                tracing::error!(error = %err, "token signing failed");
                AppError::Token
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::OrmError(err) => tracing::error!(error = %err, "database error"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
            _ => {}
        }

        let status = self.status();
        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData { error: self.kind() }),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::NotFound("Product").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::BadRequest("Not enough stock".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Unauthorized("Missing Authorization header").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::Conflict("dup".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::OrderCreation.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_detail_is_not_in_the_message() {
        let err = AppError::OrmError(DbErr::Custom("relation \"users\" does not exist".into()));
        assert_eq!(err.to_string(), "Database error");
    }

    #[test]
    fn not_found_names_the_entity() {
        assert_eq!(AppError::NotFound("Order").to_string(), "Order not found");
    }

    #[test]
    fn invalid_token_maps_to_unauthorized() {
        let err: AppError = AuthError::InvalidToken.into();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }
}
