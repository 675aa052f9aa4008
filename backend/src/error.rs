//! Error handling for Inventa
//!
//! Every failure leaves the API as `{ success: false, code, message, field? }`
//! with a status code taken from the error category.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::{AllocationError, ReceiptError, TransitionError};
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    // Integrity errors
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Still referenced: {0}")]
    Referenced(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Data consistency error: {0}")]
    Consistency(String),

    #[error("Insufficient stock: {0}")]
    InsufficientStock(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[source] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a field-level validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        AppError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                return AppError::Referenced(db_err.table().unwrap_or("record").to_string());
            }
            if db_err.is_unique_violation() {
                return AppError::DuplicateEntry(db_err.constraint().unwrap_or("value").to_string());
            }
        }
        AppError::DatabaseError(err)
    }
}

impl From<AllocationError> for AppError {
    fn from(err: AllocationError) -> Self {
        AppError::validation(err.field(), err.to_string())
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        AppError::validation("received_qty", err.to_string())
    }
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::RoleNotAllowed { .. } => AppError::Forbidden(err.to_string()),
            TransitionError::Terminal { .. } | TransitionError::NotAllowed { .. } => {
                AppError::InvalidStateTransition(err.to_string())
            }
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        match field_errors.iter().next() {
            Some((field, errs)) => {
                let message = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| format!("{} is invalid", field));
                AppError::validation(field.to_string(), message)
            }
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, field: Option<String>) -> Self {
        Self {
            success: false,
            code: code.to_string(),
            message: message.into(),
            field,
        }
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, ErrorResponse) {
        match self {
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("TOKEN_EXPIRED", "Token has expired", None),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("INVALID_TOKEN", "Invalid token", None),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new("UNAUTHORIZED", msg.clone(), None),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                    None,
                ),
            ),
            AppError::Forbidden(msg) => (
                StatusCode::FORBIDDEN,
                ErrorResponse::new("FORBIDDEN", msg.clone(), None),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", message.clone(), Some(field.clone())),
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new("VALIDATION_ERROR", msg.clone(), None),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "DUPLICATE_ENTRY",
                    format!("A record with this {} already exists", field),
                    Some(field.clone()),
                ),
            ),
            AppError::Referenced(table) => (
                StatusCode::CONFLICT,
                ErrorResponse::new(
                    "REFERENCED",
                    format!("Cannot delete or modify: still referenced by {}", table),
                    None,
                ),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource), None),
            ),
            AppError::InvalidStateTransition(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("INVALID_STATE_TRANSITION", msg.clone(), None),
            ),
            AppError::Consistency(msg) => (
                StatusCode::CONFLICT,
                ErrorResponse::new("CONSISTENCY_ERROR", msg.clone(), None),
            ),
            AppError::InsufficientStock(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("INSUFFICIENT_STOCK", msg.clone(), None),
            ),
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred", None),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred", None),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_business_errors_map_to_client_statuses() {
        let cases = [
            (AppError::validation("targets", "bad"), StatusCode::BAD_REQUEST),
            (AppError::NotFound("Distribution".into()), StatusCode::NOT_FOUND),
            (
                AppError::InvalidStateTransition("not a draft".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (AppError::Consistency("missing assets".into()), StatusCode::CONFLICT),
            (AppError::Referenced("rooms".into()), StatusCode::CONFLICT),
            (AppError::Forbidden("nope".into()), StatusCode::FORBIDDEN),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_exposed() {
        let (status, body) = AppError::Internal("pool exhausted on host db-1".into()).status_and_body();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!body.message.contains("db-1"));
        assert!(!body.success);
    }

    #[test]
    fn test_allocation_error_conversion() {
        let err: AppError = AllocationError::SumMismatch {
            total: 5,
            allocated: 4,
        }
        .into();
        match err {
            AppError::Validation { field, message } => {
                assert_eq!(field, "total_quantity");
                assert!(message.contains("sum to 4"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err: AppError = AllocationError::DuplicateRoom(Uuid::nil()).into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "targets"));
    }

    #[test]
    fn test_transition_error_conversion() {
        let forbidden: AppError = TransitionError::RoleNotAllowed {
            role: "unit_staff",
            action: "approve_unit",
            from: "PENDING_UNIT",
        }
        .into();
        assert!(matches!(forbidden, AppError::Forbidden(_)));

        let invalid: AppError = TransitionError::Terminal {
            status: "COMPLETED",
        }
        .into();
        assert!(matches!(invalid, AppError::InvalidStateTransition(_)));
    }

    #[test]
    fn test_receipt_error_conversion() {
        let err: AppError = ReceiptError::ExceedsPending {
            requested: 7,
            pending: 6,
        }
        .into();
        assert!(matches!(err, AppError::Validation { ref field, .. } if field == "received_qty"));
    }
}
