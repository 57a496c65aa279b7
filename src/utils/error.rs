use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::utils::response::error as error_response;

/// Generic validation failure.
pub const CODE_VALIDATION: i32 = 1001;
/// Name or ticket conflict.
pub const CODE_CONFLICT: i32 = 1002;
pub const CODE_INSUFFICIENT_AVAILABILITY: i32 = 1005;
pub const CODE_ORDER_NOT_FOUND: i32 = 1006;
pub const CODE_ORDER_CANCELLED: i32 = 1007;
/// Authentication and authorization failures share one code.
pub const CODE_AUTH: i32 = 2001;
pub const CODE_INTERNAL: i32 = 500;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Validation error on {field}: {reason}")]
    ValidationError { field: &'static str, reason: String },

    #[error("Quantity must be a positive integer")]
    InvalidQuantity,

    #[error("Invalid date '{0}', the date does not exist")]
    InvalidDate(String),

    #[error("Visit date must be today or later")]
    PastDate,

    #[error("Missing order id")]
    MissingOrderId,

    #[error("At least one of quantity, date, status or ticket_id must be provided")]
    NoUpdateFields,

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Invalid pagination: page must be >= 1 and page_size within [1, 50]")]
    InvalidPagination,

    #[error("Ticket type not found")]
    TicketNotFound,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient ticket availability")]
    InsufficientAvailability,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Order is already cancelled and cannot be modified")]
    OrderAlreadyCancelled,

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        AppError::ValidationError {
            field,
            reason: reason.into(),
        }
    }

    /// Application code carried in the response envelope.
    pub fn code(&self) -> i32 {
        match self {
            AppError::MissingField(_)
            | AppError::ValidationError { .. }
            | AppError::InvalidQuantity
            | AppError::InvalidDate(_)
            | AppError::PastDate
            | AppError::MissingOrderId
            | AppError::NoUpdateFields
            | AppError::InvalidStatus(_)
            | AppError::InvalidPagination
            | AppError::TicketNotFound => CODE_VALIDATION,
            AppError::Conflict(_) => CODE_CONFLICT,
            AppError::InsufficientAvailability => CODE_INSUFFICIENT_AVAILABILITY,
            AppError::OrderNotFound => CODE_ORDER_NOT_FOUND,
            AppError::OrderAlreadyCancelled => CODE_ORDER_CANCELLED,
            AppError::AuthError(_) | AppError::Forbidden(_) => CODE_AUTH,
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => CODE_INTERNAL,
        }
    }

    /// Business outcomes always travel as HTTP 200; only internal failures do not.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::OK,
        }
    }

    pub fn is_internal(&self) -> bool {
        self.code() == CODE_INTERNAL
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(message = %msg, "Internal error");
            }
            other => {
                warn!(code = other.code(), message = %other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            err if err.is_internal() => "Internal server error".to_string(),
            AppError::ValidationError { reason, .. } => reason.clone(),
            other => other.to_string(),
        };

        error_response(code, public_message, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_family_shares_code() {
        for err in [
            AppError::MissingField("ticket_id"),
            AppError::InvalidQuantity,
            AppError::InvalidDate("2025-02-30".into()),
            AppError::PastDate,
            AppError::NoUpdateFields,
            AppError::InvalidStatus("refunded".into()),
            AppError::TicketNotFound,
        ] {
            assert_eq!(err.code(), CODE_VALIDATION);
            assert_eq!(err.status_code(), StatusCode::OK);
        }
    }

    #[test]
    fn test_documented_codes() {
        assert_eq!(AppError::Conflict("dup".into()).code(), 1002);
        assert_eq!(AppError::InsufficientAvailability.code(), 1005);
        assert_eq!(AppError::OrderNotFound.code(), 1006);
        assert_eq!(AppError::OrderAlreadyCancelled.code(), 1007);
        assert_eq!(AppError::Forbidden("no".into()).code(), 2001);
        assert_eq!(AppError::AuthError("no token".into()).code(), 2001);
    }

    #[test]
    fn test_internal_errors_use_server_status() {
        let err = AppError::InternalServerError("pool closed".into());
        assert!(err.is_internal());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
