//! Error type shared by the services and the HTTP API.
//!
//! Permission failures render exactly like missing resources, so a caller
//! cannot tell private courses or receipts from missing ones.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use domain::DomainError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// Reported to clients as `NotFound`.
    #[error("Resource not found")]
    PermissionDenied,

    #[error("Resource not found")]
    NotFound,

    /// A request that contradicts existing state, e.g. buying an owned product.
    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid input: {0}")]
    BadRequest(String),

    #[cfg(feature = "database")]
    #[error("Database error")]
    Database(#[from] sea_orm::DbErr),

    #[cfg(feature = "jwt")]
    #[error("Invalid or expired token")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[cfg(feature = "cache")]
    #[error("Cache error")]
    Cache(#[from] redis::RedisError),

    #[cfg(feature = "http-client")]
    #[error("Payment processor request failed")]
    Http(#[from] reqwest::Error),

    #[error("{0} is unavailable")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::PermissionDenied | AppError::NotFound => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            #[cfg(feature = "database")]
            AppError::Database(_) => "DATABASE_ERROR",
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => "AUTH_ERROR",
            #[cfg(feature = "cache")]
            AppError::Cache(_) => "CACHE_ERROR",
            #[cfg(feature = "http-client")]
            AppError::Http(_) => "UPSTREAM_ERROR",
            AppError::ServiceUnavailable(_) => "SERVICE_UNAVAILABLE",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            #[cfg(feature = "jwt")]
            AppError::Jwt(_) => StatusCode::UNAUTHORIZED,
            AppError::PermissionDenied | AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            #[cfg(feature = "http-client")]
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True when the caller, not the system, is at fault.
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Message safe to show to clients. Infrastructure details are logged
    /// here and replaced by a generic message.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) | AppError::BadRequest(msg) | AppError::Conflict(msg) => {
                msg.clone()
            }
            #[cfg(feature = "database")]
            AppError::Database(e) => hidden("database", e, "A database error occurred"),
            #[cfg(feature = "jwt")]
            AppError::Jwt(e) => {
                tracing::debug!(error = %e, "Token rejected");
                self.to_string()
            }
            #[cfg(feature = "cache")]
            AppError::Cache(e) => hidden("cache", e, "A cache error occurred"),
            #[cfg(feature = "http-client")]
            AppError::Http(e) => hidden("payments", e, "The payment processor is unavailable"),
            AppError::Internal(msg) => hidden("internal", msg, "An internal error occurred"),
            _ => self.to_string(),
        }
    }
}

fn hidden(source: &str, detail: &dyn std::fmt::Debug, message: &str) -> String {
    tracing::error!(source, detail = ?detail, "Request failed");
    message.to_string()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorEnvelope {
            error: ErrorBody {
                code: self.code(),
                message: self.user_message(),
            },
        };

        (self.status(), Json(body)).into_response()
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => AppError::Validation(msg),
            DomainError::Unauthorized => AppError::Unauthorized,
            DomainError::PermissionDenied => AppError::PermissionDenied,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

impl AppError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        AppError::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_indistinguishable_from_not_found() {
        let denied = AppError::PermissionDenied;
        let missing = AppError::NotFound;

        assert_eq!(denied.status(), missing.status());
        assert_eq!(denied.code(), missing.code());
        assert_eq!(denied.user_message(), missing.user_message());
    }

    #[test]
    fn test_domain_errors_map_to_app_errors() {
        assert!(matches!(
            AppError::from(DomainError::validation("Name is required")),
            AppError::Validation(msg) if msg == "Name is required"
        ));
        assert!(matches!(
            AppError::from(DomainError::Unauthorized),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from(DomainError::PermissionDenied),
            AppError::PermissionDenied
        ));
    }

    #[test]
    fn test_conflict_message_is_shown_verbatim() {
        let err = AppError::conflict("You already own this product");
        assert_eq!(err.user_message(), "You already own this product");
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::internal("connection pool exhausted at 10.0.0.3");
        assert_eq!(err.user_message(), "An internal error occurred");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_unavailable_names_the_dependency() {
        let err = AppError::service_unavailable("Cache");
        assert_eq!(err.user_message(), "Cache is unavailable");
        assert_eq!(err.code(), "SERVICE_UNAVAILABLE");
    }
}
