//! Business rule violations.
//!
//! Infrastructure failures never appear here; they are added by `common::AppError`.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed write input. The message is shown to the caller.
    #[error("{0}")]
    Validation(String),

    /// The operation needs a signed-in viewer
    #[error("Sign in required")]
    Unauthorized,

    /// Viewer lacks the capability. Surfaced identically to a missing record.
    #[error("Permission denied")]
    PermissionDenied,
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        DomainError::Validation(msg.into())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

/// Reject blank text fields.
pub fn require_text(value: &str, message: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        Err(DomainError::validation(message))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_text_is_rejected() {
        assert_eq!(
            require_text("  ", "Name is required"),
            Err(DomainError::validation("Name is required"))
        );
        assert!(require_text("Rust 101", "Name is required").is_ok());
    }
}
