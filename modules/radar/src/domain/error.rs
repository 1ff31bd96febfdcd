use thiserror::Error;

use crate::contract::model::UserId;

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("No location stored for user '{user_id}'")]
    LocationNotFound { user_id: UserId },

    /// Store failure; `message` carries the adapter error for logs only.
    #[error("Location store unavailable during {operation}: {message}")]
    StoreUnavailable {
        operation: &'static str,
        message: String,
    },
}

impl DomainError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    pub fn location_not_found(user_id: UserId) -> Self {
        Self::LocationNotFound { user_id }
    }

    pub fn store_unavailable(operation: &'static str, err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable {
            operation,
            message: err.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
