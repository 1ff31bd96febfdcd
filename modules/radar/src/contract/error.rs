use thiserror::Error;

/// Errors that are safe to expose to other crates
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RadarError {
    #[error("No location stored for user '{user_id}'")]
    NotFound { user_id: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Location store unavailable")]
    Unavailable,
}

impl RadarError {
    pub fn not_found(user_id: impl Into<String>) -> Self {
        Self::NotFound {
            user_id: user_id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unavailable() -> Self {
        Self::Unavailable
    }
}
