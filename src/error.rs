//! Error types and handling for Helios
//!
//! This module defines the error types used throughout the application.
//! Only the charging session absorbs and counts failures; everything below it
//! propagates with `?`.

use thiserror::Error;

/// Result type alias for Helios operations
pub type Result<T> = std::result::Result<T, HeliosError>;

/// Main error type for Helios
#[derive(Debug, Error)]
pub enum HeliosError {
    /// Failure reported by the remote energy API (transport, status, envelope)
    #[error("Remote error: {message}")]
    Remote { message: String },

    /// A decoded payload lacks an expected field
    #[error("Missing field: {field}")]
    MissingField { field: String },

    /// A smoothing window was read before any sample was added
    #[error("Smoothing window is empty")]
    EmptyWindow,

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Authentication/authorization errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },
}

impl HeliosError {
    /// Create a new remote API error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        HeliosError::Remote {
            message: message.into(),
        }
    }

    /// Create a new missing field error
    pub fn missing_field<S: Into<String>>(field: S) -> Self {
        HeliosError::MissingField {
            field: field.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        HeliosError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        HeliosError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        HeliosError::Io {
            message: message.into(),
        }
    }

    /// Create a new auth error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        HeliosError::Auth {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        HeliosError::Timeout {
            message: message.into(),
        }
    }

    /// Whether the failure is transient and worth another attempt next cycle
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            HeliosError::Remote { .. } | HeliosError::MissingField { .. } | HeliosError::Timeout { .. }
        )
    }
}

impl From<std::io::Error> for HeliosError {
    fn from(err: std::io::Error) -> Self {
        HeliosError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for HeliosError {
    fn from(err: serde_yaml::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for HeliosError {
    fn from(err: serde_json::Error) -> Self {
        HeliosError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(feature = "tesla")]
impl From<reqwest::Error> for HeliosError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            HeliosError::timeout(err.to_string())
        } else {
            HeliosError::remote(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = HeliosError::remote("boom");
        assert!(matches!(err, HeliosError::Remote { .. }));

        let err = HeliosError::missing_field("charging_state");
        assert!(matches!(err, HeliosError::MissingField { .. }));

        let err = HeliosError::validation("field", "test validation error");
        assert!(matches!(err, HeliosError::Validation { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = HeliosError::config("test error");
        assert_eq!(format!("{}", err), "Configuration error: test error");

        let err = HeliosError::missing_field("solar_power");
        assert_eq!(format!("{}", err), "Missing field: solar_power");

        assert_eq!(format!("{}", HeliosError::EmptyWindow), "Smoothing window is empty");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(HeliosError::remote("x").is_retryable());
        assert!(HeliosError::missing_field("x").is_retryable());
        assert!(HeliosError::timeout("x").is_retryable());
        assert!(!HeliosError::EmptyWindow.is_retryable());
        assert!(!HeliosError::config("x").is_retryable());
    }
}
