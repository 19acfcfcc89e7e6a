//! Error types for the Heimdall Mail account store.

use std::path::PathBuf;

/// Result type alias for account store operations
pub type HeimdallResult<T> = Result<T, HeimdallError>;

/// Main error type for the account store
#[derive(Debug, thiserror::Error)]
pub enum HeimdallError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to create configuration directory
    #[error("Failed to create configuration directory: {0}")]
    ConfigDirCreateFailed(PathBuf),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing errors
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// Errors reported by a custom configuration backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// A stored value did not have the requested type
    #[error("Type mismatch for key {key}: expected {expected}")]
    TypeMismatch {
        /// The key that was read
        key: String,
        /// The value kind the caller asked for
        expected: &'static str,
    },

    /// A derived configuration key failed validation
    #[error("Invalid configuration key: {0}")]
    InvalidKey(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Already exists errors
    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

impl HeimdallError {
    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new backend error
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a new invalid key error
    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new already exists error
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Check if this error came out of the backing configuration service
    /// rather than from argument validation
    pub fn is_backend_error(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::Toml(_)
                | Self::TomlSer(_)
                | Self::Backend(_)
                | Self::TypeMismatch { .. }
        )
    }
}
