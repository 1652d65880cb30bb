//! Error handling module for the bring-up helper
//!
//! Provides centralized error handling with proper error types using thiserror.
//! All errors in the application should use these types for consistency.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the bring-up helper
#[derive(Error, Debug)]
pub enum BringupError {
    /// IO errors (file operations, process spawning, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The firmware configuration file (or another required path) is missing
    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Insufficient privilege to modify the firmware configuration file
    #[error("Permission denied: {0}")]
    Permission(String),

    /// Setup configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (config values, directive strings)
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for bring-up operations
pub type Result<T> = std::result::Result<T, BringupError>;

// Convenient error constructors
impl BringupError {
    /// Create a not-found error for a path
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a permission error
    pub fn permission(msg: impl Into<String>) -> Self {
        Self::Permission(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
