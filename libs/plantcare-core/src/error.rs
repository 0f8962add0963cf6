//! Error types for the plantcare core library

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for plant care operations
pub type Result<T> = std::result::Result<T, PlantCareError>;

/// Main error type for plant care operations
#[derive(Error, Debug)]
pub enum PlantCareError {
    #[error("No backup destination is reachable")]
    StorageUnavailable,

    #[error("Invalid backup directory: {path}")]
    InvalidDirectory { path: String },

    #[error("Failed to save backup: {message}")]
    SaveFailed { message: String },

    #[error("Failed to open backup: {message}")]
    OpenFailed { message: String },

    #[error("Invalid snapshot data: {message}")]
    InvalidData { message: String },

    #[error("Persisted data migrated with fallback: {message}")]
    SchemaMigrationFallback { message: String },

    #[error("Advisor request failed with HTTP status {code}")]
    HttpError { code: u16 },

    #[error("Advisor upstream error: {message}")]
    UpstreamError { message: String },

    #[error("Invalid advisor response: {message}")]
    InvalidResponse { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Room not found: {id}")]
    RoomNotFound { id: Uuid },

    #[error("Window not found: {id}")]
    WindowNotFound { id: Uuid },

    #[error("Zone not found: {id}")]
    ZoneNotFound { id: Uuid },

    #[error("Plant not found: {id}")]
    PlantNotFound { id: Uuid },

    #[error("Care step not found: {id}")]
    CareStepNotFound { id: Uuid },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PlantCareError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a save failure
    pub fn save_failed(message: impl Into<String>) -> Self {
        Self::SaveFailed {
            message: message.into(),
        }
    }

    /// Create an open failure
    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed {
            message: message.into(),
        }
    }

    /// Create an invalid snapshot data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Self::InvalidData {
            message: message.into(),
        }
    }

    /// Create an invalid advisor response error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether this error should reach the user rather than only the log
    #[must_use]
    pub fn is_user_facing(&self) -> bool {
        !matches!(self, Self::SchemaMigrationFallback { .. })
    }
}
