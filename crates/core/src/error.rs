//! Error types for the HotelRec platform
//!
//! One shared taxonomy across the engine and its boundaries. Cold-start
//! conditions are modelled as errors so that the collaborative layer can
//! signal them precisely, but they are expected and are routed to the
//! cold-start strategy rather than surfaced to callers.

use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for HotelRec operations
#[derive(Debug, Error)]
pub enum HotelRecError {
    /// Too few distinct users or hotels to fit collaborative models.
    /// Triggers cold-start-only serving, not a hard failure.
    #[error(
        "insufficient interaction data: {users} users / {hotels} hotels (need {min_users} users and {min_hotels} hotels)"
    )]
    InsufficientData {
        users: usize,
        hotels: usize,
        min_users: usize,
        min_hotels: usize,
    },

    /// User is absent from the current interaction matrix
    #[error("user {0} has no usable history in the current snapshot")]
    ColdUser(Uuid),

    /// Hotel is absent from the current interaction matrix
    #[error("hotel {0} has no usable history in the current snapshot")]
    ColdItem(Uuid),

    /// Rating outside the accepted range, rejected at the write boundary
    #[error("invalid rating {value}: must be between {min} and {max}")]
    InvalidRating { value: i32, min: i32, max: i32 },

    /// Generic data validation failure
    #[error("validation failed for '{field}': {message}")]
    Validation { message: String, field: String },

    /// Configuration loading or validation failure
    #[error("configuration error: {message}")]
    Configuration {
        message: String,
        key: Option<String>,
    },

    /// Database error from the storage boundary
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Unexpected internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl HotelRecError {
    /// Construct a validation error for a named field
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.into(),
        }
    }

    /// Construct a configuration error for an optional config key
    pub fn configuration(message: impl Into<String>, key: Option<&str>) -> Self {
        Self::Configuration {
            message: message.into(),
            key: key.map(str::to_string),
        }
    }

    /// Whether this error is an expected cold-start condition
    pub fn is_cold_start(&self) -> bool {
        matches!(self, Self::ColdUser(_) | Self::ColdItem(_))
    }

    /// Whether this error means collaborative fitting is impossible
    /// but cold-start serving should continue
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
