//! # HotelRec Core
//!
//! Core data structures and types for the HotelRec recommendation platform.
//!
//! This crate provides the building blocks shared by the recommendation
//! engine and any serving layer wrapped around it.
//!
//! ## Modules
//!
//! - `models`: Domain models for hotels, users and reviews
//! - `error`: Error types and handling
//! - `config`: Configuration loading and validation
//! - `math`: Mathematical utilities for vector operations
//! - `validation`: Validation utilities and functions

pub mod config;
pub mod error;
pub mod math;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{load_dotenv, ConfigLoader, DatabaseConfig, EngineConfig};
pub use error::HotelRecError;
pub use math::{cosine_similarity, dot_product};
pub use models::{
    Hotel, PreferenceValue, Review, SentimentLabel, User, MAX_RATING, MIN_RATING,
};

/// Result type alias for HotelRec operations
pub type Result<T> = std::result::Result<T, HotelRecError>;
