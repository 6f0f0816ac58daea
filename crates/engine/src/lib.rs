//! HotelRec Recommendation Engine
//!
//! This crate implements the recommendation layer for HotelRec:
//! collaborative filtering, content-based filtering, sentiment scoring
//! and cold-start fallbacks, served from one atomically swapped model
//! snapshot.

pub mod cache;
pub mod cold_start;
pub mod collaborative;
pub mod content;
pub mod hybrid;
pub mod matrix;
pub mod sentiment;
pub mod store;
pub mod types;

// Re-export key types
pub use cache::{ModelSnapshot, RecommendationCache};
pub use cold_start::{ColdStartStrategy, PopularityPrior};
pub use collaborative::{CollaborativeModel, LatentFactorModel, NeighborhoodModel};
pub use content::{ContentModel, SparseVector};
pub use hybrid::HybridAggregator;
pub use matrix::{HotelAggregate, MatrixBuilder, RatingMatrix};
pub use sentiment::{SentimentScorer, SentimentSummary};
pub use store::{InteractionStore, MemoryStore, PgStore};
pub use types::{Method, RecommendationResult, RefreshStatus, ScoreBreakdown, ScoredHotel};
