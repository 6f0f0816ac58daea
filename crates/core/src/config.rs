//! Configuration loading for HotelRec services
//!
//! Unified environment-variable configuration with typed parsing,
//! validation and `.env` support. All variables use the `HOTELREC_`
//! prefix, with a handful of conventional fallbacks (`DATABASE_URL`).
//!
//! Every policy constant of the recommendation engine (blend weights,
//! cold-start thresholds, factorization rank, refresh triggers) is
//! configuration rather than a hard-coded magic number; the defaults
//! below are the documented baseline policy.

use crate::error::HotelRecError;
use std::time::Duration;
use url::Url;

/// Configuration loader trait
///
/// Standardized loading and validation of configuration from
/// environment variables.
pub trait ConfigLoader: Sized {
    /// Load configuration from environment variables, applying defaults
    /// for missing optional values.
    fn from_env() -> Result<Self, HotelRecError>;

    /// Validate configuration values.
    fn validate(&self) -> Result<(), HotelRecError>;
}

/// Database configuration for the Postgres-backed interaction store
///
/// # Environment Variables
///
/// - `HOTELREC_DATABASE_URL` (required, falls back to `DATABASE_URL`)
/// - `HOTELREC_DATABASE_MAX_CONNECTIONS` (optional, default: 20)
/// - `HOTELREC_DATABASE_MIN_CONNECTIONS` (optional, default: 2)
/// - `HOTELREC_DATABASE_CONNECT_TIMEOUT` (optional, seconds, default: 30)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections in the pool
    pub min_connections: u32,
    /// Connection timeout duration
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/hotelrec".to_string(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl ConfigLoader for DatabaseConfig {
    fn from_env() -> Result<Self, HotelRecError> {
        let url = std::env::var("HOTELREC_DATABASE_URL")
            .or_else(|_| std::env::var("DATABASE_URL"))
            .map_err(|_| {
                HotelRecError::configuration(
                    "DATABASE_URL or HOTELREC_DATABASE_URL must be set",
                    Some("HOTELREC_DATABASE_URL"),
                )
            })?;

        let max_connections = parse_env_var(
            "HOTELREC_DATABASE_MAX_CONNECTIONS",
            DatabaseConfig::default().max_connections,
        )?;
        let min_connections = parse_env_var(
            "HOTELREC_DATABASE_MIN_CONNECTIONS",
            DatabaseConfig::default().min_connections,
        )?;
        let connect_timeout_secs = parse_env_var("HOTELREC_DATABASE_CONNECT_TIMEOUT", 30u64)?;

        Ok(Self {
            url,
            max_connections,
            min_connections,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
        })
    }

    fn validate(&self) -> Result<(), HotelRecError> {
        Url::parse(&self.url).map_err(|e| {
            HotelRecError::configuration(
                format!("Invalid DATABASE_URL: {}", e),
                Some("HOTELREC_DATABASE_URL"),
            )
        })?;

        if self.max_connections == 0 {
            return Err(HotelRecError::configuration(
                "max_connections must be greater than 0",
                Some("HOTELREC_DATABASE_MAX_CONNECTIONS"),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(HotelRecError::configuration(
                format!(
                    "min_connections ({}) cannot exceed max_connections ({})",
                    self.min_connections, self.max_connections
                ),
                Some("HOTELREC_DATABASE_MIN_CONNECTIONS"),
            ));
        }
        if self.connect_timeout.as_secs() == 0 {
            return Err(HotelRecError::configuration(
                "connect_timeout must be greater than 0 seconds",
                Some("HOTELREC_DATABASE_CONNECT_TIMEOUT"),
            ));
        }
        Ok(())
    }
}

/// Recommendation engine configuration
///
/// # Environment Variables
///
/// - `HOTELREC_LATENT_RANK_CAP` (default: 20)
/// - `HOTELREC_LATENT_ITERATIONS` (default: 15)
/// - `HOTELREC_LATENT_REGULARIZATION` (default: 0.05)
/// - `HOTELREC_LATENT_SEED` (default: 42)
/// - `HOTELREC_NEIGHBOR_COUNT` (default: 10)
/// - `HOTELREC_LATENT_WEIGHT` / `HOTELREC_NEIGHBORHOOD_WEIGHT`
///   (collaborative blend, defaults: 0.6 / 0.4)
/// - `HOTELREC_HYBRID_COLLABORATIVE_WEIGHT` /
///   `HOTELREC_HYBRID_CONTENT_WEIGHT` /
///   `HOTELREC_HYBRID_SENTIMENT_WEIGHT` (defaults: 0.5 / 0.3 / 0.2)
/// - `HOTELREC_COLD_USER_THRESHOLD` / `HOTELREC_COLD_HOTEL_THRESHOLD`
///   (minimum ratings to count as warm, default: 1)
/// - `HOTELREC_MIN_USERS` / `HOTELREC_MIN_HOTELS` (matrix floor, default: 2)
/// - `HOTELREC_LIKED_RATING_FLOOR` (default: 4)
/// - `HOTELREC_REFRESH_INTERVAL` (seconds, default: 3600)
/// - `HOTELREC_REFRESH_REVIEW_COUNT` (default: 50)
/// - `HOTELREC_DEFAULT_TOP_N` (default: 10)
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on the latent factor rank; the effective rank is
    /// `min(cap, min(users, hotels) - 1)`
    pub latent_rank_cap: usize,
    /// Number of alternating least-squares sweeps
    pub latent_iterations: usize,
    /// L2 regularization for the factor solves
    pub latent_regularization: f32,
    /// Seed for factor initialization; fixed for deterministic snapshots
    pub latent_seed: u64,
    /// Neighbors consulted by the neighborhood predictor
    pub neighbor_count: usize,
    /// Weight of the latent-factor predictor in the collaborative blend
    pub latent_weight: f32,
    /// Weight of the neighborhood predictor in the collaborative blend
    pub neighborhood_weight: f32,
    /// Hybrid blend weight for the collaborative component
    pub hybrid_collaborative_weight: f32,
    /// Hybrid blend weight for the content-based component
    pub hybrid_content_weight: f32,
    /// Hybrid blend weight for the sentiment-adjusted popularity component
    pub hybrid_sentiment_weight: f32,
    /// Minimum ratings for a user to count as warm
    pub cold_user_threshold: usize,
    /// Minimum ratings for a hotel to count as warm
    pub cold_hotel_threshold: usize,
    /// Minimum distinct users required to build the matrix
    pub min_users: usize,
    /// Minimum distinct hotels required to build the matrix
    pub min_hotels: usize,
    /// Minimum rating for a hotel to contribute to a user's taste profile
    pub liked_rating_floor: i32,
    /// Time-based refresh trigger
    pub refresh_interval: Duration,
    /// Count-based refresh trigger: new reviews since the last refresh
    pub refresh_review_count: usize,
    /// Default result size for `recommend`
    pub default_top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latent_rank_cap: 20,
            latent_iterations: 15,
            latent_regularization: 0.05,
            latent_seed: 42,
            neighbor_count: 10,
            latent_weight: 0.6,
            neighborhood_weight: 0.4,
            hybrid_collaborative_weight: 0.5,
            hybrid_content_weight: 0.3,
            hybrid_sentiment_weight: 0.2,
            cold_user_threshold: 1,
            cold_hotel_threshold: 1,
            min_users: 2,
            min_hotels: 2,
            liked_rating_floor: 4,
            refresh_interval: Duration::from_secs(3600),
            refresh_review_count: 50,
            default_top_n: 10,
        }
    }
}

impl ConfigLoader for EngineConfig {
    fn from_env() -> Result<Self, HotelRecError> {
        let defaults = EngineConfig::default();
        let refresh_interval_secs =
            parse_env_var("HOTELREC_REFRESH_INTERVAL", defaults.refresh_interval.as_secs())?;

        Ok(Self {
            latent_rank_cap: parse_env_var("HOTELREC_LATENT_RANK_CAP", defaults.latent_rank_cap)?,
            latent_iterations: parse_env_var(
                "HOTELREC_LATENT_ITERATIONS",
                defaults.latent_iterations,
            )?,
            latent_regularization: parse_env_var(
                "HOTELREC_LATENT_REGULARIZATION",
                defaults.latent_regularization,
            )?,
            latent_seed: parse_env_var("HOTELREC_LATENT_SEED", defaults.latent_seed)?,
            neighbor_count: parse_env_var("HOTELREC_NEIGHBOR_COUNT", defaults.neighbor_count)?,
            latent_weight: parse_env_var("HOTELREC_LATENT_WEIGHT", defaults.latent_weight)?,
            neighborhood_weight: parse_env_var(
                "HOTELREC_NEIGHBORHOOD_WEIGHT",
                defaults.neighborhood_weight,
            )?,
            hybrid_collaborative_weight: parse_env_var(
                "HOTELREC_HYBRID_COLLABORATIVE_WEIGHT",
                defaults.hybrid_collaborative_weight,
            )?,
            hybrid_content_weight: parse_env_var(
                "HOTELREC_HYBRID_CONTENT_WEIGHT",
                defaults.hybrid_content_weight,
            )?,
            hybrid_sentiment_weight: parse_env_var(
                "HOTELREC_HYBRID_SENTIMENT_WEIGHT",
                defaults.hybrid_sentiment_weight,
            )?,
            cold_user_threshold: parse_env_var(
                "HOTELREC_COLD_USER_THRESHOLD",
                defaults.cold_user_threshold,
            )?,
            cold_hotel_threshold: parse_env_var(
                "HOTELREC_COLD_HOTEL_THRESHOLD",
                defaults.cold_hotel_threshold,
            )?,
            min_users: parse_env_var("HOTELREC_MIN_USERS", defaults.min_users)?,
            min_hotels: parse_env_var("HOTELREC_MIN_HOTELS", defaults.min_hotels)?,
            liked_rating_floor: parse_env_var(
                "HOTELREC_LIKED_RATING_FLOOR",
                defaults.liked_rating_floor,
            )?,
            refresh_interval: Duration::from_secs(refresh_interval_secs),
            refresh_review_count: parse_env_var(
                "HOTELREC_REFRESH_REVIEW_COUNT",
                defaults.refresh_review_count,
            )?,
            default_top_n: parse_env_var("HOTELREC_DEFAULT_TOP_N", defaults.default_top_n)?,
        })
    }

    fn validate(&self) -> Result<(), HotelRecError> {
        if self.latent_rank_cap == 0 {
            return Err(HotelRecError::configuration(
                "latent_rank_cap must be greater than 0",
                Some("HOTELREC_LATENT_RANK_CAP"),
            ));
        }
        if self.latent_iterations == 0 {
            return Err(HotelRecError::configuration(
                "latent_iterations must be greater than 0",
                Some("HOTELREC_LATENT_ITERATIONS"),
            ));
        }
        if self.latent_regularization <= 0.0 {
            return Err(HotelRecError::configuration(
                "latent_regularization must be positive to keep the factor solves well-conditioned",
                Some("HOTELREC_LATENT_REGULARIZATION"),
            ));
        }
        if self.neighbor_count == 0 {
            return Err(HotelRecError::configuration(
                "neighbor_count must be greater than 0",
                Some("HOTELREC_NEIGHBOR_COUNT"),
            ));
        }

        for (name, key, value) in [
            ("latent_weight", "HOTELREC_LATENT_WEIGHT", self.latent_weight),
            (
                "neighborhood_weight",
                "HOTELREC_NEIGHBORHOOD_WEIGHT",
                self.neighborhood_weight,
            ),
            (
                "hybrid_collaborative_weight",
                "HOTELREC_HYBRID_COLLABORATIVE_WEIGHT",
                self.hybrid_collaborative_weight,
            ),
            (
                "hybrid_content_weight",
                "HOTELREC_HYBRID_CONTENT_WEIGHT",
                self.hybrid_content_weight,
            ),
            (
                "hybrid_sentiment_weight",
                "HOTELREC_HYBRID_SENTIMENT_WEIGHT",
                self.hybrid_sentiment_weight,
            ),
        ] {
            if value < 0.0 {
                return Err(HotelRecError::configuration(
                    format!("{} must not be negative", name),
                    Some(key),
                ));
            }
        }

        if self.latent_weight + self.neighborhood_weight <= 0.0 {
            return Err(HotelRecError::configuration(
                "collaborative blend weights must sum to a positive value",
                Some("HOTELREC_LATENT_WEIGHT"),
            ));
        }
        let hybrid_sum = self.hybrid_collaborative_weight
            + self.hybrid_content_weight
            + self.hybrid_sentiment_weight;
        if hybrid_sum <= 0.0 {
            return Err(HotelRecError::configuration(
                "hybrid blend weights must sum to a positive value",
                Some("HOTELREC_HYBRID_COLLABORATIVE_WEIGHT"),
            ));
        }

        if self.min_users < 2 || self.min_hotels < 2 {
            return Err(HotelRecError::configuration(
                "min_users and min_hotels must be at least 2; collaborative filtering is meaningless below that floor",
                Some("HOTELREC_MIN_USERS"),
            ));
        }
        if !(crate::models::MIN_RATING..=crate::models::MAX_RATING)
            .contains(&self.liked_rating_floor)
        {
            return Err(HotelRecError::configuration(
                "liked_rating_floor must lie within the rating scale",
                Some("HOTELREC_LIKED_RATING_FLOOR"),
            ));
        }
        if self.refresh_interval.as_secs() == 0 {
            return Err(HotelRecError::configuration(
                "refresh_interval must be greater than 0 seconds",
                Some("HOTELREC_REFRESH_INTERVAL"),
            ));
        }
        if self.refresh_review_count == 0 {
            return Err(HotelRecError::configuration(
                "refresh_review_count must be greater than 0",
                Some("HOTELREC_REFRESH_REVIEW_COUNT"),
            ));
        }
        if self.default_top_n == 0 {
            return Err(HotelRecError::configuration(
                "default_top_n must be greater than 0",
                Some("HOTELREC_DEFAULT_TOP_N"),
            ));
        }
        Ok(())
    }
}

/// Helper to parse an environment variable with a default value
fn parse_env_var<T>(key: &str, default: T) -> Result<T, HotelRecError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(key)
        .ok()
        .map(|v| {
            v.parse::<T>().map_err(|e| {
                HotelRecError::configuration(
                    format!("Failed to parse {}: {}", key, e),
                    Some(key),
                )
            })
        })
        .unwrap_or(Ok(default))
}

/// Load a `.env` file if present. Missing files are not an error.
pub fn load_dotenv() {
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            tracing::warn!("Failed to load .env file: {}", e);
        }
    }
}
