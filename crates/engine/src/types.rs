//! Result and status types produced by the recommendation engine

use chrono::{DateTime, Utc};
use hotelrec_core::HotelRecError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recommendation method requested by the caller
///
/// One aggregator dispatches over this tag; there is no per-method
/// recommender hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Collaborative,
    ContentBased,
    Hybrid,
    Trending,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Collaborative => "collaborative",
            Self::ContentBased => "content-based",
            Self::Hybrid => "hybrid",
            Self::Trending => "trending",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = HotelRecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "collaborative" => Ok(Self::Collaborative),
            "content-based" | "content_based" => Ok(Self::ContentBased),
            "hybrid" => Ok(Self::Hybrid),
            "trending" => Ok(Self::Trending),
            other => Err(HotelRecError::validation_field(
                format!("unknown recommendation method '{}'", other),
                "method",
            )),
        }
    }
}

/// Per-component sub-scores for one recommended hotel
///
/// Every populated field is on the shared [1, 5] scale so components
/// are directly comparable; `None` means the component did not
/// contribute (e.g. collaborative for a cold user).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub collaborative: Option<f32>,
    pub content: Option<f32>,
    pub sentiment: Option<f32>,
    pub popularity: Option<f32>,
}

/// One ranked entry of a recommendation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredHotel {
    pub hotel_id: Uuid,
    /// Final blended score in [1, 5]
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    /// 1-based position in the result
    pub rank: usize,
}

/// Ranked, explainable recommendation output. Ephemeral: produced per
/// request against one snapshot, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResult {
    /// Absent for anonymous requests (trending)
    pub user_id: Option<Uuid>,
    pub method: Method,
    pub entries: Vec<ScoredHotel>,
    pub generated_at: DateTime<Utc>,
}

/// Operational visibility into the snapshot cache
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub last_refresh: Option<DateTime<Utc>>,
    pub user_count: usize,
    pub hotel_count: usize,
    pub review_count: usize,
    /// Reviews accepted since the last successful refresh
    pub pending_reviews: usize,
    /// False until a snapshot has been published
    pub healthy: bool,
}
