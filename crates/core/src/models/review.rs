//! Review model
//!
//! A review belongs to exactly one user and one hotel, and a
//! (user, hotel) pair has at most one active review: resubmission
//! replaces the previous review rather than duplicating it. Sentiment
//! fields are derived synchronously at write time.

use crate::error::HotelRecError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lowest accepted star rating
pub const MIN_RATING: i32 = 1;
/// Highest accepted star rating
pub const MAX_RATING: i32 = 5;

/// Categorical sentiment label derived from review text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Neutral => "neutral",
            Self::Negative => "negative",
        }
    }
}

impl std::str::FromStr for SentimentLabel {
    type Err = HotelRecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "positive" => Ok(Self::Positive),
            "neutral" => Ok(Self::Neutral),
            "negative" => Ok(Self::Negative),
            other => Err(HotelRecError::validation_field(
                format!("unknown sentiment label '{}'", other),
                "sentiment_label",
            )),
        }
    }
}

/// A user's rating and comment for a hotel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub user_id: Uuid,
    pub hotel_id: Uuid,
    /// Integer star rating in [MIN_RATING, MAX_RATING]
    pub rating: i32,
    #[serde(default)]
    pub comment: String,
    /// Derived: polarity of the comment in [-1, 1]
    #[serde(default)]
    pub sentiment_polarity: f32,
    /// Derived: categorical label matching the polarity thresholds
    #[serde(default = "default_label")]
    pub sentiment_label: SentimentLabel,
    pub created_at: DateTime<Utc>,
}

fn default_label() -> SentimentLabel {
    SentimentLabel::Neutral
}
