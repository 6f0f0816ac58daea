//! Cold-start handling
//!
//! Users and hotels below the interaction thresholds cannot be served
//! by the collaborative models, so ranking falls back to a popularity
//! prior over the derived aggregates, blended with declared-preference
//! affinity when the user stated any. The prior rewards well-rated,
//! well-reviewed, positively-discussed hotels; the logarithm keeps a
//! hotel with thousands of reviews from burying a better-rated one.

use crate::content::{ContentModel, SparseVector};
use crate::matrix::{HotelAggregate, RatingMatrix};
use hotelrec_core::config::EngineConfig;
use std::collections::HashMap;
use uuid::Uuid;

/// Blend weights used when a cold user declared preferences
const PREFERENCE_WEIGHT: f32 = 0.5;
const POPULARITY_WEIGHT: f32 = 0.5;

/// Popularity prior over the current aggregates
#[derive(Debug, Clone, Default)]
pub struct PopularityPrior {
    scores: HashMap<Uuid, f32>,
    max: f32,
}

impl PopularityPrior {
    /// `(mean rating / 5) * (1 + mean polarity) * ln(1 + reviews)`.
    /// Zero for hotels without reviews.
    pub fn compute(aggregates: &HashMap<Uuid, HotelAggregate>) -> Self {
        let mut scores = HashMap::with_capacity(aggregates.len());
        let mut max = 0.0f32;
        for (hotel_id, aggregate) in aggregates {
            let score = if aggregate.review_count == 0 {
                0.0
            } else {
                (aggregate.mean_rating / 5.0)
                    * (1.0 + aggregate.mean_polarity)
                    * (1.0 + aggregate.review_count as f32).ln()
            };
            max = max.max(score);
            scores.insert(*hotel_id, score);
        }
        Self { scores, max }
    }

    pub fn raw(&self, hotel_id: Uuid) -> f32 {
        self.scores.get(&hotel_id).copied().unwrap_or(0.0)
    }

    /// Prior scaled so the most popular hotel sits at 1.0
    pub fn normalized(&self, hotel_id: Uuid) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        self.raw(hotel_id) / self.max
    }

    /// Normalized prior mapped onto the shared rating scale
    pub fn trending_score(&self, hotel_id: Uuid) -> f32 {
        1.0 + 4.0 * self.normalized(hotel_id)
    }
}

/// Threshold-based cold-start detection and fallback scoring
#[derive(Debug, Clone, Copy)]
pub struct ColdStartStrategy {
    user_threshold: usize,
    hotel_threshold: usize,
}

impl ColdStartStrategy {
    pub fn new(user_threshold: usize, hotel_threshold: usize) -> Self {
        Self {
            user_threshold,
            hotel_threshold,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.cold_user_threshold, config.cold_hotel_threshold)
    }

    /// A user is cold when no matrix exists or their rating count in the
    /// current build is below the threshold
    pub fn is_cold_user(&self, matrix: Option<&RatingMatrix>, user_id: Uuid) -> bool {
        let Some(matrix) = matrix else {
            return true;
        };
        match matrix.user_index(user_id) {
            Some(idx) => matrix.user_ratings(idx).len() < self.user_threshold,
            None => true,
        }
    }

    pub fn is_cold_hotel(&self, matrix: Option<&RatingMatrix>, hotel_id: Uuid) -> bool {
        let Some(matrix) = matrix else {
            return true;
        };
        match matrix.hotel_index(hotel_id) {
            Some(idx) => matrix.hotel_ratings(idx).len() < self.hotel_threshold,
            None => true,
        }
    }

    /// Score one hotel for a cold user, on the shared rating scale.
    ///
    /// With a declared-preference profile the score blends preference
    /// affinity with the normalized prior; without one it is the prior
    /// alone.
    pub fn score_cold_user(
        &self,
        content: &ContentModel,
        prior: &PopularityPrior,
        profile: Option<&SparseVector>,
        hotel_idx: usize,
    ) -> f32 {
        let popularity = prior.normalized(content.hotel_id(hotel_idx));
        let combined = match profile {
            Some(profile) => {
                let affinity = content.similarity(profile, hotel_idx).clamp(0.0, 1.0);
                PREFERENCE_WEIGHT * affinity + POPULARITY_WEIGHT * popularity
            }
            None => popularity,
        };
        1.0 + 4.0 * combined.clamp(0.0, 1.0)
    }
}
