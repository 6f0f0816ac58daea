//! Hybrid aggregation and method dispatch
//!
//! One aggregator turns a model snapshot plus a request into a ranked
//! result. The hybrid blend renormalizes its weights per hotel over the
//! components that are actually available, so a missing collaborative
//! signal raises the influence of content and sentiment instead of
//! dragging the score down. Cold users are silently routed to the
//! cold-start ranking; requesting a personalized method never fails
//! just because the user has no history.

use crate::cache::ModelSnapshot;
use crate::cold_start::ColdStartStrategy;
use crate::content::SparseVector;
use crate::types::{Method, RecommendationResult, ScoreBreakdown, ScoredHotel};
use chrono::Utc;
use hotelrec_core::config::EngineConfig;
use hotelrec_core::{HotelRecError, PreferenceValue, User};
use std::collections::HashMap;
use uuid::Uuid;

type Result<T> = std::result::Result<T, HotelRecError>;

/// Dispatches a recommendation request against one snapshot
#[derive(Debug, Clone)]
pub struct HybridAggregator {
    config: EngineConfig,
    cold_start: ColdStartStrategy,
}

impl HybridAggregator {
    pub fn new(config: EngineConfig) -> Self {
        let cold_start = ColdStartStrategy::from_config(&config);
        Self { config, cold_start }
    }

    /// Produce a ranked result for one request.
    ///
    /// `user_id` may only be absent for trending requests. Output is
    /// sorted by score descending with hotel id as the tie-break, ranks
    /// are 1-based, and at most `top_n` entries are returned.
    pub fn recommend(
        &self,
        snapshot: &ModelSnapshot,
        user_id: Option<Uuid>,
        preferences: &HashMap<String, PreferenceValue>,
        method: Method,
        top_n: usize,
    ) -> Result<RecommendationResult> {
        let mut entries = match method {
            Method::Trending => self.score_trending(snapshot),
            Method::Collaborative => {
                let user_id = require_user(user_id, method)?;
                if self.is_cold(snapshot, user_id) {
                    self.score_cold(snapshot, user_id, preferences)
                } else {
                    self.score_collaborative(snapshot, user_id)
                }
            }
            Method::ContentBased => {
                let user_id = require_user(user_id, method)?;
                match self.taste_profile(snapshot, user_id, preferences) {
                    Some(profile) => self.score_content(snapshot, &profile),
                    None => self.score_cold(snapshot, user_id, preferences),
                }
            }
            Method::Hybrid => {
                let user_id = require_user(user_id, method)?;
                if self.is_cold(snapshot, user_id) {
                    self.score_cold(snapshot, user_id, preferences)
                } else {
                    self.score_hybrid(snapshot, user_id, preferences)
                }
            }
        };

        rank(&mut entries, top_n);
        Ok(RecommendationResult {
            user_id,
            method,
            entries,
            generated_at: Utc::now(),
        })
    }

    fn is_cold(&self, snapshot: &ModelSnapshot, user_id: Uuid) -> bool {
        snapshot.collaborative.is_none()
            || self.cold_start.is_cold_user(snapshot.matrix.as_ref(), user_id)
    }

    /// Liked-hotel centroid when the user has rating history, declared
    /// preference terms otherwise
    fn taste_profile(
        &self,
        snapshot: &ModelSnapshot,
        user_id: Uuid,
        preferences: &HashMap<String, PreferenceValue>,
    ) -> Option<SparseVector> {
        if let Some(matrix) = snapshot.matrix.as_ref() {
            if let Some(user_idx) = matrix.user_index(user_id) {
                if let Some(profile) =
                    snapshot
                        .content
                        .user_profile(matrix, user_idx, self.config.liked_rating_floor)
                {
                    return Some(profile);
                }
            }
        }
        snapshot
            .content
            .project_terms(&User::preference_terms(preferences))
    }

    fn score_trending(&self, snapshot: &ModelSnapshot) -> Vec<ScoredHotel> {
        (0..snapshot.content.num_hotels())
            .map(|hotel_idx| {
                let hotel_id = snapshot.content.hotel_id(hotel_idx);
                let score = snapshot.prior.trending_score(hotel_id);
                ScoredHotel {
                    hotel_id,
                    score,
                    breakdown: ScoreBreakdown {
                        popularity: Some(score),
                        ..ScoreBreakdown::default()
                    },
                    rank: 0,
                }
            })
            .collect()
    }

    /// Pure collaborative prediction. Hotels outside the matrix build
    /// or below the cold-hotel threshold have no trustworthy
    /// collaborative signal and are omitted.
    fn score_collaborative(&self, snapshot: &ModelSnapshot, user_id: Uuid) -> Vec<ScoredHotel> {
        let (Some(matrix), Some(model)) =
            (snapshot.matrix.as_ref(), snapshot.collaborative.as_ref())
        else {
            return Vec::new();
        };
        let Some(user_idx) = matrix.user_index(user_id) else {
            return Vec::new();
        };

        (0..snapshot.content.num_hotels())
            .filter_map(|hotel_idx| {
                let hotel_id = snapshot.content.hotel_id(hotel_idx);
                let matrix_idx = matrix.hotel_index(hotel_id)?;
                if self.cold_start.is_cold_hotel(Some(matrix), hotel_id) {
                    return None;
                }
                let score = model.predict_indexed(matrix, user_idx, matrix_idx);
                Some(ScoredHotel {
                    hotel_id,
                    score,
                    breakdown: ScoreBreakdown {
                        collaborative: Some(score),
                        ..ScoreBreakdown::default()
                    },
                    rank: 0,
                })
            })
            .collect()
    }

    fn score_content(&self, snapshot: &ModelSnapshot, profile: &SparseVector) -> Vec<ScoredHotel> {
        (0..snapshot.content.num_hotels())
            .map(|hotel_idx| {
                let similarity = snapshot.content.similarity(profile, hotel_idx);
                let score = crate::content::ContentModel::score(similarity);
                ScoredHotel {
                    hotel_id: snapshot.content.hotel_id(hotel_idx),
                    score,
                    breakdown: ScoreBreakdown {
                        content: Some(score),
                        ..ScoreBreakdown::default()
                    },
                    rank: 0,
                }
            })
            .collect()
    }

    /// Weighted blend of collaborative, content and sentiment signals,
    /// renormalized per hotel over the available components
    fn score_hybrid(
        &self,
        snapshot: &ModelSnapshot,
        user_id: Uuid,
        preferences: &HashMap<String, PreferenceValue>,
    ) -> Vec<ScoredHotel> {
        let profile = self.taste_profile(snapshot, user_id, preferences);
        let matrix = snapshot.matrix.as_ref();
        let user_idx = matrix.and_then(|m| m.user_index(user_id));

        (0..snapshot.content.num_hotels())
            .map(|hotel_idx| {
                let hotel_id = snapshot.content.hotel_id(hotel_idx);
                let mut breakdown = ScoreBreakdown::default();
                let mut weighted = 0.0f32;
                let mut weight_sum = 0.0f32;

                if let (Some(matrix), Some(model), Some(user_idx)) =
                    (matrix, snapshot.collaborative.as_ref(), user_idx)
                {
                    if let Some(matrix_idx) = matrix.hotel_index(hotel_id) {
                        if !self.cold_start.is_cold_hotel(Some(matrix), hotel_id) {
                            let score = model.predict_indexed(matrix, user_idx, matrix_idx);
                            breakdown.collaborative = Some(score);
                            weighted += self.config.hybrid_collaborative_weight * score;
                            weight_sum += self.config.hybrid_collaborative_weight;
                        }
                    }
                }

                if let Some(profile) = profile.as_ref() {
                    let similarity = snapshot.content.similarity(profile, hotel_idx);
                    let score = crate::content::ContentModel::score(similarity);
                    breakdown.content = Some(score);
                    weighted += self.config.hybrid_content_weight * score;
                    weight_sum += self.config.hybrid_content_weight;
                }

                if let Some(score) = sentiment_score(snapshot, hotel_id) {
                    breakdown.sentiment = Some(score);
                    weighted += self.config.hybrid_sentiment_weight * score;
                    weight_sum += self.config.hybrid_sentiment_weight;
                }

                let score = if weight_sum > 0.0 {
                    (weighted / weight_sum).clamp(1.0, 5.0)
                } else {
                    let fallback = snapshot.prior.trending_score(hotel_id);
                    breakdown.popularity = Some(fallback);
                    fallback
                };

                ScoredHotel {
                    hotel_id,
                    score,
                    breakdown,
                    rank: 0,
                }
            })
            .collect()
    }

    /// Cold-start ranking: popularity prior, preference-informed when
    /// the user declared anything that projects into the vocabulary
    fn score_cold(
        &self,
        snapshot: &ModelSnapshot,
        _user_id: Uuid,
        preferences: &HashMap<String, PreferenceValue>,
    ) -> Vec<ScoredHotel> {
        let profile = snapshot
            .content
            .project_terms(&User::preference_terms(preferences));

        (0..snapshot.content.num_hotels())
            .map(|hotel_idx| {
                let hotel_id = snapshot.content.hotel_id(hotel_idx);
                let score = self.cold_start.score_cold_user(
                    &snapshot.content,
                    &snapshot.prior,
                    profile.as_ref(),
                    hotel_idx,
                );
                let breakdown = ScoreBreakdown {
                    content: profile.as_ref().map(|p| {
                        crate::content::ContentModel::score(
                            snapshot.content.similarity(p, hotel_idx),
                        )
                    }),
                    popularity: Some(snapshot.prior.trending_score(hotel_id)),
                    ..ScoreBreakdown::default()
                };
                ScoredHotel {
                    hotel_id,
                    score,
                    breakdown,
                    rank: 0,
                }
            })
            .collect()
    }
}

/// Mean review polarity mapped onto the rating scale; `None` for hotels
/// without reviews
fn sentiment_score(snapshot: &ModelSnapshot, hotel_id: Uuid) -> Option<f32> {
    let summary = snapshot.sentiment.get(&hotel_id)?;
    if summary.total == 0 {
        return None;
    }
    Some((3.0 + 2.0 * summary.average_polarity).clamp(1.0, 5.0))
}

fn require_user(user_id: Option<Uuid>, method: Method) -> Result<Uuid> {
    user_id.ok_or_else(|| {
        HotelRecError::validation_field(
            format!("method '{}' requires a user id", method),
            "user_id",
        )
    })
}

/// Sort by score descending, hotel id ascending on ties, truncate and
/// assign 1-based ranks
fn rank(entries: &mut Vec<ScoredHotel>, top_n: usize) {
    entries.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.hotel_id.cmp(&b.hotel_id))
    });
    entries.truncate(top_n);
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.rank = i + 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ModelSnapshot;
    use chrono::Utc;
    use hotelrec_core::{Hotel, Review, SentimentLabel};

    fn review(user_id: Uuid, hotel_id: Uuid, rating: i32) -> Review {
        Review {
            id: Uuid::new_v4(),
            user_id,
            hotel_id,
            rating,
            comment: String::new(),
            sentiment_polarity: 0.0,
            sentiment_label: SentimentLabel::Neutral,
            created_at: Utc::now(),
        }
    }

    fn catalog(n: usize) -> Vec<Hotel> {
        (0..n)
            .map(|i| {
                Hotel::new(format!("Hotel {}", i), format!("district {}", i), 3, "boutique")
            })
            .collect()
    }

    fn snapshot(hotels: &[Hotel], reviews: &[Review]) -> ModelSnapshot {
        ModelSnapshot::build(hotels.to_vec(), reviews.to_vec(), &EngineConfig::default())
    }

    #[test]
    fn test_trending_needs_no_user() {
        let hotels = catalog(3);
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[1], hotels[0].id, 5),
            review(users[1], hotels[1].id, 2),
        ];
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(&snapshot, None, &HashMap::new(), Method::Trending, 10)
            .unwrap();
        assert_eq!(result.user_id, None);
        assert_eq!(result.entries[0].hotel_id, hotels[0].id);
        assert!(result.entries[0].breakdown.popularity.is_some());
    }

    #[test]
    fn test_personalized_methods_require_user() {
        let hotels = catalog(2);
        let snapshot = snapshot(&hotels, &[]);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        for method in [Method::Collaborative, Method::ContentBased, Method::Hybrid] {
            let err = aggregator
                .recommend(&snapshot, None, &HashMap::new(), method, 10)
                .unwrap_err();
            assert!(matches!(err, HotelRecError::Validation { .. }));
        }
    }

    #[test]
    fn test_ranks_are_one_based_and_sorted() {
        let hotels = catalog(4);
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let mut reviews = Vec::new();
        for (i, user) in users.iter().enumerate() {
            for hotel in hotels.iter().take(i + 2) {
                reviews.push(review(*user, hotel.id, 4));
            }
        }
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(&snapshot, Some(users[2]), &HashMap::new(), Method::Hybrid, 10)
            .unwrap();
        assert!(!result.entries.is_empty());
        for (i, entry) in result.entries.iter().enumerate() {
            assert_eq!(entry.rank, i + 1);
            if i > 0 {
                assert!(result.entries[i - 1].score >= entry.score);
            }
        }
    }

    #[test]
    fn test_top_n_truncates() {
        let hotels = catalog(6);
        let snapshot = snapshot(&hotels, &[]);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(&snapshot, None, &HashMap::new(), Method::Trending, 2)
            .unwrap();
        assert_eq!(result.entries.len(), 2);
    }

    #[test]
    fn test_equal_scores_tie_break_on_hotel_id() {
        let hotels = catalog(5);
        let snapshot = snapshot(&hotels, &[]);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        // No reviews at all: every trending score is the floor
        let result = aggregator
            .recommend(&snapshot, None, &HashMap::new(), Method::Trending, 10)
            .unwrap();
        let ids: Vec<Uuid> = result.entries.iter().map(|e| e.hotel_id).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn test_cold_user_is_served_not_failed() {
        let hotels = catalog(3);
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[1], hotels[1].id, 4),
        ];
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let stranger = Uuid::new_v4();
        for method in [Method::Collaborative, Method::ContentBased, Method::Hybrid] {
            let result = aggregator
                .recommend(&snapshot, Some(stranger), &HashMap::new(), method, 10)
                .unwrap();
            assert!(!result.entries.is_empty());
        }
    }

    #[test]
    fn test_collaborative_omits_unrated_hotels() {
        let hotels = catalog(3);
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        // Hotel 2 has no reviews and cannot enter the matrix build
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[0], hotels[1].id, 3),
            review(users[1], hotels[0].id, 4),
        ];
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(
                &snapshot,
                Some(users[0]),
                &HashMap::new(),
                Method::Collaborative,
                10,
            )
            .unwrap();
        assert!(result.entries.iter().all(|e| e.hotel_id != hotels[2].id));
        assert!(result
            .entries
            .iter()
            .all(|e| e.breakdown.collaborative.is_some()));
    }

    #[test]
    fn test_content_based_covers_unrated_hotels() {
        let mut hotels = vec![
            Hotel::new("Seaside Grand", "oceanfront", 4, "resort").with_amenities(["spa", "pool"]),
            Hotel::new("Metro Hub", "downtown", 3, "business").with_amenities(["gym"]),
        ];
        // A brand-new hotel with no reviews, similar to the first
        hotels.push(
            Hotel::new("Palm Retreat", "oceanfront", 5, "resort").with_amenities(["spa"]),
        );

        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[0], hotels[1].id, 2),
            review(users[1], hotels[1].id, 4),
        ];
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(
                &snapshot,
                Some(users[0]),
                &HashMap::new(),
                Method::ContentBased,
                10,
            )
            .unwrap();
        let palm = result
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[2].id)
            .expect("unrated hotel present in content-based output");
        let metro = result
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[1].id)
            .unwrap();
        assert!(palm.score > metro.score);
    }

    #[test]
    fn test_cold_hotels_excluded_from_collaborative_scoring() {
        let hotels = catalog(3);
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        // Hotels 0 and 1 carry two ratings each; hotel 2 only one
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[0], hotels[1].id, 4),
            review(users[1], hotels[0].id, 4),
            review(users[1], hotels[1].id, 3),
            review(users[1], hotels[2].id, 4),
        ];
        let config = EngineConfig {
            cold_hotel_threshold: 2,
            ..EngineConfig::default()
        };
        let snapshot = ModelSnapshot::build(hotels.to_vec(), reviews, &config);
        let aggregator = HybridAggregator::new(config);

        let collaborative = aggregator
            .recommend(
                &snapshot,
                Some(users[0]),
                &HashMap::new(),
                Method::Collaborative,
                10,
            )
            .unwrap();
        assert!(collaborative
            .entries
            .iter()
            .all(|e| e.hotel_id != hotels[2].id));

        // In the hybrid blend the below-threshold hotel stays a
        // candidate but carries no collaborative component
        let hybrid = aggregator
            .recommend(&snapshot, Some(users[0]), &HashMap::new(), Method::Hybrid, 10)
            .unwrap();
        let sparse = hybrid
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[2].id)
            .unwrap();
        assert!(sparse.breakdown.collaborative.is_none());
        let warm = hybrid
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[0].id)
            .unwrap();
        assert!(warm.breakdown.collaborative.is_some());
    }

    #[test]
    fn test_hybrid_breakdown_populates_components() {
        let hotels = catalog(3);
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[0], hotels[1].id, 4),
            review(users[1], hotels[0].id, 4),
        ];
        let snapshot = snapshot(&hotels, &reviews);
        let aggregator = HybridAggregator::new(EngineConfig::default());

        let result = aggregator
            .recommend(&snapshot, Some(users[0]), &HashMap::new(), Method::Hybrid, 10)
            .unwrap();
        let rated = result
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[0].id)
            .unwrap();
        assert!(rated.breakdown.collaborative.is_some());
        assert!(rated.breakdown.sentiment.is_some());

        // Hotel 2 never entered the matrix: its blend renormalizes over
        // whatever remains instead of failing
        let unrated = result
            .entries
            .iter()
            .find(|e| e.hotel_id == hotels[2].id)
            .unwrap();
        assert!(unrated.breakdown.collaborative.is_none());
        assert!((1.0..=5.0).contains(&unrated.score));
    }
}
