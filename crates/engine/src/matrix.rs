//! Sparse user-hotel rating matrix
//!
//! The matrix and its index maps are rebuilt wholesale on every refresh
//! and are only valid against the snapshot that owns them: indices are
//! never patched in place, so a stale index can never address a newer
//! build. Index order is sorted by id to keep builds deterministic for
//! identical input.

use hotelrec_core::{Hotel, HotelRecError, Review};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Sparse user-hotel rating matrix with per-build index maps
#[derive(Debug, Clone)]
pub struct RatingMatrix {
    entries: HashMap<(usize, usize), f32>,
    user_ids: Vec<Uuid>,
    hotel_ids: Vec<Uuid>,
    user_index: HashMap<Uuid, usize>,
    hotel_index: HashMap<Uuid, usize>,
    /// Per-user (hotel index, rating) adjacency
    user_ratings: Vec<Vec<(usize, f32)>>,
    /// Per-hotel (user index, rating) adjacency
    hotel_ratings: Vec<Vec<(usize, f32)>>,
    global_mean: f32,
}

impl RatingMatrix {
    pub fn num_users(&self) -> usize {
        self.user_ids.len()
    }

    pub fn num_hotels(&self) -> usize {
        self.hotel_ids.len()
    }

    pub fn user_index(&self, user_id: Uuid) -> Option<usize> {
        self.user_index.get(&user_id).copied()
    }

    pub fn hotel_index(&self, hotel_id: Uuid) -> Option<usize> {
        self.hotel_index.get(&hotel_id).copied()
    }

    pub fn user_id(&self, user_idx: usize) -> Uuid {
        self.user_ids[user_idx]
    }

    pub fn hotel_id(&self, hotel_idx: usize) -> Uuid {
        self.hotel_ids[hotel_idx]
    }

    pub fn get(&self, user_idx: usize, hotel_idx: usize) -> Option<f32> {
        self.entries.get(&(user_idx, hotel_idx)).copied()
    }

    /// All (hotel index, rating) pairs for one user
    pub fn user_ratings(&self, user_idx: usize) -> &[(usize, f32)] {
        &self.user_ratings[user_idx]
    }

    /// All (user index, rating) pairs for one hotel
    pub fn hotel_ratings(&self, hotel_idx: usize) -> &[(usize, f32)] {
        &self.hotel_ratings[hotel_idx]
    }

    pub fn rating_count(&self) -> usize {
        self.entries.len()
    }

    /// Mean of all observed ratings
    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// Mean rating given by one user, or the global mean if they rated nothing
    pub fn user_mean(&self, user_idx: usize) -> f32 {
        let ratings = &self.user_ratings[user_idx];
        if ratings.is_empty() {
            return self.global_mean;
        }
        ratings.iter().map(|(_, r)| r).sum::<f32>() / ratings.len() as f32
    }

    /// Mean rating received by one hotel, or the global mean if unrated
    pub fn hotel_mean(&self, hotel_idx: usize) -> f32 {
        let ratings = &self.hotel_ratings[hotel_idx];
        if ratings.is_empty() {
            return self.global_mean;
        }
        ratings.iter().map(|(_, r)| r).sum::<f32>() / ratings.len() as f32
    }
}

/// Keep only the most recent review per (user, hotel) pair, restricted
/// to the given hotel set, in deterministic order.
pub fn dedupe_latest<'a>(reviews: &'a [Review], hotels: &HashSet<Uuid>) -> Vec<&'a Review> {
    let mut latest: HashMap<(Uuid, Uuid), &Review> = HashMap::new();
    for review in reviews {
        if !hotels.contains(&review.hotel_id) {
            continue;
        }
        latest
            .entry((review.user_id, review.hotel_id))
            .and_modify(|current| {
                if review.created_at > current.created_at {
                    *current = review;
                }
            })
            .or_insert(review);
    }
    let mut deduped: Vec<&Review> = latest.into_values().collect();
    deduped.sort_by(|a, b| (a.user_id, a.hotel_id).cmp(&(b.user_id, b.hotel_id)));
    deduped
}

/// Builds the rating matrix for one snapshot
#[derive(Debug, Clone)]
pub struct MatrixBuilder {
    min_users: usize,
    min_hotels: usize,
}

impl MatrixBuilder {
    pub fn new(min_users: usize, min_hotels: usize) -> Self {
        Self {
            min_users,
            min_hotels,
        }
    }

    /// Assemble the matrix from deduplicated reviews.
    ///
    /// Fails with `InsufficientData` when fewer distinct users or hotels
    /// than the configured floor carry ratings; collaborative methods
    /// are meaningless below it.
    pub fn build(&self, reviews: &[&Review]) -> Result<RatingMatrix, HotelRecError> {
        let mut user_set: HashSet<Uuid> = HashSet::new();
        let mut hotel_set: HashSet<Uuid> = HashSet::new();
        for review in reviews {
            user_set.insert(review.user_id);
            hotel_set.insert(review.hotel_id);
        }

        if user_set.len() < self.min_users || hotel_set.len() < self.min_hotels {
            return Err(HotelRecError::InsufficientData {
                users: user_set.len(),
                hotels: hotel_set.len(),
                min_users: self.min_users,
                min_hotels: self.min_hotels,
            });
        }

        let mut user_ids: Vec<Uuid> = user_set.into_iter().collect();
        let mut hotel_ids: Vec<Uuid> = hotel_set.into_iter().collect();
        user_ids.sort();
        hotel_ids.sort();

        let user_index: HashMap<Uuid, usize> =
            user_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();
        let hotel_index: HashMap<Uuid, usize> =
            hotel_ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let mut entries = HashMap::with_capacity(reviews.len());
        let mut user_ratings = vec![Vec::new(); user_ids.len()];
        let mut hotel_ratings = vec![Vec::new(); hotel_ids.len()];
        let mut rating_sum = 0.0f32;

        for review in reviews {
            let u = user_index[&review.user_id];
            let h = hotel_index[&review.hotel_id];
            let rating = review.rating as f32;
            entries.insert((u, h), rating);
            user_ratings[u].push((h, rating));
            hotel_ratings[h].push((u, rating));
            rating_sum += rating;
        }

        let global_mean = if entries.is_empty() {
            0.0
        } else {
            rating_sum / entries.len() as f32
        };

        tracing::debug!(
            users = user_ids.len(),
            hotels = hotel_ids.len(),
            ratings = entries.len(),
            "built rating matrix"
        );

        Ok(RatingMatrix {
            entries,
            user_ids,
            hotel_ids,
            user_index,
            hotel_index,
            user_ratings,
            hotel_ratings,
            global_mean,
        })
    }
}

/// Derived per-hotel aggregates, recomputed from the full review set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HotelAggregate {
    pub mean_rating: f32,
    pub review_count: usize,
    pub mean_polarity: f32,
}

/// Recompute aggregates for every hotel, including those without reviews
pub fn build_aggregates(
    hotels: &[Hotel],
    deduped_reviews: &[&Review],
) -> HashMap<Uuid, HotelAggregate> {
    let mut sums: HashMap<Uuid, (f32, f32, usize)> = HashMap::new();
    for review in deduped_reviews {
        let entry = sums.entry(review.hotel_id).or_insert((0.0, 0.0, 0));
        entry.0 += review.rating as f32;
        entry.1 += review.sentiment_polarity;
        entry.2 += 1;
    }

    hotels
        .iter()
        .map(|hotel| {
            let aggregate = match sums.get(&hotel.id) {
                Some((rating_sum, polarity_sum, count)) if *count > 0 => HotelAggregate {
                    mean_rating: rating_sum / *count as f32,
                    review_count: *count,
                    mean_polarity: polarity_sum / *count as f32,
                },
                _ => HotelAggregate::default(),
            };
            (hotel.id, aggregate)
        })
        .collect()
}
