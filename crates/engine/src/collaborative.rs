//! Collaborative filtering
//!
//! Two predictors over the same matrix build, blended with a fixed
//! weight:
//!
//! - A latent-factor model fit by alternating least squares on the
//!   per-user mean-centered residuals. Missing entries are treated as
//!   the centered baseline (residual zero) rather than modelled by a
//!   completion objective, so the prediction for an unseen pair decays
//!   toward `global mean + user bias`.
//! - A neighborhood model: cosine similarity between users restricted
//!   to co-rated hotels, predicting as a similarity-weighted average of
//!   the nearest raters.
//!
//! Both predictors address the matrix through the indices of the build
//! they were fit against; the snapshot keeps them together.

use crate::matrix::RatingMatrix;
use hotelrec_core::config::EngineConfig;
use hotelrec_core::{cosine_similarity, HotelRecError, MAX_RATING, MIN_RATING};
use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

const RATING_FLOOR: f32 = MIN_RATING as f32;
const RATING_CEIL: f32 = MAX_RATING as f32;

/// Latent-factor model over mean-centered residuals
#[derive(Debug, Clone)]
pub struct LatentFactorModel {
    rank: usize,
    global_mean: f32,
    user_bias: Vec<f32>,
    user_factors: Array2<f32>,
    item_factors: Array2<f32>,
}

impl LatentFactorModel {
    /// Fit user and item factors with seeded ALS.
    ///
    /// The effective rank is `min(cap, min(users, hotels) - 1)`, at
    /// least 1. Initialization uses the configured seed so identical
    /// input always produces identical factors.
    pub fn fit(matrix: &RatingMatrix, config: &EngineConfig) -> Self {
        let num_users = matrix.num_users();
        let num_hotels = matrix.num_hotels();
        let rank = config
            .latent_rank_cap
            .min(num_users.min(num_hotels).saturating_sub(1))
            .max(1);
        let lambda = config.latent_regularization as f64;

        let global_mean = matrix.global_mean();
        let user_bias: Vec<f32> = (0..num_users)
            .map(|u| matrix.user_mean(u) - global_mean)
            .collect();

        // Residuals after removing the global mean and per-user bias
        let mut user_residuals: Vec<Vec<(usize, f32)>> = vec![Vec::new(); num_users];
        let mut item_residuals: Vec<Vec<(usize, f32)>> = vec![Vec::new(); num_hotels];
        for u in 0..num_users {
            for &(h, rating) in matrix.user_ratings(u) {
                let residual = rating - global_mean - user_bias[u];
                user_residuals[u].push((h, residual));
                item_residuals[h].push((u, residual));
            }
        }

        let mut rng = StdRng::seed_from_u64(config.latent_seed);
        let mut user_factors = Array2::<f32>::zeros((num_users, rank));
        let mut item_factors = Array2::<f32>::zeros((num_hotels, rank));
        for u in 0..num_users {
            for f in 0..rank {
                user_factors[[u, f]] = rng.gen_range(-0.1..0.1);
            }
        }
        for h in 0..num_hotels {
            for f in 0..rank {
                item_factors[[h, f]] = rng.gen_range(-0.1..0.1);
            }
        }

        for iteration in 0..config.latent_iterations {
            for u in 0..num_users {
                if user_residuals[u].is_empty() {
                    continue;
                }
                if let Some(row) =
                    solve_factor_row(&user_residuals[u], &item_factors, rank, lambda)
                {
                    user_factors.row_mut(u).assign(&row);
                }
            }
            for h in 0..num_hotels {
                if item_residuals[h].is_empty() {
                    continue;
                }
                if let Some(row) =
                    solve_factor_row(&item_residuals[h], &user_factors, rank, lambda)
                {
                    item_factors.row_mut(h).assign(&row);
                }
            }

            if iteration % 5 == 0 {
                let loss = residual_loss(&user_residuals, &user_factors, &item_factors);
                tracing::debug!(iteration, loss, "latent factor sweep");
            }
        }

        Self {
            rank,
            global_mean,
            user_bias,
            user_factors,
            item_factors,
        }
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Predicted rating: global mean + user bias + factor dot product,
    /// clipped to the rating scale.
    pub fn predict(&self, user_idx: usize, hotel_idx: usize) -> f32 {
        let interaction = self
            .user_factors
            .row(user_idx)
            .dot(&self.item_factors.row(hotel_idx));
        (self.global_mean + self.user_bias[user_idx] + interaction)
            .clamp(RATING_FLOOR, RATING_CEIL)
    }
}

/// Solve one regularized least-squares row against the fixed factors of
/// the other side. Returns `None` if the system is not positive
/// definite; the caller keeps the previous row in that case.
fn solve_factor_row(
    observed: &[(usize, f32)],
    other_factors: &Array2<f32>,
    rank: usize,
    lambda: f64,
) -> Option<Array1<f32>> {
    let mut a = Array2::<f64>::zeros((rank, rank));
    let mut b = Array1::<f64>::zeros(rank);

    for &(other_idx, residual) in observed {
        let vec = other_factors.row(other_idx);
        for i in 0..rank {
            for j in 0..rank {
                a[[i, j]] += (vec[i] * vec[j]) as f64;
            }
            b[i] += (residual * vec[i]) as f64;
        }
    }
    for i in 0..rank {
        a[[i, i]] += lambda;
    }

    match solve_cholesky(&a, &b) {
        Some(x) => Some(x.mapv(|v| v as f32)),
        None => {
            tracing::debug!("factor solve degenerate, keeping previous row");
            None
        }
    }
}

/// Solve A x = b for symmetric positive definite A via Cholesky
/// decomposition with forward/backward substitution.
fn solve_cholesky(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // Forward substitution: L y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // Backward substitution: L^T x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

fn residual_loss(
    user_residuals: &[Vec<(usize, f32)>],
    user_factors: &Array2<f32>,
    item_factors: &Array2<f32>,
) -> f32 {
    let mut loss = 0.0f32;
    let mut count = 0usize;
    for (u, residuals) in user_residuals.iter().enumerate() {
        for &(h, residual) in residuals {
            let predicted = user_factors.row(u).dot(&item_factors.row(h));
            loss += (residual - predicted).powi(2);
            count += 1;
        }
    }
    if count > 0 {
        loss / count as f32
    } else {
        0.0
    }
}

/// User-user neighborhood predictor
#[derive(Debug, Clone)]
pub struct NeighborhoodModel {
    /// Symmetric user-user similarity over co-rated hotels
    similarity: Array2<f32>,
    neighbor_count: usize,
}

impl NeighborhoodModel {
    pub fn fit(matrix: &RatingMatrix, neighbor_count: usize) -> Self {
        let n = matrix.num_users();
        let mut similarity = Array2::<f32>::zeros((n, n));

        for a in 0..n {
            similarity[[a, a]] = 1.0;
            for b in (a + 1)..n {
                let sim = co_rated_cosine(matrix, a, b);
                similarity[[a, b]] = sim;
                similarity[[b, a]] = sim;
            }
        }

        Self {
            similarity,
            neighbor_count,
        }
    }

    /// Similarity between two users of this build
    pub fn similarity(&self, a: usize, b: usize) -> f32 {
        self.similarity[[a, b]]
    }

    /// Similarity-weighted average of the nearest raters of `hotel_idx`.
    /// `None` when no positively similar neighbor has rated it; the
    /// caller falls back to the hotel's global mean.
    pub fn predict(
        &self,
        matrix: &RatingMatrix,
        user_idx: usize,
        hotel_idx: usize,
    ) -> Option<f32> {
        let mut raters: Vec<(f32, f32)> = matrix
            .hotel_ratings(hotel_idx)
            .iter()
            .filter(|(rater, _)| *rater != user_idx)
            .map(|&(rater, rating)| (self.similarity[[user_idx, rater]], rating))
            .filter(|(sim, _)| *sim > 0.0)
            .collect();
        if raters.is_empty() {
            return None;
        }

        raters.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        raters.truncate(self.neighbor_count);

        let numerator: f32 = raters.iter().map(|(sim, rating)| sim * rating).sum();
        let denominator: f32 = raters.iter().map(|(sim, _)| sim.abs()).sum();
        if denominator == 0.0 {
            return None;
        }
        Some((numerator / denominator).clamp(RATING_FLOOR, RATING_CEIL))
    }
}

/// Cosine similarity between two users over the hotels both rated.
/// Zero when they share no rated hotel.
fn co_rated_cosine(matrix: &RatingMatrix, a: usize, b: usize) -> f32 {
    let b_ratings: std::collections::HashMap<usize, f32> =
        matrix.user_ratings(b).iter().copied().collect();

    let mut left = Vec::new();
    let mut right = Vec::new();
    for &(hotel, rating_a) in matrix.user_ratings(a) {
        if let Some(&rating_b) = b_ratings.get(&hotel) {
            left.push(rating_a);
            right.push(rating_b);
        }
    }
    cosine_similarity(&left, &right)
}

/// Blended collaborative predictor for one snapshot
#[derive(Debug, Clone)]
pub struct CollaborativeModel {
    latent: LatentFactorModel,
    neighborhood: NeighborhoodModel,
    latent_weight: f32,
    neighborhood_weight: f32,
}

impl CollaborativeModel {
    /// Fit both predictors from the same matrix build
    pub fn fit(matrix: &RatingMatrix, config: &EngineConfig) -> Self {
        Self {
            latent: LatentFactorModel::fit(matrix, config),
            neighborhood: NeighborhoodModel::fit(matrix, config.neighbor_count),
            latent_weight: config.latent_weight,
            neighborhood_weight: config.neighborhood_weight,
        }
    }

    pub fn latent(&self) -> &LatentFactorModel {
        &self.latent
    }

    pub fn neighborhood(&self) -> &NeighborhoodModel {
        &self.neighborhood
    }

    /// Predict by id, failing with `ColdUser`/`ColdItem` when the pair
    /// is absent from this build.
    pub fn predict(
        &self,
        matrix: &RatingMatrix,
        user_id: Uuid,
        hotel_id: Uuid,
    ) -> Result<f32, HotelRecError> {
        let user_idx = matrix
            .user_index(user_id)
            .ok_or(HotelRecError::ColdUser(user_id))?;
        let hotel_idx = matrix
            .hotel_index(hotel_id)
            .ok_or(HotelRecError::ColdItem(hotel_id))?;
        Ok(self.predict_indexed(matrix, user_idx, hotel_idx))
    }

    /// Blend of the two predictors, clipped to the rating scale
    pub fn predict_indexed(&self, matrix: &RatingMatrix, user_idx: usize, hotel_idx: usize) -> f32 {
        let latent = self.latent.predict(user_idx, hotel_idx);
        let neighborhood = self
            .neighborhood
            .predict(matrix, user_idx, hotel_idx)
            .unwrap_or_else(|| matrix.hotel_mean(hotel_idx).clamp(RATING_FLOOR, RATING_CEIL));

        let weight_sum = self.latent_weight + self.neighborhood_weight;
        ((self.latent_weight * latent + self.neighborhood_weight * neighborhood) / weight_sum)
            .clamp(RATING_FLOOR, RATING_CEIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixBuilder;
    use chrono::Utc;
    use hotelrec_core::{Review, SentimentLabel};

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

    fn build_matrix(reviews: &[Review]) -> RatingMatrix {
        let refs: Vec<&Review> = reviews.iter().collect();
        MatrixBuilder::new(2, 2).build(&refs).unwrap()
    }

    fn small_config() -> EngineConfig {
        EngineConfig {
            latent_rank_cap: 2,
            latent_iterations: 10,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_solve_cholesky_identity() {
        let a = Array2::<f64>::eye(3);
        let b = Array1::from_vec(vec![1.0, 2.0, 3.0]);
        let x = solve_cholesky(&a, &b).unwrap();
        for i in 0..3 {
            assert!((x[i] - b[i]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_solve_cholesky_rejects_indefinite() {
        let mut a = Array2::<f64>::eye(2);
        a[[1, 1]] = -1.0;
        let b = Array1::from_vec(vec![1.0, 1.0]);
        assert!(solve_cholesky(&a, &b).is_none());
    }

    #[test]
    fn test_latent_fit_is_deterministic() {
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[0], hotels[1], 3),
            review(users[1], hotels[0], 4),
            review(users[1], hotels[2], 2),
            review(users[2], hotels[1], 1),
        ];
        let matrix = build_matrix(&reviews);
        let config = small_config();

        let a = LatentFactorModel::fit(&matrix, &config);
        let b = LatentFactorModel::fit(&matrix, &config);
        for u in 0..matrix.num_users() {
            for h in 0..matrix.num_hotels() {
                assert_eq!(a.predict(u, h), b.predict(u, h));
            }
        }
    }

    #[test]
    fn test_latent_rank_is_capped_by_matrix() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[0], hotels[1], 4),
            review(users[1], hotels[2], 3),
            review(users[1], hotels[3], 2),
        ];
        let matrix = build_matrix(&reviews);
        let model = LatentFactorModel::fit(&matrix, &EngineConfig::default());
        assert_eq!(model.rank(), 1); // min(20, min(2, 4) - 1)
    }

    #[test]
    fn test_latent_predictions_within_scale() {
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[0], hotels[1], 5),
            review(users[1], hotels[0], 1),
            review(users[2], hotels[2], 3),
        ];
        let matrix = build_matrix(&reviews);
        let model = LatentFactorModel::fit(&matrix, &small_config());
        for u in 0..matrix.num_users() {
            for h in 0..matrix.num_hotels() {
                let predicted = model.predict(u, h);
                assert!((RATING_FLOOR..=RATING_CEIL).contains(&predicted));
            }
        }
    }

    #[test]
    fn test_co_rated_cosine_no_overlap() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[1], hotels[1], 3),
        ];
        let matrix = build_matrix(&reviews);
        let a = matrix.user_index(users[0]).unwrap();
        let b = matrix.user_index(users[1]).unwrap();
        assert_eq!(co_rated_cosine(&matrix, a, b), 0.0);
    }

    #[test]
    fn test_neighborhood_prediction_weighted_average() {
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        // Both neighbors agree with the target user on hotel 0 and have
        // rated hotel 1, which the target user has not.
        let reviews = vec![
            review(users[0], hotels[0], 4),
            review(users[1], hotels[0], 4),
            review(users[1], hotels[1], 5),
            review(users[2], hotels[0], 4),
            review(users[2], hotels[1], 3),
        ];
        let matrix = build_matrix(&reviews);
        let model = NeighborhoodModel::fit(&matrix, 10);

        let target = matrix.user_index(users[0]).unwrap();
        let unseen = matrix.hotel_index(hotels[1]).unwrap();
        let predicted = model.predict(&matrix, target, unseen).unwrap();
        // Equal similarities, so the prediction is the plain average
        assert!((predicted - 4.0).abs() < 1e-5);
    }

    #[test]
    fn test_neighborhood_returns_none_without_raters() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[1], hotels[1], 3),
        ];
        let matrix = build_matrix(&reviews);
        let model = NeighborhoodModel::fit(&matrix, 10);

        let a = matrix.user_index(users[0]).unwrap();
        let h1 = matrix.hotel_index(hotels[1]).unwrap();
        // The only rater of hotel 1 shares no co-rated hotel with user 0
        assert!(model.predict(&matrix, a, h1).is_none());
    }

    #[test]
    fn test_collaborative_cold_errors() {
        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[1], hotels[1], 3),
        ];
        let matrix = build_matrix(&reviews);
        let model = CollaborativeModel::fit(&matrix, &small_config());

        let cold_user = Uuid::new_v4();
        let err = model.predict(&matrix, cold_user, hotels[0]).unwrap_err();
        assert!(matches!(err, HotelRecError::ColdUser(id) if id == cold_user));

        let cold_hotel = Uuid::new_v4();
        let err = model.predict(&matrix, users[0], cold_hotel).unwrap_err();
        assert!(matches!(err, HotelRecError::ColdItem(id) if id == cold_hotel));
    }

    #[test]
    fn test_collaborative_blend_within_scale() {
        let users: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let hotels: Vec<Uuid> = (0..3).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0], 5),
            review(users[0], hotels[1], 4),
            review(users[1], hotels[0], 5),
            review(users[1], hotels[2], 2),
            review(users[2], hotels[1], 3),
        ];
        let matrix = build_matrix(&reviews);
        let model = CollaborativeModel::fit(&matrix, &small_config());

        for user in &users {
            for hotel in &hotels {
                let predicted = model.predict(&matrix, *user, *hotel).unwrap();
                assert!((RATING_FLOOR..=RATING_CEIL).contains(&predicted));
            }
        }
    }
}
