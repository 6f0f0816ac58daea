//! Snapshot cache and refresh orchestration
//!
//! All fitted models live in one immutable [`ModelSnapshot`] behind an
//! atomically swapped pointer. Requests read whichever snapshot is
//! published and never observe a half-built one. Refreshes are
//! single-flight: concurrent triggers coalesce onto the refresh already
//! in progress and share its outcome. A failed refresh keeps the
//! previous snapshot serving.

use crate::cold_start::PopularityPrior;
use crate::collaborative::CollaborativeModel;
use crate::content::ContentModel;
use crate::hybrid::HybridAggregator;
use crate::matrix::{build_aggregates, dedupe_latest, HotelAggregate, MatrixBuilder, RatingMatrix};
use crate::sentiment::{SentimentScorer, SentimentSummary};
use crate::store::InteractionStore;
use crate::types::{Method, RecommendationResult, RefreshStatus};
use chrono::{DateTime, Utc};
use hotelrec_core::config::{ConfigLoader, EngineConfig};
use hotelrec_core::{validation, Hotel, HotelRecError, Review};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use uuid::Uuid;

type Result<T> = std::result::Result<T, HotelRecError>;

/// One consistent view of every fitted model
///
/// `matrix` and `collaborative` are `None` when the review set is below
/// the matrix floors; the snapshot then serves cold-start and
/// content-based rankings only.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub hotels: Vec<Hotel>,
    pub matrix: Option<RatingMatrix>,
    pub collaborative: Option<CollaborativeModel>,
    pub content: ContentModel,
    pub aggregates: HashMap<Uuid, HotelAggregate>,
    pub sentiment: HashMap<Uuid, SentimentSummary>,
    pub prior: PopularityPrior,
    pub user_count: usize,
    pub review_count: usize,
    pub built_at: DateTime<Utc>,
}

impl ModelSnapshot {
    /// Build every model from one consistent pair of listings.
    ///
    /// Pure and synchronous: all data has already been fetched, so a
    /// build can never observe a torn view of the store.
    pub fn build(hotels: Vec<Hotel>, reviews: Vec<Review>, config: &EngineConfig) -> Self {
        let mut hotels: Vec<Hotel> = hotels.into_iter().filter(|h| h.is_active).collect();
        let active_ids: HashSet<Uuid> = hotels.iter().map(|h| h.id).collect();

        let deduped = dedupe_latest(&reviews, &active_ids);
        let aggregates = build_aggregates(&hotels, &deduped);
        for hotel in &mut hotels {
            if let Some(aggregate) = aggregates.get(&hotel.id) {
                hotel.rating = aggregate.mean_rating;
                hotel.review_count = aggregate.review_count as i64;
            }
        }
        let prior = PopularityPrior::compute(&aggregates);
        let content = ContentModel::fit(&hotels);

        let scorer = SentimentScorer::new();
        let mut by_hotel: HashMap<Uuid, Vec<&Review>> = HashMap::new();
        for review in &deduped {
            by_hotel.entry(review.hotel_id).or_default().push(review);
        }
        let sentiment = by_hotel
            .into_iter()
            .map(|(hotel_id, reviews)| (hotel_id, scorer.summarize(&reviews)))
            .collect();

        let matrix = match MatrixBuilder::new(config.min_users, config.min_hotels).build(&deduped)
        {
            Ok(matrix) => Some(matrix),
            Err(err) if err.is_insufficient_data() => {
                tracing::info!(%err, "matrix below floors, serving cold-start only");
                None
            }
            Err(err) => {
                tracing::warn!(%err, "matrix build failed, serving cold-start only");
                None
            }
        };
        let collaborative = matrix
            .as_ref()
            .map(|matrix| CollaborativeModel::fit(matrix, config));

        let user_count = deduped
            .iter()
            .map(|r| r.user_id)
            .collect::<HashSet<_>>()
            .len();
        let review_count = deduped.len();

        Self {
            hotels,
            matrix,
            collaborative,
            content,
            aggregates,
            sentiment,
            prior,
            user_count,
            review_count,
            built_at: Utc::now(),
        }
    }

    pub fn hotel_count(&self) -> usize {
        self.hotels.len()
    }
}

/// Serving facade: snapshot pointer, refresh coordination and the
/// review write path
pub struct RecommendationCache {
    store: Arc<dyn InteractionStore>,
    config: EngineConfig,
    scorer: SentimentScorer,
    aggregator: HybridAggregator,
    snapshot: RwLock<Option<Arc<ModelSnapshot>>>,
    refresh_lock: tokio::sync::Mutex<()>,
    /// Reviews accepted since the last published snapshot
    pending_reviews: AtomicUsize,
}

impl RecommendationCache {
    /// Fails when the configuration is invalid; nothing downstream has
    /// to re-check weights or thresholds.
    pub fn new(store: Arc<dyn InteractionStore>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            store,
            aggregator: HybridAggregator::new(config.clone()),
            config,
            scorer: SentimentScorer::new(),
            snapshot: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            pending_reviews: AtomicUsize::new(0),
        })
    }

    /// Currently published snapshot, if any
    pub fn snapshot(&self) -> Option<Arc<ModelSnapshot>> {
        self.snapshot.read().expect("snapshot lock poisoned").clone()
    }

    /// Whether the published snapshot is stale by age or by accepted
    /// review volume
    pub fn needs_refresh(&self) -> bool {
        let Some(snapshot) = self.snapshot() else {
            return true;
        };
        if self.pending_reviews.load(Ordering::Relaxed) >= self.config.refresh_review_count {
            return true;
        }
        let age = Utc::now() - snapshot.built_at;
        age.to_std()
            .map(|age| age >= self.config.refresh_interval)
            .unwrap_or(false)
    }

    /// Rebuild and publish a snapshot.
    ///
    /// Single-flight: if a refresh is already running, wait for it and
    /// share its snapshot instead of rebuilding again.
    pub async fn refresh(&self) -> Result<Arc<ModelSnapshot>> {
        match self.refresh_lock.try_lock() {
            Ok(_guard) => self.rebuild().await,
            Err(_) => {
                let _guard = self.refresh_lock.lock().await;
                self.snapshot().ok_or_else(|| {
                    HotelRecError::from(anyhow::anyhow!(
                        "concurrent model refresh failed, no snapshot available"
                    ))
                })
            }
        }
    }

    async fn rebuild(&self) -> Result<Arc<ModelSnapshot>> {
        let started = Instant::now();
        let fetched = async {
            let hotels = self.store.list_hotels().await?;
            let reviews = self.store.list_reviews().await?;
            Ok::<_, HotelRecError>((hotels, reviews))
        }
        .await;

        let (hotels, reviews) = match fetched {
            Ok(listings) => listings,
            Err(err) => {
                tracing::warn!(%err, "model refresh failed, keeping previous snapshot");
                return Err(err);
            }
        };

        let snapshot = Arc::new(ModelSnapshot::build(hotels, reviews, &self.config));
        *self.snapshot.write().expect("snapshot lock poisoned") = Some(snapshot.clone());
        self.pending_reviews.store(0, Ordering::Relaxed);
        tracing::info!(
            users = snapshot.user_count,
            hotels = snapshot.hotel_count(),
            reviews = snapshot.review_count,
            collaborative = snapshot.collaborative.is_some(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "published model snapshot"
        );
        Ok(snapshot)
    }

    /// Serve one recommendation request against the published snapshot,
    /// refreshing first when none exists or the current one is stale.
    pub async fn recommend(
        &self,
        user_id: Option<Uuid>,
        method: Method,
        top_n: Option<usize>,
    ) -> Result<RecommendationResult> {
        let snapshot = match self.snapshot() {
            Some(snapshot) if !self.needs_refresh() => snapshot,
            Some(stale) => match self.refresh().await {
                Ok(snapshot) => snapshot,
                Err(err) => {
                    tracing::warn!(%err, "refresh failed, serving stale snapshot");
                    stale
                }
            },
            None => self.refresh().await?,
        };

        let preferences = match user_id {
            Some(user_id) => self.store.get_user_preferences(user_id).await?,
            None => HashMap::new(),
        };

        let top_n = top_n.unwrap_or(self.config.default_top_n);
        self.aggregator
            .recommend(&snapshot, user_id, &preferences, method, top_n)
    }

    /// Accept a review: validate, score sentiment, persist. The models
    /// pick it up on the next refresh; nothing is rebuilt inline.
    pub async fn submit_review(
        &self,
        user_id: Uuid,
        hotel_id: Uuid,
        rating: i32,
        comment: impl Into<String>,
    ) -> Result<Review> {
        let comment = comment.into();
        validation::validate_rating(rating)?;
        validation::validate_comment(&comment)?;

        let (polarity, label) = self.scorer.score(&comment);
        let review = Review {
            id: Uuid::new_v4(),
            user_id,
            hotel_id,
            rating,
            comment,
            sentiment_polarity: polarity,
            sentiment_label: label,
            created_at: Utc::now(),
        };

        let review = self.store.upsert_review(review).await?;
        let pending = self.pending_reviews.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::debug!(%user_id, %hotel_id, rating, pending, "review accepted");
        Ok(review)
    }

    pub fn refresh_status(&self) -> RefreshStatus {
        let snapshot = self.snapshot();
        RefreshStatus {
            last_refresh: snapshot.as_ref().map(|s| s.built_at),
            user_count: snapshot.as_ref().map(|s| s.user_count).unwrap_or(0),
            hotel_count: snapshot.as_ref().map(|s| s.hotel_count()).unwrap_or(0),
            review_count: snapshot.as_ref().map(|s| s.review_count).unwrap_or(0),
            pending_reviews: self.pending_reviews.load(Ordering::Relaxed),
            healthy: snapshot.is_some(),
        }
    }
}
