//! Storage accessor boundary
//!
//! The engine never talks to persistence directly; it consumes the
//! [`InteractionStore`] trait. The Postgres implementation is the
//! production accessor, the in-memory implementation backs tests and
//! demos. Listings must be internally consistent within one refresh:
//! both implementations read each listing in a single operation.

use async_trait::async_trait;
use hotelrec_core::{Hotel, HotelRecError, PreferenceValue, Review, SentimentLabel};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use hotelrec_core::config::DatabaseConfig;

type Result<T> = std::result::Result<T, HotelRecError>;

/// Read/write accessor over the review and hotel store
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// All reviews, one consistent listing
    async fn list_reviews(&self) -> Result<Vec<Review>>;

    /// All hotels, one consistent listing
    async fn list_hotels(&self) -> Result<Vec<Hotel>>;

    /// Declared preference mapping for one user (empty if none declared)
    async fn get_user_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<String, PreferenceValue>>;

    /// Persist a review, replacing any existing review by the same user
    /// for the same hotel
    async fn upsert_review(&self, review: Review) -> Result<Review>;
}

/// In-memory store used by tests and local demos
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    hotels: Vec<Hotel>,
    reviews: Vec<Review>,
    preferences: HashMap<Uuid, HashMap<String, PreferenceValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hotel(&self, hotel: Hotel) {
        self.inner.write().expect("store lock poisoned").hotels.push(hotel);
    }

    pub fn add_review(&self, review: Review) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner
            .reviews
            .retain(|r| !(r.user_id == review.user_id && r.hotel_id == review.hotel_id));
        inner.reviews.push(review);
    }

    pub fn set_preferences(&self, user_id: Uuid, preferences: HashMap<String, PreferenceValue>) {
        self.inner
            .write()
            .expect("store lock poisoned")
            .preferences
            .insert(user_id, preferences);
    }

    pub fn review_count(&self) -> usize {
        self.inner.read().expect("store lock poisoned").reviews.len()
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn list_reviews(&self) -> Result<Vec<Review>> {
        Ok(self.inner.read().expect("store lock poisoned").reviews.clone())
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        Ok(self.inner.read().expect("store lock poisoned").hotels.clone())
    }

    async fn get_user_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<String, PreferenceValue>> {
        Ok(self
            .inner
            .read()
            .expect("store lock poisoned")
            .preferences
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_review(&self, review: Review) -> Result<Review> {
        self.add_review(review.clone());
        Ok(review)
    }
}

/// Postgres-backed interaction store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the shared database configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl InteractionStore for PgStore {
    async fn list_reviews(&self) -> Result<Vec<Review>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, hotel_id, rating, comment,
                   sentiment_polarity, sentiment_label, created_at
            FROM reviews
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut reviews = Vec::with_capacity(rows.len());
        for row in rows {
            let label: String = row.get("sentiment_label");
            reviews.push(Review {
                id: row.get("id"),
                user_id: row.get("user_id"),
                hotel_id: row.get("hotel_id"),
                rating: row.get("rating"),
                comment: row.get::<Option<String>, _>("comment").unwrap_or_default(),
                sentiment_polarity: row.get::<f64, _>("sentiment_polarity") as f32,
                sentiment_label: label.parse().unwrap_or(SentimentLabel::Neutral),
                created_at: row.get("created_at"),
            });
        }
        Ok(reviews)
    }

    async fn list_hotels(&self) -> Result<Vec<Hotel>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, location, price_tier, category, description,
                   amenities, is_active, rating, review_count
            FROM hotels
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut hotels = Vec::with_capacity(rows.len());
        for row in rows {
            hotels.push(Hotel {
                id: row.get("id"),
                name: row.get("name"),
                location: row.get("location"),
                price_tier: row.get("price_tier"),
                category: row.get("category"),
                description: row
                    .get::<Option<String>, _>("description")
                    .unwrap_or_default(),
                amenities: row
                    .get::<Option<Vec<String>>, _>("amenities")
                    .unwrap_or_default(),
                is_active: row.get("is_active"),
                rating: row.get::<f64, _>("rating") as f32,
                review_count: row.get("review_count"),
            });
        }
        Ok(hotels)
    }

    async fn get_user_preferences(
        &self,
        user_id: Uuid,
    ) -> Result<HashMap<String, PreferenceValue>> {
        let row = sqlx::query(
            r#"
            SELECT preferences
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(HashMap::new());
        };
        let value: Option<serde_json::Value> = row.get("preferences");
        match value {
            Some(json) => serde_json::from_value(json).map_err(|e| {
                HotelRecError::validation_field(
                    format!("malformed preference mapping: {}", e),
                    "preferences",
                )
            }),
            None => Ok(HashMap::new()),
        }
    }

    async fn upsert_review(&self, review: Review) -> Result<Review> {
        // One active review per (user, hotel): resubmission replaces
        sqlx::query(
            r#"
            INSERT INTO reviews (id, user_id, hotel_id, rating, comment,
                                 sentiment_polarity, sentiment_label, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, hotel_id) DO UPDATE SET
                id = EXCLUDED.id,
                rating = EXCLUDED.rating,
                comment = EXCLUDED.comment,
                sentiment_polarity = EXCLUDED.sentiment_polarity,
                sentiment_label = EXCLUDED.sentiment_label,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(review.id)
        .bind(review.user_id)
        .bind(review.hotel_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.sentiment_polarity as f64)
        .bind(review.sentiment_label.as_str())
        .bind(review.created_at)
        .execute(&self.pool)
        .await?;

        Ok(review)
    }
}
