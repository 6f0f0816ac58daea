//! Hotel model
//!
//! The `rating` and `review_count` fields are derived aggregates: they are
//! recomputed wholesale from the full review set on every model refresh,
//! never patched incrementally.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A hotel record with content features used by the content-based filter
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Hotel {
    pub id: Uuid,

    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Free-text location (city, neighborhood, landmarks)
    #[validate(length(min = 1, max = 200))]
    pub location: String,

    /// Numeric price tier, 1 (budget) through 5 (ultra-luxury)
    #[validate(range(min = 1, max = 5))]
    pub price_tier: i32,

    /// Category such as "resort", "business", "boutique"
    #[validate(length(min = 1, max = 100))]
    pub category: String,

    /// Free-text description
    #[serde(default)]
    pub description: String,

    /// Amenity tags, lowercase slugs (e.g. "pool", "free-wifi")
    #[serde(default)]
    pub amenities: Vec<String>,

    /// Inactive hotels are excluded from matrix builds and candidates
    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Derived: mean rating across the current review set
    #[serde(default)]
    pub rating: f32,

    /// Derived: number of reviews in the current review set
    #[serde(default)]
    pub review_count: i64,
}

fn default_active() -> bool {
    true
}

impl Hotel {
    /// Minimal constructor for a new hotel with no review history
    pub fn new(
        name: impl Into<String>,
        location: impl Into<String>,
        price_tier: i32,
        category: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            location: location.into(),
            price_tier,
            category: category.into(),
            description: String::new(),
            amenities: Vec::new(),
            is_active: true,
            rating: 0.0,
            review_count: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_amenities<I, S>(mut self, amenities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.amenities = amenities.into_iter().map(Into::into).collect();
        self
    }
}
