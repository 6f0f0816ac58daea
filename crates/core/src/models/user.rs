//! User model and declared preferences
//!
//! Users own their declared preference mapping; reviews are referenced
//! by id, not owned. Preferences drive cold-start ranking and the
//! content-based profile when a user has no liked-hotel history.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A declared preference value for one preference dimension
///
/// Dimensions are free-form keys such as "amenities", "category",
/// "location" or "travel_purpose". Weighted dimensions express how much
/// the user cares about the dimension itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    /// Numeric weight attached to the dimension key itself
    Weight(f32),
    /// Single categorical value
    Tag(String),
    /// Multiple categorical values
    Tags(Vec<String>),
}

/// A platform user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Declared preference mapping, dimension -> value
    #[serde(default)]
    pub preferences: HashMap<String, PreferenceValue>,
    /// Reviews authored by this user (referenced, not owned)
    #[serde(default)]
    pub review_ids: Vec<Uuid>,
}

impl User {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            preferences: HashMap::new(),
            review_ids: Vec::new(),
        }
    }

    /// Flatten declared preferences into weighted terms over the same
    /// vocabulary the content-based filter indexes hotels with.
    ///
    /// Categorical values become terms of weight 1.0; a `Weight` entry
    /// turns its own dimension key into a term with that weight.
    pub fn preference_terms(preferences: &HashMap<String, PreferenceValue>) -> Vec<(String, f32)> {
        let mut terms = Vec::new();
        for (dimension, value) in preferences {
            match value {
                PreferenceValue::Weight(w) => {
                    if *w > 0.0 {
                        terms.push((dimension.to_lowercase(), *w));
                    }
                }
                PreferenceValue::Tag(tag) => terms.push((tag.to_lowercase(), 1.0)),
                PreferenceValue::Tags(tags) => {
                    terms.extend(tags.iter().map(|t| (t.to_lowercase(), 1.0)));
                }
            }
        }
        // Deterministic order regardless of map iteration
        terms.sort_by(|a, b| a.0.cmp(&b.0));
        terms
    }
}
