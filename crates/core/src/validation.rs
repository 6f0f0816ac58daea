//! Validation utilities for HotelRec data structures
//!
//! Write-boundary checks: invalid data is rejected before anything is
//! persisted, so the engine never has to repair half-written records.

use crate::error::HotelRecError;
use crate::models::{MAX_RATING, MIN_RATING};
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest accepted review comment, in characters
pub const MAX_COMMENT_LENGTH: usize = 5000;

/// Amenity tag pattern: lowercase slug such as "pool" or "free-wifi"
pub static AMENITY_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9 _-]{0,49}$").expect("Failed to compile amenity tag regex")
});

/// Validate a star rating
///
/// # Examples
///
/// ```
/// use hotelrec_core::validation::validate_rating;
///
/// assert!(validate_rating(4).is_ok());
/// assert!(validate_rating(0).is_err());
/// ```
pub fn validate_rating(rating: i32) -> Result<(), HotelRecError> {
    if (MIN_RATING..=MAX_RATING).contains(&rating) {
        Ok(())
    } else {
        Err(HotelRecError::InvalidRating {
            value: rating,
            min: MIN_RATING,
            max: MAX_RATING,
        })
    }
}

/// Validate a review comment. Empty comments are allowed (they score as
/// neutral sentiment), oversized ones are rejected.
pub fn validate_comment(comment: &str) -> Result<(), HotelRecError> {
    if comment.chars().count() > MAX_COMMENT_LENGTH {
        Err(HotelRecError::validation_field(
            format!("comment exceeds {} characters", MAX_COMMENT_LENGTH),
            "comment",
        ))
    } else {
        Ok(())
    }
}

/// Validate an amenity tag slug
///
/// # Examples
///
/// ```
/// use hotelrec_core::validation::validate_amenity_tag;
///
/// assert!(validate_amenity_tag("free-wifi").is_ok());
/// assert!(validate_amenity_tag("Free WiFi!").is_err());
/// ```
pub fn validate_amenity_tag(tag: &str) -> Result<(), HotelRecError> {
    if AMENITY_TAG_REGEX.is_match(tag) {
        Ok(())
    } else {
        Err(HotelRecError::validation_field(
            "Invalid amenity tag (expected a lowercase slug)",
            "amenity",
        ))
    }
}
