//! Domain models for the HotelRec platform

pub mod hotel;
pub mod review;
pub mod user;

pub use hotel::Hotel;
pub use review::{Review, SentimentLabel, MAX_RATING, MIN_RATING};
pub use user::{PreferenceValue, User};
