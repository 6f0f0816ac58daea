//! Lexicon-based sentiment scoring for review text
//!
//! A pure function of the text: no learned state beyond the fixed
//! hotel-domain lexicons, so a review's polarity never changes between
//! refreshes. Called synchronously when a review is submitted and again
//! when per-hotel sentiment aggregates are recomputed.

use hotelrec_core::{Review, SentimentLabel};

/// Polarity above which text is labelled positive
pub const POSITIVE_THRESHOLD: f32 = 0.1;
/// Polarity below which text is labelled negative
pub const NEGATIVE_THRESHOLD: f32 = -0.1;

/// Hotel-domain positive cues. Matched as substrings of the lowercased
/// text so inflections ("loved", "recommended") hit their stems.
const POSITIVE_KEYWORDS: &[&str] = &[
    "excellent",
    "amazing",
    "wonderful",
    "fantastic",
    "outstanding",
    "comfortable",
    "clean",
    "helpful",
    "friendly",
    "professional",
    "luxurious",
    "spacious",
    "beautiful",
    "perfect",
    "recommend",
    "love",
    "enjoy",
    "impressed",
    "satisfied",
    "delighted",
];

const NEGATIVE_KEYWORDS: &[&str] = &[
    "terrible",
    "awful",
    "horrible",
    "disappointing",
    "poor",
    "dirty",
    "uncomfortable",
    "rude",
    "unprofessional",
    "noisy",
    "overpriced",
    "crowded",
    "outdated",
    "broken",
    "hate",
    "worst",
    "avoid",
    "regret",
];

/// Aggregated sentiment over a hotel's review set
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SentimentSummary {
    /// Mean polarity across reviews, 0.0 when there are none
    pub average_polarity: f32,
    pub positive: usize,
    pub neutral: usize,
    pub negative: usize,
    pub total: usize,
}

/// Deterministic text-to-polarity scorer
#[derive(Debug, Clone, Default)]
pub struct SentimentScorer;

impl SentimentScorer {
    pub fn new() -> Self {
        Self
    }

    /// Score text, returning polarity in [-1, 1] and its label.
    ///
    /// Empty or whitespace-only text is neutral with polarity 0.0.
    pub fn score(&self, text: &str) -> (f32, SentimentLabel) {
        let polarity = self.polarity(text);
        (polarity, Self::label(polarity))
    }

    /// Map a polarity onto the categorical label
    pub fn label(polarity: f32) -> SentimentLabel {
        if polarity > POSITIVE_THRESHOLD {
            SentimentLabel::Positive
        } else if polarity < NEGATIVE_THRESHOLD {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }

    fn polarity(&self, text: &str) -> f32 {
        let normalized = text.to_lowercase();
        let trimmed = normalized.trim();
        if trimmed.is_empty() {
            return 0.0;
        }

        let positive = count_hits(trimmed, POSITIVE_KEYWORDS);
        let negative = count_hits(trimmed, NEGATIVE_KEYWORDS);
        let hits = positive + negative;
        if hits == 0 {
            return 0.0;
        }

        let ratio = (positive as f32 - negative as f32) / hits as f32;
        let words = trimmed.split_whitespace().count().max(1);
        let density = (positive as f32 - negative as f32) / words as f32;

        // Direction dominated by the keyword ratio, dampened slightly by
        // keyword density so a single cue in a long rant stays moderate.
        (0.8 * ratio + 0.2 * density).clamp(-1.0, 1.0)
    }

    /// Summarize sentiment across a hotel's reviews
    pub fn summarize(&self, reviews: &[&Review]) -> SentimentSummary {
        let mut summary = SentimentSummary::default();
        if reviews.is_empty() {
            return summary;
        }

        let mut polarity_sum = 0.0f32;
        for review in reviews {
            polarity_sum += review.sentiment_polarity;
            match review.sentiment_label {
                SentimentLabel::Positive => summary.positive += 1,
                SentimentLabel::Neutral => summary.neutral += 1,
                SentimentLabel::Negative => summary.negative += 1,
            }
        }
        summary.total = reviews.len();
        summary.average_polarity = polarity_sum / reviews.len() as f32;
        summary
    }
}

fn count_hits(text: &str, keywords: &[&str]) -> usize {
    keywords.iter().map(|kw| text.matches(kw).count()).sum()
}
