//! Content-based filtering over hotel features
//!
//! Each active hotel becomes a weighted term document (description,
//! location, amenity tags, category), indexed into a TF-IDF space with
//! a sorted vocabulary so identical catalogs always produce identical
//! vectors. User taste is a normalized centroid of liked-hotel vectors,
//! or a projection of declared preference terms for users without
//! liked-hotel history.

use crate::matrix::RatingMatrix;
use hotelrec_core::validation::validate_amenity_tag;
use hotelrec_core::Hotel;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Term weight multipliers per feature field
const DESCRIPTION_WEIGHT: f32 = 1.0;
const LOCATION_WEIGHT: f32 = 2.0;
const AMENITY_WEIGHT: f32 = 2.0;
const CATEGORY_WEIGHT: f32 = 3.0;

/// Minimum token length kept by the tokenizer
const MIN_TOKEN_LENGTH: usize = 3;

/// Tokens too common to carry taste signal
const STOPWORDS: &[&str] = &[
    "and", "are", "for", "from", "has", "its", "near", "our", "the", "this", "with", "hotel",
    "room", "rooms", "stay",
];

/// Sparse term-index to weight mapping, L2-normalized after build.
/// Ordered so norm and dot-product accumulation happen in term order
/// and identical input always yields bit-identical vectors and scores.
pub type SparseVector = BTreeMap<usize, f32>;

/// TF-IDF index over the active hotel catalog
#[derive(Debug, Clone)]
pub struct ContentModel {
    hotel_ids: Vec<Uuid>,
    hotel_index: HashMap<Uuid, usize>,
    /// Term -> vocabulary index, vocabulary sorted lexicographically
    vocabulary: HashMap<String, usize>,
    idf: Vec<f32>,
    /// One normalized vector per hotel, hotel order
    vectors: Vec<SparseVector>,
}

impl ContentModel {
    /// Index the given hotels. Inactive hotels must already be filtered
    /// out by the caller; the model indexes everything it is handed.
    pub fn fit(hotels: &[Hotel]) -> Self {
        let mut hotel_ids: Vec<Uuid> = hotels.iter().map(|h| h.id).collect();
        hotel_ids.sort();
        let hotel_index: HashMap<Uuid, usize> = hotel_ids
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();

        let by_id: HashMap<Uuid, &Hotel> = hotels.iter().map(|h| (h.id, h)).collect();

        // Weighted term frequencies per hotel, BTreeMap for a sorted
        // vocabulary walk
        let mut documents: Vec<BTreeMap<String, f32>> = Vec::with_capacity(hotel_ids.len());
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();
        for id in &hotel_ids {
            let document = hotel_terms(by_id[id]);
            for term in document.keys() {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            documents.push(document);
        }

        let vocabulary: HashMap<String, usize> = document_frequency
            .keys()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();
        let total = hotel_ids.len();
        let idf: Vec<f32> = document_frequency
            .values()
            .map(|&df| (((1 + total) as f32) / ((1 + df) as f32)).ln() + 1.0)
            .collect();

        let vectors = documents
            .into_iter()
            .map(|document| {
                let mut vector: SparseVector = document
                    .into_iter()
                    .map(|(term, tf)| {
                        let idx = vocabulary[&term];
                        (idx, tf * idf[idx])
                    })
                    .collect();
                normalize(&mut vector);
                vector
            })
            .collect();

        Self {
            hotel_ids,
            hotel_index,
            vocabulary,
            idf,
            vectors,
        }
    }

    pub fn num_hotels(&self) -> usize {
        self.hotel_ids.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn hotel_index(&self, hotel_id: Uuid) -> Option<usize> {
        self.hotel_index.get(&hotel_id).copied()
    }

    pub fn hotel_id(&self, hotel_idx: usize) -> Uuid {
        self.hotel_ids[hotel_idx]
    }

    pub fn hotel_vector(&self, hotel_idx: usize) -> &SparseVector {
        &self.vectors[hotel_idx]
    }

    /// Taste profile as the normalized centroid of hotels the user rated
    /// at or above `liked_floor`. `None` when no liked hotel of the
    /// matrix build is indexed here.
    pub fn user_profile(
        &self,
        matrix: &RatingMatrix,
        user_idx: usize,
        liked_floor: i32,
    ) -> Option<SparseVector> {
        let mut profile = SparseVector::new();
        let mut liked = 0usize;
        for &(hotel_idx, rating) in matrix.user_ratings(user_idx) {
            if rating < liked_floor as f32 {
                continue;
            }
            let Some(content_idx) = self.hotel_index(matrix.hotel_id(hotel_idx)) else {
                continue;
            };
            for (&term, &weight) in &self.vectors[content_idx] {
                *profile.entry(term).or_insert(0.0) += weight;
            }
            liked += 1;
        }
        if liked == 0 {
            return None;
        }
        normalize(&mut profile);
        Some(profile)
    }

    /// Project weighted preference terms into this model's vector space.
    /// Terms outside the vocabulary are dropped; `None` when nothing
    /// projects.
    pub fn project_terms(&self, terms: &[(String, f32)]) -> Option<SparseVector> {
        let mut vector = SparseVector::new();
        for (term, weight) in terms {
            if let Some(&idx) = self.vocabulary.get(term.as_str()) {
                *vector.entry(idx).or_insert(0.0) += weight * self.idf[idx];
            }
        }
        if vector.is_empty() {
            return None;
        }
        normalize(&mut vector);
        Some(vector)
    }

    /// Cosine similarity between a profile and one indexed hotel. Both
    /// sides are unit vectors, so this is the sparse dot product.
    pub fn similarity(&self, profile: &SparseVector, hotel_idx: usize) -> f32 {
        let hotel = &self.vectors[hotel_idx];
        // Iterate the smaller side
        let (small, large) = if profile.len() <= hotel.len() {
            (profile, hotel)
        } else {
            (hotel, profile)
        };
        small
            .iter()
            .filter_map(|(term, weight)| large.get(term).map(|other| weight * other))
            .sum()
    }

    /// Map a cosine similarity onto the shared rating scale:
    /// orthogonal-or-worse is the floor, identical direction is 5.
    pub fn score(similarity: f32) -> f32 {
        1.0 + 4.0 * similarity.clamp(0.0, 1.0)
    }
}

/// Weighted term bag for one hotel's feature fields
fn hotel_terms(hotel: &Hotel) -> BTreeMap<String, f32> {
    let mut terms: BTreeMap<String, f32> = BTreeMap::new();
    for token in tokenize(&hotel.description) {
        *terms.entry(token).or_insert(0.0) += DESCRIPTION_WEIGHT;
    }
    for token in tokenize(&hotel.location) {
        *terms.entry(token).or_insert(0.0) += LOCATION_WEIGHT;
    }
    for amenity in &hotel.amenities {
        // Only slug-shaped tags are indexed; malformed tags are dropped
        let tag = amenity.trim().to_lowercase();
        if validate_amenity_tag(&tag).is_ok() {
            *terms.entry(tag).or_insert(0.0) += AMENITY_WEIGHT;
        }
    }
    for token in tokenize(&hotel.category) {
        *terms.entry(token).or_insert(0.0) += CATEGORY_WEIGHT;
    }
    terms
}

/// Lowercase alphanumeric tokens, stopwords and short tokens dropped
fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|token| token.len() >= MIN_TOKEN_LENGTH && !STOPWORDS.contains(&token.as_str()))
}

fn normalize(vector: &mut SparseVector) {
    let norm: f32 = vector.values().map(|w| w * w).sum::<f32>().sqrt();
    if norm > 0.0 {
        for weight in vector.values_mut() {
            *weight /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatrixBuilder;
    use chrono::Utc;
    use hotelrec_core::{Review, SentimentLabel};

    fn catalog() -> Vec<Hotel> {
        vec![
            Hotel::new("Seaside Grand", "oceanfront boardwalk", 4, "resort")
                .with_description("Spacious suites with ocean views and a private beach")
                .with_amenities(["pool", "spa", "beach-access"]),
            Hotel::new("Metro Hub", "financial district downtown", 3, "business")
                .with_description("Meeting facilities and fast wifi for work travel")
                .with_amenities(["gym", "conference-rooms"]),
            Hotel::new("Palm Retreat", "quiet cove oceanfront", 5, "resort")
                .with_description("Secluded beach resort with a full service spa")
                .with_amenities(["pool", "spa"]),
        ]
    }

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

    #[test]
    fn test_tokenize_drops_short_and_stopwords() {
        let tokens: Vec<String> = tokenize("The spa is near a beach, with WiFi!").collect();
        assert_eq!(tokens, vec!["spa", "beach", "wifi"]);
    }

    #[test]
    fn test_vectors_are_normalized() {
        let model = ContentModel::fit(&catalog());
        for idx in 0..model.num_hotels() {
            let norm: f32 = model
                .hotel_vector(idx)
                .values()
                .map(|w| w * w)
                .sum::<f32>()
                .sqrt();
            assert!((norm - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_similar_hotels_score_higher() {
        let hotels = catalog();
        let model = ContentModel::fit(&hotels);
        let seaside = model.hotel_index(hotels[0].id).unwrap();
        let metro = model.hotel_index(hotels[1].id).unwrap();
        let palm = model.hotel_index(hotels[2].id).unwrap();

        let profile = model.hotel_vector(seaside).clone();
        let to_palm = model.similarity(&profile, palm);
        let to_metro = model.similarity(&profile, metro);
        assert!(to_palm > to_metro);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let hotels = catalog();
        let a = ContentModel::fit(&hotels);
        let b = ContentModel::fit(&hotels);
        for idx in 0..a.num_hotels() {
            assert_eq!(a.hotel_vector(idx), b.hotel_vector(idx));
        }
    }

    #[test]
    fn test_scores_are_bit_identical_across_fits() {
        let hotels = catalog();
        let a = ContentModel::fit(&hotels);
        let b = ContentModel::fit(&hotels);

        let terms = vec![("spa".to_string(), 1.0), ("beach".to_string(), 2.0)];
        let profile_a = a.project_terms(&terms).unwrap();
        let profile_b = b.project_terms(&terms).unwrap();
        assert_eq!(profile_a, profile_b);

        // Norm and dot-product accumulation must not depend on which
        // fit produced the vectors
        for idx in 0..a.num_hotels() {
            assert_eq!(
                a.similarity(&profile_a, idx).to_bits(),
                b.similarity(&profile_b, idx).to_bits()
            );
        }
    }

    #[test]
    fn test_malformed_amenity_tags_are_not_indexed() {
        let hotel = Hotel::new("Inn", "downtown", 2, "budget")
            .with_amenities(["pool", "Free WiFi!"]);
        let model = ContentModel::fit(&[hotel]);

        assert!(model.project_terms(&[("pool".to_string(), 1.0)]).is_some());
        assert!(model
            .project_terms(&[("free wifi!".to_string(), 1.0)])
            .is_none());
    }

    #[test]
    fn test_user_profile_from_liked_hotels() {
        let hotels = catalog();
        let model = ContentModel::fit(&hotels);

        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        // User 0 likes the seaside resort and dislikes the business hotel
        let reviews = vec![
            review(users[0], hotels[0].id, 5),
            review(users[0], hotels[1].id, 2),
            review(users[1], hotels[1].id, 5),
        ];
        let refs: Vec<&Review> = reviews.iter().collect();
        let matrix = MatrixBuilder::new(2, 2).build(&refs).unwrap();

        let user_idx = matrix.user_index(users[0]).unwrap();
        let profile = model.user_profile(&matrix, user_idx, 4).unwrap();

        let palm = model.hotel_index(hotels[2].id).unwrap();
        let metro = model.hotel_index(hotels[1].id).unwrap();
        assert!(model.similarity(&profile, palm) > model.similarity(&profile, metro));
    }

    #[test]
    fn test_user_profile_none_without_liked_hotels() {
        let hotels = catalog();
        let model = ContentModel::fit(&hotels);

        let users: Vec<Uuid> = (0..2).map(|_| Uuid::new_v4()).collect();
        let reviews = vec![
            review(users[0], hotels[0].id, 2),
            review(users[1], hotels[1].id, 5),
        ];
        let refs: Vec<&Review> = reviews.iter().collect();
        let matrix = MatrixBuilder::new(2, 2).build(&refs).unwrap();

        let user_idx = matrix.user_index(users[0]).unwrap();
        assert!(model.user_profile(&matrix, user_idx, 4).is_none());
    }

    #[test]
    fn test_project_terms_matches_vocabulary() {
        let hotels = catalog();
        let model = ContentModel::fit(&hotels);

        let terms = vec![("spa".to_string(), 1.0), ("xylophone".to_string(), 1.0)];
        let vector = model.project_terms(&terms).unwrap();
        assert!(!vector.is_empty());

        let palm = model.hotel_index(hotels[2].id).unwrap();
        let metro = model.hotel_index(hotels[1].id).unwrap();
        assert!(model.similarity(&vector, palm) > model.similarity(&vector, metro));
    }

    #[test]
    fn test_project_terms_none_outside_vocabulary() {
        let model = ContentModel::fit(&catalog());
        let terms = vec![("xylophone".to_string(), 1.0)];
        assert!(model.project_terms(&terms).is_none());
    }

    #[test]
    fn test_score_maps_to_rating_scale() {
        assert_eq!(ContentModel::score(0.0), 1.0);
        assert_eq!(ContentModel::score(1.0), 5.0);
        assert_eq!(ContentModel::score(-0.5), 1.0);
        assert!((ContentModel::score(0.5) - 3.0).abs() < 1e-6);
    }
}
