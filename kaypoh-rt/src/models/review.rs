//! Review records
//!
//! The crawl vendor reports the same field under several names
//! (`text`/`reviewText`, `stars`/`rating`, ...). `RawReview` accepts all of
//! them and `RawReview::normalize` produces the single canonical `Review`
//! shape. Nothing downstream of ingestion looks at the aliases again.

use serde::{Deserialize, Serialize};

/// One user-submitted review, immutable once ingested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    /// Raw review text, never blank
    pub text: String,
    /// Star rating, nominally 1.0-5.0; out-of-range values pass through
    pub rating: Option<f64>,
    /// Reviewer display name
    pub author: Option<String>,
    /// Whether any photo is attached
    pub has_photo: bool,
}

impl Review {
    pub fn new(text: impl Into<String>, rating: Option<f64>, author: Option<String>, has_photo: bool) -> Self {
        Self {
            text: text.into(),
            rating,
            author,
            has_photo,
        }
    }

    /// Best-effort identity used to restore input order after classification
    pub fn key(&self) -> ReviewKey {
        ReviewKey {
            text: self.text.clone(),
            author: self.author.clone().unwrap_or_default(),
            rating_bits: self.rating.map(f64::to_bits),
        }
    }
}

/// Composite (text, author, rating) key
///
/// Not injective: two reviews with identical text, author and rating share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReviewKey {
    text: String,
    author: String,
    rating_bits: Option<u64>,
}

/// Review record as returned by the crawl dataset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReview {
    pub text: Option<String>,
    pub review_text: Option<String>,
    pub stars: Option<f64>,
    pub rating: Option<f64>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub author_name: Option<String>,
    pub reviewer_photos: Option<Vec<serde_json::Value>>,
    pub photos: Option<Vec<serde_json::Value>>,
    pub images: Option<Vec<serde_json::Value>>,
    pub review_image_urls: Option<Vec<serde_json::Value>>,
}

impl RawReview {
    /// Canonicalize; returns `None` when the record carries no review text.
    pub fn normalize(self) -> Option<Review> {
        let text = first_non_blank([self.text, self.review_text])?;

        let rating = [self.stars, self.rating]
            .into_iter()
            .flatten()
            .find(|r| *r != 0.0 && r.is_finite());

        let author = first_non_blank([self.name, self.author, self.author_name]);

        let has_photo = [
            &self.reviewer_photos,
            &self.photos,
            &self.images,
            &self.review_image_urls,
        ]
        .into_iter()
        .any(|list| list.as_ref().is_some_and(|l| !l.is_empty()));

        Some(Review {
            text,
            rating,
            author,
            has_photo,
        })
    }
}

fn first_non_blank<const N: usize>(candidates: [Option<String>; N]) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .find(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawReview {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_primary_fields() {
        let review = raw(json!({
            "text": "Great coffee",
            "stars": 5,
            "name": "Alice",
            "reviewImageUrls": ["https://img/1.jpg"]
        }))
        .normalize()
        .unwrap();

        assert_eq!(review.text, "Great coffee");
        assert_eq!(review.rating, Some(5.0));
        assert_eq!(review.author.as_deref(), Some("Alice"));
        assert!(review.has_photo);
    }

    #[test]
    fn test_normalize_alias_fields() {
        let review = raw(json!({
            "text": "",
            "reviewText": "Decent pasta",
            "rating": 3.0,
            "authorName": "Bob",
            "photos": []
        }))
        .normalize()
        .unwrap();

        assert_eq!(review.text, "Decent pasta");
        assert_eq!(review.rating, Some(3.0));
        assert_eq!(review.author.as_deref(), Some("Bob"));
        assert!(!review.has_photo);
    }

    #[test]
    fn test_zero_stars_falls_back_to_rating() {
        let review = raw(json!({"text": "fine", "stars": 0, "rating": 4}))
            .normalize()
            .unwrap();
        assert_eq!(review.rating, Some(4.0));
    }

    #[test]
    fn test_blank_text_is_dropped() {
        assert!(raw(json!({"text": "   ", "stars": 4})).normalize().is_none());
        assert!(raw(json!({"text": null, "reviewText": null})).normalize().is_none());
    }

    #[test]
    fn test_key_distinguishes_author_and_rating() {
        let a = Review::new("same", Some(4.0), Some("A".into()), false);
        let b = Review::new("same", Some(4.0), Some("B".into()), false);
        let c = Review::new("same", Some(3.0), Some("A".into()), false);
        let a2 = Review::new("same", Some(4.0), Some("A".into()), true);

        assert_ne!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        // Photo flag is not part of the key
        assert_eq!(a.key(), a2.key());
    }

    #[test]
    fn test_review_serializes_camel_case() {
        let review = Review::new("hi there", None, None, true);
        let json = serde_json::to_value(&review).unwrap();
        assert_eq!(json["hasPhoto"], true);
        assert!(json["rating"].is_null());
    }
}
