//! Places and per-place classification summaries

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::classification::{Category, ClassifiedReview};
use super::review::{RawReview, Review};

/// Tally produced by batch triage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageSummary {
    pub total_reviews: usize,
    pub locally_classified: usize,
    pub needs_model: usize,
    /// Histogram over locally decided reviews
    pub by_category: BTreeMap<Category, usize>,
}

/// Summary attached to each place after the full pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationSummary {
    #[serde(flatten)]
    pub triage: TriageSummary,
    /// Reviews labelled by the remote model
    pub model_classified: usize,
    /// Reviews left `Unclassified` after a remote failure
    pub failed: usize,
}

/// A business with its classified reviews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub title: String,
    pub address: Option<String>,
    /// Aggregate rating reported by the crawl source
    pub total_score: Option<f64>,
    /// Review count reported by the crawl source
    pub reviews_count: Option<u64>,
    pub url: Option<String>,
    pub reviews: Vec<ClassifiedReview>,
    pub classification_summary: ClassificationSummary,
}

/// Place record as returned by the crawl dataset
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPlace {
    pub title: Option<String>,
    pub name: Option<String>,
    pub address: Option<String>,
    pub location: Option<serde_json::Value>,
    pub total_score: Option<f64>,
    pub rating: Option<f64>,
    pub reviews_count: Option<u64>,
    pub url: Option<String>,
    /// Review records, decoded one by one during `normalize`; `null` reads as none
    #[serde(default)]
    pub reviews: Option<Vec<serde_json::Value>>,
}

/// Place identity and canonical reviews, before classification
#[derive(Debug, Clone, PartialEq)]
pub struct IngestedPlace {
    pub title: String,
    pub address: Option<String>,
    pub total_score: Option<f64>,
    pub reviews_count: Option<u64>,
    pub url: Option<String>,
    pub reviews: Vec<Review>,
    /// Raw review records discarded for lacking text or being malformed
    pub dropped_reviews: usize,
}

impl RawPlace {
    /// Canonicalize the place and its reviews
    pub fn normalize(self) -> IngestedPlace {
        let title = [self.title, self.name]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Unknown Place".to_string());

        // `location` is sometimes a lat/lng object rather than an address
        let address = self.address.filter(|a| !a.trim().is_empty()).or_else(|| {
            self.location
                .as_ref()
                .and_then(|l| l.as_str())
                .map(str::to_string)
        });

        let raw_reviews = self.reviews.unwrap_or_default();
        let raw_count = raw_reviews.len();
        let reviews: Vec<Review> = raw_reviews
            .into_iter()
            .filter_map(|value| match serde_json::from_value::<RawReview>(value) {
                Ok(raw) => raw.normalize(),
                Err(e) => {
                    tracing::warn!(place = %title, error = %e, "Skipping malformed review record");
                    None
                }
            })
            .collect();

        IngestedPlace {
            title,
            address,
            total_score: self.total_score.or(self.rating),
            reviews_count: self.reviews_count,
            url: self.url,
            dropped_reviews: raw_count - reviews.len(),
            reviews,
        }
    }
}

impl IngestedPlace {
    /// Attach classified reviews and the summary
    pub fn into_place(
        self,
        reviews: Vec<ClassifiedReview>,
        classification_summary: ClassificationSummary,
    ) -> Place {
        Place {
            title: self.title,
            address: self.address,
            total_score: self.total_score,
            reviews_count: self.reviews_count,
            url: self.url,
            reviews,
            classification_summary,
        }
    }
}
