//! Classification labels and per-review results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::review::Review;

/// Suffix the remote model appends to some labels ("Useful Review")
const MODEL_LABEL_SUFFIX: &str = " Review";

/// Content-quality category
///
/// Categories are not mutually exclusive; a review may carry several.
/// `Unclassified` is only ever assigned when no stage could decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Advertisements,
    Spam,
    #[serde(rename = "Rant Without Visit")]
    RantWithoutVisit,
    #[serde(rename = "Irrelevant Content")]
    IrrelevantContent,
    Useful,
    Unclassified,
}

impl Category {
    /// Labels the rule engine and the model may assign
    pub const VOCABULARY: [Category; 5] = [
        Category::Advertisements,
        Category::Spam,
        Category::RantWithoutVisit,
        Category::IrrelevantContent,
        Category::Useful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Advertisements => "Advertisements",
            Category::Spam => "Spam",
            Category::RantWithoutVisit => "Rant Without Visit",
            Category::IrrelevantContent => "Irrelevant Content",
            Category::Useful => "Useful",
            Category::Unclassified => "Unclassified",
        }
    }

    /// Parse a model label, normalizing the " Review" suffix first.
    ///
    /// Returns `None` for labels outside the vocabulary.
    pub fn from_model_label(label: &str) -> Option<Category> {
        let label = normalize_label(label.trim());
        Category::VOCABULARY
            .into_iter()
            .chain(std::iter::once(Category::Unclassified))
            .find(|c| c.as_str() == label)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drop the model's " Review" suffix ("Useful Review" → "Useful").
///
/// Labels without the suffix are returned unchanged.
pub fn normalize_label(label: &str) -> &str {
    label.strip_suffix(MODEL_LABEL_SUFFIX).unwrap_or(label)
}

/// Which stage produced a review's labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    /// Deterministic local rules
    Local,
    /// Remote model
    Model,
    /// Remote classification failed; labels are `Unclassified`
    Failed,
}

/// Labels attached to a review after triage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Ordered, duplicate-free labels
    pub categories: Vec<Category>,
    /// Confidence per label, each in [0, 1]
    pub scores: BTreeMap<Category, f64>,
    pub source: Provenance,
    /// Human-readable explanation
    pub reason: String,
}

impl ClassificationResult {
    /// Result for a sub-batch whose remote classification failed
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            categories: vec![Category::Unclassified],
            scores: BTreeMap::new(),
            source: Provenance::Failed,
            reason: reason.into(),
        }
    }

    /// Highest label score, 0.0 when there are none
    pub fn confidence(&self) -> f64 {
        self.scores.values().copied().fold(0.0, f64::max)
    }
}

/// A review together with its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedReview {
    #[serde(flatten)]
    pub review: Review,
    pub classification: ClassificationResult,
}

impl ClassifiedReview {
    pub fn new(review: Review, classification: ClassificationResult) -> Self {
        Self {
            review,
            classification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_label_strips_suffix() {
        assert_eq!(normalize_label("Useful Review"), "Useful");
        assert_eq!(normalize_label("Spam Review"), "Spam");
    }

    #[test]
    fn test_normalize_label_idempotent() {
        for label in ["Useful", "Rant Without Visit", "Advertisements", "Review"] {
            assert_eq!(normalize_label(label), label);
            assert_eq!(normalize_label(normalize_label(label)), normalize_label(label));
        }
    }

    #[test]
    fn test_from_model_label() {
        assert_eq!(Category::from_model_label("Useful Review"), Some(Category::Useful));
        assert_eq!(
            Category::from_model_label("Rant Without Visit"),
            Some(Category::RantWithoutVisit)
        );
        assert_eq!(Category::from_model_label("Positive"), None);
    }

    #[test]
    fn test_category_serializes_as_label() {
        let json = serde_json::to_string(&Category::IrrelevantContent).unwrap();
        assert_eq!(json, "\"Irrelevant Content\"");
    }

    #[test]
    fn test_scores_serialize_with_label_keys() {
        let mut scores = BTreeMap::new();
        scores.insert(Category::RantWithoutVisit, 0.8);
        let result = ClassificationResult {
            categories: vec![Category::RantWithoutVisit],
            scores,
            source: Provenance::Local,
            reason: "x".to_string(),
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["scores"]["Rant Without Visit"], 0.8);
        assert_eq!(json["source"], "local");
    }

    #[test]
    fn test_failed_result_is_unclassified() {
        let result = ClassificationResult::failed("ML classification failed");
        assert_eq!(result.categories, vec![Category::Unclassified]);
        assert_eq!(result.source, Provenance::Failed);
        assert_eq!(result.confidence(), 0.0);
    }
}
