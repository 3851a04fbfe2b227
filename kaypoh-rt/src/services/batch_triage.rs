//! Batch triage: split reviews into locally decided and undecided

use crate::models::{ClassificationResult, ClassifiedReview, Provenance, Review, TriageSummary};
use crate::services::rule_engine;

/// Partition of one batch of reviews
///
/// Every input review lands in exactly one of `decided` or `undecided`, and
/// both lists keep input order.
#[derive(Debug, Clone, Default)]
pub struct TriageOutcome {
    pub decided: Vec<ClassifiedReview>,
    pub undecided: Vec<Review>,
    pub summary: TriageSummary,
}

/// Run the local rules over every review
pub fn triage(reviews: Vec<Review>) -> TriageOutcome {
    let mut outcome = TriageOutcome {
        summary: TriageSummary {
            total_reviews: reviews.len(),
            ..Default::default()
        },
        ..Default::default()
    };

    for review in reviews {
        let verdict = rule_engine::classify(&review);
        if !verdict.is_classified {
            outcome.undecided.push(review);
            continue;
        }

        for category in &verdict.categories {
            *outcome.summary.by_category.entry(*category).or_insert(0) += 1;
        }

        let classification = ClassificationResult {
            categories: verdict.categories,
            scores: verdict.scores,
            source: Provenance::Local,
            reason: verdict.reason,
        };
        outcome
            .decided
            .push(ClassifiedReview::new(review, classification));
    }

    outcome.summary.locally_classified = outcome.decided.len();
    outcome.summary.needs_model = outcome.undecided.len();

    tracing::debug!(
        total = outcome.summary.total_reviews,
        local = outcome.summary.locally_classified,
        needs_model = outcome.summary.needs_model,
        "Triage complete"
    );

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    fn review(text: &str) -> Review {
        Review::new(text, Some(4.0), None, false)
    }

    #[test]
    fn test_partition_preserves_order() {
        let outcome = triage(vec![
            review("ok"),
            review("Interesting place, went there on Tuesday"),
            review("Visit our website for deals! www.fake.com"),
            review("Nice ambience on the terrace"),
        ]);

        let decided: Vec<&str> = outcome.decided.iter().map(|r| r.review.text.as_str()).collect();
        let undecided: Vec<&str> = outcome.undecided.iter().map(|r| r.text.as_str()).collect();

        assert_eq!(decided, vec!["ok", "Visit our website for deals! www.fake.com"]);
        assert_eq!(
            undecided,
            vec!["Interesting place, went there on Tuesday", "Nice ambience on the terrace"]
        );
    }

    #[test]
    fn test_summary_counts() {
        let outcome = triage(vec![
            review("ok"),
            review("no"),
            review("never been, check www.deals.com"),
            review("Interesting place, went there on Tuesday"),
        ]);

        let summary = &outcome.summary;
        assert_eq!(summary.total_reviews, 4);
        assert_eq!(summary.locally_classified, 3);
        assert_eq!(summary.needs_model, 1);
        assert_eq!(
            summary.locally_classified + summary.needs_model,
            summary.total_reviews
        );
        assert_eq!(summary.by_category.get(&Category::IrrelevantContent), Some(&2));
        assert_eq!(summary.by_category.get(&Category::Advertisements), Some(&1));
        assert_eq!(summary.by_category.get(&Category::RantWithoutVisit), Some(&1));
        assert_eq!(summary.by_category.get(&Category::Useful), None);
    }

    #[test]
    fn test_decided_reviews_are_local() {
        let outcome = triage(vec![review("testing")]);
        let classified = &outcome.decided[0];
        assert_eq!(classified.classification.source, Provenance::Local);
        assert_eq!(
            classified.classification.categories,
            vec![Category::IrrelevantContent]
        );
        assert_eq!(
            classified.classification.scores.get(&Category::IrrelevantContent),
            Some(&0.85)
        );
    }

    #[test]
    fn test_empty_batch() {
        let outcome = triage(Vec::new());
        assert!(outcome.decided.is_empty());
        assert!(outcome.undecided.is_empty());
        assert_eq!(outcome.summary, TriageSummary::default());
    }
}
