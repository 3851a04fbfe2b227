//! Merge locally and remotely classified reviews back into input order
//!
//! Order is restored with the composite (text, author, rating) key. The key is
//! not unique: duplicate reviews share it. Each key keeps a queue of its
//! original positions and classified reviews claim positions first come,
//! first served. Because the local rules depend only on text, duplicates
//! always land in the same partition in input order, so the queue hands them
//! back their own positions.

use std::collections::{HashMap, VecDeque};

use crate::models::{ClassificationResult, ClassifiedReview, Review, ReviewKey};

/// Pair undecided reviews with their remote results by position
///
/// Reviews without a result are marked failed.
pub fn pair_results(
    undecided: Vec<Review>,
    results: Vec<ClassificationResult>,
    missing_reason: &str,
) -> Vec<ClassifiedReview> {
    let mut results = results.into_iter();
    undecided
        .into_iter()
        .map(|review| {
            let classification = results
                .next()
                .unwrap_or_else(|| ClassificationResult::failed(missing_reason));
            ClassifiedReview::new(review, classification)
        })
        .collect()
}

/// Concatenate both lists and restore `original_order`
///
/// Reviews whose key does not appear in `original_order` keep their relative
/// order after all known reviews.
pub fn merge(
    decided: Vec<ClassifiedReview>,
    classified_undecided: Vec<ClassifiedReview>,
    original_order: &[Review],
) -> Vec<ClassifiedReview> {
    let mut positions: HashMap<ReviewKey, VecDeque<usize>> = HashMap::new();
    for (index, review) in original_order.iter().enumerate() {
        positions.entry(review.key()).or_default().push_back(index);
    }

    let mut unknown = 0usize;
    let mut indexed: Vec<(usize, ClassifiedReview)> = decided
        .into_iter()
        .chain(classified_undecided)
        .map(|classified| {
            let index = positions
                .get_mut(&classified.review.key())
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    unknown += 1;
                    original_order.len() + unknown
                });
            (index, classified)
        })
        .collect();

    if unknown > 0 {
        tracing::warn!(unknown, "Merged reviews missing from original order");
    }

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, classified)| classified).collect()
}
