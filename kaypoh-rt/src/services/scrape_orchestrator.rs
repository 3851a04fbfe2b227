//! Search orchestration
//!
//! Drives a crawl run to completion, then runs every place's reviews through
//! triage, remote classification of the undecided remainder, and merge.
//!
//! Failure isolation:
//! - Crawl failures (start, poll, vendor failure state, wait budget) fail the
//!   whole search.
//! - A remote classifier failure only affects the place being classified:
//!   its undecided reviews become `Unclassified` with `source = failed`.

use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

use kaypoh_common::config::TriageConfig;
use kaypoh_common::events::{EventBus, TriageEvent};
use kaypoh_common::Error;

use crate::models::{
    ClassificationResult, ClassificationSummary, ClassifiedReview, CrawlParameters,
    IngestedPlace, Place, Provenance, Review, SearchScope,
};
use crate::services::batch_triage::triage;
use crate::services::classifier_client::{
    ClassifierError, ReviewClassifier, CLASSIFICATION_FAILED_REASON,
};
use crate::services::crawl_client::{CrawlClient, CrawlError, RunStatus};
use crate::services::result_merger::{merge, pair_results};
use crate::services::rule_engine;

const MIN_RATING: f64 = 1.0;
const MAX_RATING: f64 = 5.0;

/// Classified places from one search
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub run_id: Uuid,
    pub places: Vec<Place>,
}

/// Search pipeline over the crawl service and the remote classifier
pub struct ScrapeOrchestrator {
    crawl: CrawlClient,
    classifier: Arc<dyn ReviewClassifier>,
    event_bus: EventBus,
    default_location: String,
    local_location: String,
    max_wait: Duration,
    poll_interval: Duration,
    threshold: f64,
}

impl ScrapeOrchestrator {
    pub fn new(
        config: &TriageConfig,
        crawl: CrawlClient,
        classifier: Arc<dyn ReviewClassifier>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            crawl,
            classifier,
            event_bus,
            default_location: config.crawl.default_location.clone(),
            local_location: config.crawl.local_location.clone(),
            max_wait: config.crawl.max_wait,
            poll_interval: config.crawl.poll_interval,
            threshold: config.classifier.threshold,
        }
    }

    pub fn classifier(&self) -> &dyn ReviewClassifier {
        self.classifier.as_ref()
    }

    /// Default classification threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Search, crawl and classify
    ///
    /// `location` overrides the default location for global searches; local
    /// searches always use the local-scope location.
    pub async fn search_places(
        &self,
        query: &str,
        scope: SearchScope,
        location: Option<&str>,
    ) -> Result<SearchOutcome, CrawlError> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();

        let default_location = location
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.default_location.as_str());
        let params = CrawlParameters::scoped(query, scope, default_location, &self.local_location);

        tracing::info!(
            run_id = %run_id,
            query,
            scope = ?scope,
            location = %params.location_query,
            "Starting search"
        );
        self.event_bus.emit_lossy(TriageEvent::SearchStarted {
            run_id,
            query: query.to_string(),
            location: params.location_query.clone(),
            timestamp: Utc::now(),
        });

        match self.run_search(run_id, &params).await {
            Ok(places) => {
                let duration = started.elapsed();
                tracing::info!(
                    run_id = %run_id,
                    places = places.len(),
                    duration_ms = duration.as_millis() as u64,
                    "Search completed"
                );
                self.event_bus.emit_lossy(TriageEvent::SearchCompleted {
                    run_id,
                    place_count: places.len(),
                    duration_seconds: duration.as_secs(),
                    timestamp: Utc::now(),
                });
                Ok(SearchOutcome { run_id, places })
            }
            Err(e) => {
                tracing::error!(run_id = %run_id, error = %e, "Search failed");
                self.event_bus.emit_lossy(TriageEvent::SearchFailed {
                    run_id,
                    message: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(e)
            }
        }
    }

    async fn run_search(
        &self,
        run_id: Uuid,
        params: &CrawlParameters,
    ) -> Result<Vec<Place>, CrawlError> {
        let crawl_run = self.crawl.start_run(params).await?;
        tracing::info!(run_id = %run_id, crawl_run = %crawl_run, "Crawl run started");

        let dataset_id = self.wait_for_run(run_id, &crawl_run).await?;
        let raw_places = self.crawl.dataset_items(&dataset_id).await?;

        let mut places = Vec::with_capacity(raw_places.len());
        for raw in raw_places {
            let place = raw.normalize();
            places.push(self.classify_place(run_id, place).await);
        }
        Ok(places)
    }

    /// Poll until the run succeeds (returning its dataset id), fails, or the
    /// wait budget runs out
    async fn wait_for_run(&self, run_id: Uuid, crawl_run: &str) -> Result<String, CrawlError> {
        let started = Instant::now();
        let mut last_status: Option<RunStatus> = None;

        loop {
            let state = self.crawl.run_state(crawl_run).await?;

            if last_status.as_ref() != Some(&state.status) {
                tracing::info!(
                    run_id = %run_id,
                    status = %state.status,
                    elapsed_secs = started.elapsed().as_secs(),
                    "Crawl run status"
                );
                self.event_bus.emit_lossy(TriageEvent::CrawlStatusChanged {
                    run_id,
                    status: state.status.to_string(),
                    elapsed_seconds: started.elapsed().as_secs(),
                    timestamp: Utc::now(),
                });
                last_status = Some(state.status.clone());
            }

            if state.status == RunStatus::Succeeded {
                return state
                    .dataset_id
                    .ok_or_else(|| CrawlError::Parse("succeeded run has no dataset id".to_string()));
            }

            if state.status.is_failure() {
                return Err(CrawlError::JobFailed {
                    message: state.failure_message(),
                    status: state.status,
                });
            }

            tokio::time::sleep(self.poll_interval).await;

            if started.elapsed() >= self.max_wait {
                return Err(CrawlError::WaitExceeded {
                    seconds: self.max_wait.as_secs(),
                });
            }
        }
    }

    async fn classify_place(&self, run_id: Uuid, mut place: IngestedPlace) -> Place {
        if place.dropped_reviews > 0 {
            tracing::warn!(
                run_id = %run_id,
                place = %place.title,
                dropped = place.dropped_reviews,
                "Dropped reviews without text"
            );
        }

        let reviews = std::mem::take(&mut place.reviews);
        let (classified, summary) =
            classify_reviews(self.classifier.as_ref(), reviews, self.threshold).await;

        tracing::info!(
            run_id = %run_id,
            place = %place.title,
            total = summary.triage.total_reviews,
            local = summary.triage.locally_classified,
            model = summary.model_classified,
            failed = summary.failed,
            "Place classified"
        );
        self.event_bus.emit_lossy(TriageEvent::PlaceClassified {
            run_id,
            place: place.title.clone(),
            total_reviews: summary.triage.total_reviews,
            locally_classified: summary.triage.locally_classified,
            model_classified: summary.model_classified,
            failed: summary.failed,
            timestamp: Utc::now(),
        });

        place.into_place(classified, summary)
    }
}

/// Triage, classify the undecided remainder remotely, and merge
///
/// Never fails: a remote failure marks the whole undecided sub-batch as
/// failed and keeps the local results.
pub async fn classify_reviews(
    classifier: &dyn ReviewClassifier,
    reviews: Vec<Review>,
    threshold: f64,
) -> (Vec<ClassifiedReview>, ClassificationSummary) {
    let original_order = reviews.clone();
    let outcome = triage(reviews);

    let remote = if outcome.undecided.is_empty() {
        Vec::new()
    } else {
        match classifier
            .classify_undecided(&outcome.undecided, threshold)
            .await
        {
            Ok(results) => pair_results(outcome.undecided, results, CLASSIFICATION_FAILED_REASON),
            Err(e) => {
                tracing::error!(
                    reviews = outcome.undecided.len(),
                    error = %e,
                    "Remote classification failed, marking sub-batch unclassified"
                );
                outcome
                    .undecided
                    .into_iter()
                    .map(|review| {
                        ClassifiedReview::new(
                            review,
                            ClassificationResult::failed(CLASSIFICATION_FAILED_REASON),
                        )
                    })
                    .collect()
            }
        }
    };

    let model_classified = count_source(&remote, Provenance::Model);
    let failed = count_source(&remote, Provenance::Failed);
    let merged = merge(outcome.decided, remote, &original_order);

    let summary = ClassificationSummary {
        triage: outcome.summary,
        model_classified,
        failed,
    };
    (merged, summary)
}

fn count_source(reviews: &[ClassifiedReview], source: Provenance) -> usize {
    reviews
        .iter()
        .filter(|r| r.classification.source == source)
        .count()
}

/// Validate single-review input and build the review
pub fn single_review(
    text: &str,
    rating: f64,
    has_photo: bool,
    threshold: Option<f64>,
) -> Result<Review, Error> {
    let text = text.trim();
    if text.is_empty() {
        return Err(Error::InvalidInput("Review text is required".to_string()));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(Error::InvalidInput(format!(
            "Rating must be between {:.1} and {:.1}, got {}",
            MIN_RATING, MAX_RATING, rating
        )));
    }
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidInput(format!(
                "Threshold must be between 0 and 1, got {}",
                threshold
            )));
        }
    }
    Ok(Review::new(text, Some(rating), None, has_photo))
}

/// Classify one review: local rules first, remote model only when undecided
///
/// Unlike a search, a remote failure propagates to the caller.
pub async fn classify_single_review(
    classifier: &dyn ReviewClassifier,
    review: &Review,
    threshold: f64,
) -> Result<ClassificationResult, ClassifierError> {
    let verdict = rule_engine::classify(review);
    if verdict.is_classified {
        tracing::debug!(categories = ?verdict.categories, "Single review classified locally");
        return Ok(ClassificationResult {
            categories: verdict.categories,
            scores: verdict.scores,
            source: Provenance::Local,
            reason: verdict.reason,
        });
    }

    let results = classifier
        .classify_undecided(std::slice::from_ref(review), threshold)
        .await?;
    Ok(results
        .into_iter()
        .next()
        .unwrap_or_else(|| ClassificationResult::failed(CLASSIFICATION_FAILED_REASON)))
}
