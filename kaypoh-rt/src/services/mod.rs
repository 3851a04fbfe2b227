//! Service modules for the review triage pipeline
//!
//! Core pipeline (leaf to root):
//! - `rule_engine`: deterministic local rules
//! - `batch_triage`: split reviews into locally decided and undecided
//! - `classifier_client`: remote model client, with `retry_policy` and the
//!   `event_stream` result decoder
//! - `result_merger`: restore input order after remote classification
//! - `scrape_orchestrator`: crawl run, per-place classification, events
//!
//! `crawl_client` talks to the crawl service.

pub mod batch_triage;
pub mod classifier_client;
pub mod crawl_client;
pub mod event_stream;
pub mod result_merger;
pub mod retry_policy;
pub mod rule_engine;
pub mod scrape_orchestrator;

pub use batch_triage::{triage, TriageOutcome};
pub use classifier_client::{ClassifierError, RemoteClassifierClient, ReviewClassifier};
pub use crawl_client::{CrawlClient, CrawlError, RunState, RunStatus};
pub use result_merger::merge;
pub use retry_policy::{FailureKind, RetryPolicy};
pub use rule_engine::RuleVerdict;
pub use scrape_orchestrator::{
    classify_reviews, classify_single_review, single_review, ScrapeOrchestrator, SearchOutcome,
};
