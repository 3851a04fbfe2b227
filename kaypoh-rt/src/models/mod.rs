//! Data models for kaypoh-rt (Review Triage microservice)
//!
//! - Canonical `Review` produced once at ingestion from raw crawl records
//! - Classification labels, provenance and per-review results
//! - Places with classified reviews and their summaries
//! - Crawl job parameters

pub mod classification;
pub mod parameters;
pub mod place;
pub mod review;

pub use classification::{Category, ClassificationResult, ClassifiedReview, Provenance};
pub use parameters::{CrawlParameters, SearchScope};
pub use place::{ClassificationSummary, IngestedPlace, Place, RawPlace, TriageSummary};
pub use review::{RawReview, Review, ReviewKey};
