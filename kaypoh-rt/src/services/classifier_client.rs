//! Remote review classifier client
//!
//! Two-step job protocol against the hosted model:
//! 1. `POST <url>` with the batch payload, answered by `{"event_id": ...}`
//! 2. `GET <url>/<event_id>`, answered by a newline-delimited stream whose
//!    first `data:` record holds one result per submitted review
//!
//! Both steps together form one attempt; the attempt is retried according to
//! [`RetryPolicy`].

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use kaypoh_common::config::ClassifierSettings;

use crate::models::{Category, ClassificationResult, Provenance, Review};
use crate::services::event_stream;
use crate::services::retry_policy::{FailureKind, RetryFailure, RetryPolicy, Retryable};

const USER_AGENT: &str = concat!("kaypoh-rt/", env!("CARGO_PKG_VERSION"));

/// Rating sent for reviews without one
const DEFAULT_RATING: f64 = 5.0;

/// Reason for reviews the model did not classify
pub const CLASSIFICATION_FAILED_REASON: &str = "ML classification failed";

/// Reason for a model result with no usable prediction
pub const NO_PREDICTION_REASON: &str = "No classification found";

/// Classifier client errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Rate limited by classifier: {0}")]
    RateLimited(String),

    #[error("Classifier unavailable: {0}")]
    Unavailable(String),

    #[error("Classifier request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Classifier API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Unexpected classifier response: {0}")]
    Protocol(String),

    #[error("Classification failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

impl Retryable for ClassifierError {
    fn failure_kind(&self) -> FailureKind {
        match self {
            ClassifierError::RateLimited(_) => FailureKind::RateLimited,
            ClassifierError::Unavailable(_) => FailureKind::Unavailable,
            ClassifierError::Timeout(_)
            | ClassifierError::Network(_)
            | ClassifierError::Api { .. } => FailureKind::Transient,
            ClassifierError::Protocol(_) | ClassifierError::Exhausted { .. } => FailureKind::Fatal,
        }
    }
}

impl From<reqwest::Error> for ClassifierError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClassifierError::Timeout(e.to_string())
        } else {
            ClassifierError::Network(e.to_string())
        }
    }
}

impl From<RetryFailure<ClassifierError>> for ClassifierError {
    fn from(failure: RetryFailure<ClassifierError>) -> Self {
        match failure {
            RetryFailure::Fatal { error, .. } => error,
            RetryFailure::Exhausted {
                attempts,
                last_error,
            } => ClassifierError::Exhausted {
                attempts,
                last_error: last_error.to_string(),
            },
        }
    }
}

/// Classifies reviews the local rules left undecided
#[async_trait]
pub trait ReviewClassifier: Send + Sync {
    /// One result per input review, in input order
    async fn classify_undecided(
        &self,
        reviews: &[Review],
        threshold: f64,
    ) -> Result<Vec<ClassificationResult>, ClassifierError>;
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    event_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BatchPayload {
    batch_results: Vec<Option<BatchEntry>>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchEntry {
    #[serde(default)]
    predictions: Vec<ModelPrediction>,
    #[serde(default)]
    all_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Deserialize)]
struct ModelPrediction {
    label: String,
    score: Option<f64>,
}

impl BatchEntry {
    /// Convert to a result in the local label vocabulary
    fn into_result(self) -> ClassificationResult {
        // Keys are sorted, so an exact label's score is kept over its " Review" twin
        let mut scores = BTreeMap::new();
        for (label, score) in &self.all_scores {
            match Category::from_model_label(label) {
                Some(category) => {
                    scores.entry(category).or_insert(score.clamp(0.0, 1.0));
                }
                None => tracing::warn!(label = %label, "Ignoring score for unknown model label"),
            }
        }

        let mut categories = Vec::new();
        for prediction in &self.predictions {
            let Some(category) = Category::from_model_label(&prediction.label) else {
                tracing::warn!(label = %prediction.label, "Dropping unknown model label");
                continue;
            };
            if categories.contains(&category) {
                continue;
            }
            categories.push(category);
            if let Some(score) = prediction.score {
                scores.entry(category).or_insert(score.clamp(0.0, 1.0));
            }
        }

        if categories.is_empty() {
            return ClassificationResult {
                categories: vec![Category::Unclassified],
                scores,
                source: Provenance::Model,
                reason: NO_PREDICTION_REASON.to_string(),
            };
        }

        let breakdown: Vec<String> = categories
            .iter()
            .map(|c| {
                let score = scores.get(c).copied().unwrap_or(0.0);
                format!("{}: {:.1}%", c, score * 100.0)
            })
            .collect();

        ClassificationResult {
            reason: format!("Model prediction: {}", breakdown.join(", ")),
            categories,
            scores,
            source: Provenance::Model,
        }
    }
}

/// Build the submit body: texts, ratings and photo flags as JSON-encoded
/// strings, then the threshold
fn submit_body(reviews: &[Review], threshold: f64) -> Value {
    let texts: Vec<&str> = reviews.iter().map(|r| r.text.as_str()).collect();
    let ratings: Vec<f64> = reviews
        .iter()
        .map(|r| r.rating.unwrap_or(DEFAULT_RATING))
        .collect();
    let photos: Vec<u8> = reviews.iter().map(|r| u8::from(r.has_photo)).collect();

    json!({
        "data": [
            Value::from(texts).to_string(),
            Value::from(ratings).to_string(),
            Value::from(photos).to_string(),
            threshold,
        ]
    })
}

/// Map a non-success status to the matching error
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ClassifierError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(match status {
        StatusCode::TOO_MANY_REQUESTS => ClassifierError::RateLimited(body),
        StatusCode::SERVICE_UNAVAILABLE => ClassifierError::Unavailable(body),
        _ => ClassifierError::Api {
            status: status.as_u16(),
            body,
        },
    })
}

/// HTTP client for the hosted batch classifier
pub struct RemoteClassifierClient {
    http_client: reqwest::Client,
    url: String,
    submit_timeout: Duration,
    poll_timeout: Duration,
    policy: RetryPolicy,
}

impl RemoteClassifierClient {
    pub fn new(settings: &ClassifierSettings) -> Result<Self, ClassifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ClassifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: settings.url.trim_end_matches('/').to_string(),
            submit_timeout: settings.submit_timeout,
            poll_timeout: settings.poll_timeout,
            policy: RetryPolicy::default().with_max_attempts(settings.max_retries),
        })
    }

    /// Replace the retry policy (backoff curves and attempt cap)
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    async fn submit(&self, body: &Value) -> Result<String, ClassifierError> {
        let response = self
            .http_client
            .post(&self.url)
            .json(body)
            .timeout(self.submit_timeout)
            .send()
            .await?;
        let response = check_status(response).await?;

        let submitted: SubmitResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::Protocol(format!("invalid submit response: {}", e)))?;

        submitted
            .event_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ClassifierError::Protocol("no event_id in submit response".to_string()))
    }

    async fn fetch_result(&self, event_id: &str) -> Result<BatchPayload, ClassifierError> {
        let response = self
            .http_client
            .get(format!("{}/{}", self.url, event_id))
            .timeout(self.poll_timeout)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;

        let data = event_stream::first_data(&body)
            .ok_or_else(|| ClassifierError::Protocol("no data received from stream".to_string()))?;

        serde_json::from_value(data).map_err(|e| {
            ClassifierError::Protocol(format!("invalid batch result payload: {}", e))
        })
    }

    async fn attempt(
        &self,
        body: &Value,
        count: usize,
        attempt: u32,
    ) -> Result<Vec<ClassificationResult>, ClassifierError> {
        let event_id = self.submit(body).await?;
        tracing::debug!(event_id = %event_id, attempt, "Classifier job submitted");

        let payload = self.fetch_result(&event_id).await?;
        if payload.batch_results.len() < count {
            tracing::warn!(
                expected = count,
                received = payload.batch_results.len(),
                "Classifier returned fewer results than reviews"
            );
        }

        let mut entries = payload.batch_results.into_iter();
        let results = (0..count)
            .map(|_| match entries.next().flatten() {
                Some(entry) => entry.into_result(),
                None => ClassificationResult::failed(CLASSIFICATION_FAILED_REASON),
            })
            .collect();

        Ok(results)
    }
}

#[async_trait]
impl ReviewClassifier for RemoteClassifierClient {
    async fn classify_undecided(
        &self,
        reviews: &[Review],
        threshold: f64,
    ) -> Result<Vec<ClassificationResult>, ClassifierError> {
        if reviews.is_empty() {
            return Ok(Vec::new());
        }

        let body = submit_body(reviews, threshold);
        tracing::info!(
            reviews = reviews.len(),
            threshold,
            "Sending reviews to remote classifier"
        );

        let results = self
            .policy
            .run("classify_batch", |attempt| {
                self.attempt(&body, reviews.len(), attempt)
            })
            .await?;

        Ok(results)
    }
}
