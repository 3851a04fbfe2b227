//! Crawl service client (actor runs and datasets)
//!
//! Three calls, all authorized with the bearer token:
//! - `POST {base}/v2/acts/{actor}/runs` starts a run with `CrawlParameters`
//! - `GET {base}/v2/acts/{actor}/runs/{run_id}` reports run status
//! - `GET {base}/v2/datasets/{dataset_id}/items` lists the scraped places

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

use kaypoh_common::config::CrawlSettings;

use crate::models::{CrawlParameters, RawPlace};

const USER_AGENT: &str = concat!("kaypoh-rt/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Crawl client errors
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Crawl API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),

    /// Run reached a terminal failure state
    #[error("{message}")]
    JobFailed { status: RunStatus, message: String },

    #[error("Timeout waiting for scraping to complete after {seconds} seconds")]
    WaitExceeded { seconds: u64 },
}

/// Vendor run status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Ready,
    Running,
    Succeeded,
    Failed,
    TimingOut,
    TimedOut,
    Aborting,
    Aborted,
    Other(String),
}

impl RunStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "READY" => RunStatus::Ready,
            "RUNNING" => RunStatus::Running,
            "SUCCEEDED" => RunStatus::Succeeded,
            "FAILED" => RunStatus::Failed,
            "TIMING-OUT" => RunStatus::TimingOut,
            "TIMED-OUT" => RunStatus::TimedOut,
            "ABORTING" => RunStatus::Aborting,
            "ABORTED" => RunStatus::Aborted,
            other => RunStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunStatus::Ready => "READY",
            RunStatus::Running => "RUNNING",
            RunStatus::Succeeded => "SUCCEEDED",
            RunStatus::Failed => "FAILED",
            RunStatus::TimingOut => "TIMING-OUT",
            RunStatus::TimedOut => "TIMED-OUT",
            RunStatus::Aborting => "ABORTING",
            RunStatus::Aborted => "ABORTED",
            RunStatus::Other(s) => s,
        }
    }

    /// Failure states that end the run
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Aborted | RunStatus::TimedOut
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a run from one status poll
#[derive(Debug, Clone)]
pub struct RunState {
    pub status: RunStatus,
    pub dataset_id: Option<String>,
    pub status_message: Option<String>,
}

impl RunState {
    /// Human-readable reason for a failed run
    pub fn failure_message(&self) -> String {
        match self.status {
            RunStatus::Failed => format!(
                "Scraping failed: {}",
                self.status_message.as_deref().unwrap_or("Unknown error")
            ),
            RunStatus::Aborted => "Scraping was aborted".to_string(),
            RunStatus::TimedOut => "Scraping timed out".to_string(),
            _ => format!("Scraping ended with status {}", self.status),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: Option<String>,
    status: Option<String>,
    default_dataset_id: Option<String>,
    status_message: Option<String>,
}

/// Crawl service API client
pub struct CrawlClient {
    http_client: reqwest::Client,
    base_url: String,
    actor_id: String,
    token: String,
}

impl CrawlClient {
    pub fn new(settings: &CrawlSettings) -> Result<Self, CrawlError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            actor_id: settings.actor_id.clone(),
            token: settings.token.clone(),
        })
    }

    /// Start an actor run; returns the run id
    pub async fn start_run(&self, params: &CrawlParameters) -> Result<String, CrawlError> {
        let url = format!("{}/v2/acts/{}/runs", self.base_url, self.actor_id);

        tracing::debug!(
            query = ?params.search_strings_array,
            location = %params.location_query,
            "Starting crawl run"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.token)
            .json(params)
            .send()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        let run: Envelope<RunData> = Self::parse(response).await?;
        run.data
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CrawlError::Parse("run id missing from start response".to_string()))
    }

    /// Current state of a run
    pub async fn run_state(&self, run_id: &str) -> Result<RunState, CrawlError> {
        let url = format!("{}/v2/acts/{}/runs/{}", self.base_url, self.actor_id, run_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        let run: Envelope<RunData> = Self::parse(response).await?;
        let status = run
            .data
            .status
            .ok_or_else(|| CrawlError::Parse("run status missing".to_string()))?;

        Ok(RunState {
            status: RunStatus::parse(&status),
            dataset_id: run.data.default_dataset_id,
            status_message: run.data.status_message,
        })
    }

    /// All place records in a dataset
    ///
    /// Records that do not decode as a place are skipped with a warning.
    pub async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<RawPlace>, CrawlError> {
        let url = format!("{}/v2/datasets/{}/items", self.base_url, dataset_id);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| CrawlError::Network(e.to_string()))?;

        let records: Vec<serde_json::Value> = Self::parse(response).await?;
        let total = records.len();
        let places: Vec<RawPlace> = records
            .into_iter()
            .enumerate()
            .filter_map(|(index, record)| match serde_json::from_value(record) {
                Ok(place) => Some(place),
                Err(e) => {
                    tracing::warn!(dataset_id, index, error = %e, "Skipping malformed place record");
                    None
                }
            })
            .collect();

        tracing::info!(
            dataset_id,
            places = places.len(),
            skipped = total - places.len(),
            "Fetched crawl dataset"
        );
        Ok(places)
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, CrawlError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrawlError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CrawlError::Parse(e.to_string()))
    }
}
