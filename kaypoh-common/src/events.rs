//! Progress events for review searches
//!
//! A search can run for minutes (crawl job plus remote classification), so
//! each stage is announced on a broadcast `EventBus`. Subscribers (the SSE
//! endpoint) see only events emitted after they subscribe. Events are keyed
//! by `run_id`; the bus holds no per-run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Search progress events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TriageEvent {
    /// Crawl job about to be submitted
    SearchStarted {
        run_id: Uuid,
        query: String,
        location: String,
        timestamp: DateTime<Utc>,
    },

    /// Crawl job reported a status on a poll
    CrawlStatusChanged {
        run_id: Uuid,
        status: String,
        elapsed_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// One place finished triage, remote classification and merge
    PlaceClassified {
        run_id: Uuid,
        place: String,
        total_reviews: usize,
        locally_classified: usize,
        model_classified: usize,
        failed: usize,
        timestamp: DateTime<Utc>,
    },

    /// Search finished with classified places
    SearchCompleted {
        run_id: Uuid,
        place_count: usize,
        duration_seconds: u64,
        timestamp: DateTime<Utc>,
    },

    /// Search failed as a whole
    SearchFailed {
        run_id: Uuid,
        message: String,
        timestamp: DateTime<Utc>,
    },
}

impl TriageEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &'static str {
        match self {
            TriageEvent::SearchStarted { .. } => "SearchStarted",
            TriageEvent::CrawlStatusChanged { .. } => "CrawlStatusChanged",
            TriageEvent::PlaceClassified { .. } => "PlaceClassified",
            TriageEvent::SearchCompleted { .. } => "SearchCompleted",
            TriageEvent::SearchFailed { .. } => "SearchFailed",
        }
    }

    pub fn run_id(&self) -> Uuid {
        match self {
            TriageEvent::SearchStarted { run_id, .. }
            | TriageEvent::CrawlStatusChanged { run_id, .. }
            | TriageEvent::PlaceClassified { run_id, .. }
            | TriageEvent::SearchCompleted { run_id, .. }
            | TriageEvent::SearchFailed { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for `TriageEvent`s
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TriageEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per lagging subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TriageEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: TriageEvent) {
        let _ = self.tx.send(event);
    }
}
