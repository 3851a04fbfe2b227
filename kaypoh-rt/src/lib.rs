//! kaypoh-rt library interface
//!
//! Review triage microservice: searches a business through the crawl
//! service, classifies its reviews with local rules and a remote model, and
//! serves the results over HTTP.

pub mod api;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use kaypoh_common::config::TriageConfig;
use kaypoh_common::events::EventBus;

use crate::services::{CrawlClient, RemoteClassifierClient, ReviewClassifier, ScrapeOrchestrator};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ScrapeOrchestrator>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: ScrapeOrchestrator, event_bus: EventBus) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            event_bus,
            startup_time: Utc::now(),
        }
    }

    /// Wire the remote clients from configuration
    pub fn from_config(config: &TriageConfig, event_bus: EventBus) -> anyhow::Result<Self> {
        let crawl = CrawlClient::new(&config.crawl)?;
        let classifier: Arc<dyn ReviewClassifier> =
            Arc::new(RemoteClassifierClient::new(&config.classifier)?);
        let orchestrator = ScrapeOrchestrator::new(config, crawl, classifier, event_bus.clone());
        Ok(Self::new(orchestrator, event_bus))
    }
}

/// Build application router
///
/// When `static_dir` is given, files under it are served for any path the
/// API does not handle.
pub fn build_router(state: AppState, static_dir: Option<&Path>) -> Router {
    use axum::routing::get;

    let router = Router::new()
        .merge(api::search_routes())
        .merge(api::classify_routes())
        .merge(api::health_routes())
        .route("/events", get(api::event_stream))
        .with_state(state);

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
