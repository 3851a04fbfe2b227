//! kaypoh-rt - Review Triage microservice
//!
//! Searches businesses through the crawl service, classifies their reviews
//! (local rules first, remote model for the rest), and serves the results
//! plus an SSE progress stream.

use anyhow::Result;
use tracing::info;

use kaypoh_common::config::TriageConfig;
use kaypoh_common::events::EventBus;
use kaypoh_common::logging::init_tracing;

use kaypoh_rt::AppState;

const EVENT_BUS_CAPACITY: usize = 100;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("info");

    info!("Starting kaypoh-rt (Review Triage) microservice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Missing crawl credential fails here, before the server binds
    let config = TriageConfig::load()?;

    let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
    let state = AppState::from_config(&config, event_bus)?;
    let app = kaypoh_rt::build_router(state, config.server.static_dir.as_deref());

    let addr = config.server.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
