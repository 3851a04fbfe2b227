//! Review search endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Place, SearchScope};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_query: Option<String>,
    #[serde(default)]
    pub scope: SearchScope,
    /// Location for global searches; defaults to the configured location
    pub location: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub run_id: Uuid,
    pub places: Vec<Place>,
    pub message: String,
}

/// POST /api/scrape-reviews
///
/// Runs the crawl and classifies every place's reviews. May take minutes;
/// progress is published on `/events` under the returned `run_id`.
pub async fn scrape_reviews(
    State(state): State<AppState>,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let Json(request) = payload?;
    let query = request
        .search_query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::BadRequest("Search query is required".to_string()))?;

    let outcome = state
        .orchestrator
        .search_places(query, request.scope, request.location.as_deref())
        .await?;

    Ok(Json(SearchResponse {
        run_id: outcome.run_id,
        message: format!(
            "Found {} places with classified reviews",
            outcome.places.len()
        ),
        places: outcome.places,
    }))
}

pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/scrape-reviews", post(scrape_reviews))
}
