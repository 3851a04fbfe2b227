//! Single review classification endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Category, ClassificationResult, Provenance};
use crate::services::{classify_single_review, single_review};
use crate::{ApiError, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyRequest {
    pub review_text: Option<String>,
    pub rating: Option<f64>,
    #[serde(default)]
    pub has_photo: bool,
    pub threshold: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct Prediction {
    pub label: Category,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct ClassifyResponse {
    pub predictions: Vec<Prediction>,
    pub scores: BTreeMap<Category, f64>,
    pub source: Provenance,
    pub reason: String,
}

impl From<ClassificationResult> for ClassifyResponse {
    fn from(result: ClassificationResult) -> Self {
        let predictions = result
            .categories
            .iter()
            .map(|label| Prediction {
                label: *label,
                score: result.scores.get(label).copied().unwrap_or(0.0),
            })
            .collect();

        Self {
            predictions,
            scores: result.scores,
            source: result.source,
            reason: result.reason,
        }
    }
}

/// POST /api/classify-review
///
/// Input is validated before any network call. Local rules run first; the
/// remote model is called only when they leave the review undecided.
pub async fn classify_review(
    State(state): State<AppState>,
    payload: Result<Json<ClassifyRequest>, JsonRejection>,
) -> ApiResult<Json<ClassifyResponse>> {
    let Json(request) = payload?;
    let rating = request
        .rating
        .ok_or_else(|| ApiError::BadRequest("Rating is required".to_string()))?;
    let review = single_review(
        request.review_text.as_deref().unwrap_or_default(),
        rating,
        request.has_photo,
        request.threshold,
    )?;

    let threshold = request
        .threshold
        .unwrap_or_else(|| state.orchestrator.threshold());
    let result =
        classify_single_review(state.orchestrator.classifier(), &review, threshold).await?;

    tracing::info!(
        source = ?result.source,
        categories = ?result.categories,
        "Single review classified"
    );

    Ok(Json(result.into()))
}

pub fn classify_routes() -> Router<AppState> {
    Router::new().route("/api/classify-review", post(classify_review))
}
