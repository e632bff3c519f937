use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::{NewInteraction, Recommendation, Strategy};
use crate::services::recommender::DatasetStats;

use super::AppState;

/// Upper bound on requested recommendations per call
const MAX_TOP_N: usize = 50;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub user_id: i64,
    pub top_n: Option<usize>,
    #[serde(default)]
    pub method: Strategy,
}

#[derive(Debug, Serialize)]
pub struct RecommendationResponse {
    pub user_id: i64,
    pub recommendations: Vec<Recommendation>,
    pub method: Strategy,
}

// Handlers

/// Service banner
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "Content recommendation API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Computes recommendations for a user with the requested strategy.
///
/// An empty result (unknown user on the similarity path, or nothing left to
/// recommend) maps to 404, matching the upstream backend's expectations.
pub async fn recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    let top_n = request.top_n.unwrap_or(state.config.default_top_n);
    if top_n == 0 || top_n > MAX_TOP_N {
        return Err(AppError::InvalidInput(format!(
            "top_n must be between 1 and {}",
            MAX_TOP_N
        )));
    }

    let recommendations = state
        .model
        .recommend(request.user_id, top_n, request.method)
        .await;

    if recommendations.is_empty() {
        return Err(AppError::NotFound(format!(
            "user {} not found or has no available recommendations",
            request.user_id
        )));
    }

    tracing::info!(
        user_id = request.user_id,
        top_n,
        method = ?request.method,
        returned = recommendations.len(),
        "Recommendations computed"
    );

    Ok(Json(RecommendationResponse {
        user_id: request.user_id,
        recommendations,
        method: request.method,
    }))
}

/// Dataset statistics for the currently published model generation
pub async fn stats(State(state): State<AppState>) -> Json<DatasetStats> {
    Json(state.model.stats().await)
}

/// Records a new interaction and schedules a model reload.
///
/// The reload runs out-of-band; the response never waits for the rebuild,
/// and requests served meanwhile keep seeing the previous generation.
pub async fn record_interaction(
    State(state): State<AppState>,
    Json(request): Json<NewInteraction>,
) -> AppResult<StatusCode> {
    if let Some(rating) = request.rating {
        if !(1.0..=5.0).contains(&rating) {
            return Err(AppError::InvalidInput(
                "rating must be between 1 and 5".to_string(),
            ));
        }
    }

    state.model.record_interaction(request).await?;
    spawn_reload(&state);

    Ok(StatusCode::CREATED)
}

/// Triggers an out-of-band model reload
pub async fn reload(State(state): State<AppState>) -> StatusCode {
    spawn_reload(&state);
    StatusCode::ACCEPTED
}

fn spawn_reload(state: &AppState) {
    let model = state.model.clone();
    tokio::spawn(async move {
        if let Err(error) = model.reload().await {
            tracing::error!(%error, "Model reload failed; previous generation stays active");
        }
    });
}
