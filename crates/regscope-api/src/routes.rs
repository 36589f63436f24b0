//! Request handlers.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use regscope_query::{SearchReport, SearchRequest};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::diff::unified_diff;
use crate::error::ApiError;
use crate::state::AppState;

/// GET /search
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchReport>, ApiError> {
    let Query(request) = query.map_err(|e| ApiError::Validation(e.body_text()))?;
    let report = state.aggregator.search(&request).await?;
    Ok(Json(report))
}

#[derive(Debug, Default, Deserialize)]
pub struct DiffParams {
    pub title: Option<String>,
    pub part: Option<String>,
    pub version1: Option<String>,
    pub version2: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DiffResponse {
    pub diff: String,
}

const DIFF_PARAMS_MESSAGE: &str = "Missing required parameters: title, part, version1, version2";

/// GET /diff
///
/// Fetches the part as of both dates concurrently and returns their unified
/// line diff.
pub async fn diff(
    State(state): State<AppState>,
    Query(params): Query<DiffParams>,
) -> Result<Json<DiffResponse>, ApiError> {
    let (title, part, version1, version2) = match (
        non_empty(params.title),
        non_empty(params.part),
        non_empty(params.version1),
        non_empty(params.version2),
    ) {
        (Some(t), Some(p), Some(v1), Some(v2)) => (t, p, v1, v2),
        _ => return Err(ApiError::Validation(DIFF_PARAMS_MESSAGE.into())),
    };

    info!(%title, %part, %version1, %version2, "diffing versions");
    let (old, new) = tokio::try_join!(
        state.ecfr.fetch_version(&title, &part, &version1),
        state.ecfr.fetch_version(&title, &part, &version2),
    )?;

    Ok(Json(DiffResponse {
        diff: unified_diff(&old, &new, &version1, &version2),
    }))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub mode: &'static str,
}

/// GET /health/liveness
pub async fn liveness() -> &'static str {
    "ok"
}

/// GET /health/readiness
pub async fn readiness(State(state): State<AppState>) -> Json<Health> {
    Json(Health {
        status: "ready",
        mode: state.aggregator.mode().as_str(),
    })
}
