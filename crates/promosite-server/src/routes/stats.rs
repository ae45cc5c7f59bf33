use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use crate::routes::activities::load_activity;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Inclusive range bounds, `YYYY-MM-DD`. Both optional.
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub days: Option<u32>,
}

/// `GET /api/activities/{id}/stats/summary` — range totals plus derived
/// rates.
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<SummaryQuery>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let summary = state
        .collector
        .activity_summary(id, query.start, query.end)
        .await?;
    Ok(Json(json!({ "data": summary })))
}

/// `GET /api/activities/{id}/stats/trend?days=` — one point per stored
/// day in the window (default 7 days; days without traffic are absent).
pub async fn trend(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<TrendQuery>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let days = query.days.unwrap_or(7).clamp(1, 365);
    let points = state.collector.trend(id, days).await?;
    Ok(Json(json!({ "data": points })))
}

/// `GET /api/activities/{id}/stats/devices`.
pub async fn devices(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let distribution = state.collector.device_distribution(id).await?;
    Ok(Json(json!({ "data": distribution })))
}

/// `GET /api/activities/{id}/stats/sources`.
pub async fn sources(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let distribution = state.collector.source_distribution(id).await?;
    Ok(Json(json!({ "data": distribution })))
}

/// `GET /api/activities/{id}/stats/regions`.
pub async fn regions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let distribution = state.collector.region_distribution(id).await?;
    Ok(Json(json!({ "data": distribution })))
}

/// `POST /api/activities/{id}/stats/bounce-rate` — explicit recompute of
/// today's bounce rate from the raw event log. `bounce_rate` is null when
/// today has no sessions.
pub async fn recompute_bounce_rate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let rate = state.collector.calculate_bounce_rate(id).await?;
    Ok(Json(json!({ "data": { "bounce_rate": rate } })))
}
