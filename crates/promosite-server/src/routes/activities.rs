use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use promosite_core::activity::{Activity, CreateActivityParams, UpdateActivityParams};
use promosite_core::store::ContentStore;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct CreateActivityRequest {
    pub title: String,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub layout_config: Option<Value>,
    pub seo_config: Option<Value>,
    pub share_config: Option<Value>,
    pub access_config: Option<Value>,
    pub template_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateActivityRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub layout_config: Option<Value>,
    pub seo_config: Option<Value>,
    pub share_config: Option<Value>,
    pub access_config: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteActivityQuery {
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub scheduled_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct DuplicateRequest {
    pub title: Option<String>,
}

pub(crate) async fn load_activity(state: &AppState, id: i64) -> Result<Activity, AppError> {
    state
        .db
        .get_activity(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("activity {id}")))
}

/// `POST /api/activities` — create a draft activity.
pub async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateActivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.title.is_empty() {
        return Err(AppError::BadRequest("title is required".to_string()));
    }

    let activity = state
        .lifecycle
        .create_activity(CreateActivityParams {
            title: req.title,
            slug: req.slug,
            description: req.description,
            cover_image: req.cover_image,
            start_time: req.start_time,
            end_time: req.end_time,
            layout_config: req.layout_config,
            seo_config: req.seo_config,
            share_config: req.share_config,
            access_config: req.access_config,
            template_id: req.template_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(json!({ "data": activity }))))
}

/// `GET /api/activities/{id}`.
pub async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let activity = load_activity(&state, id).await?;
    Ok(Json(json!({ "data": activity })))
}

/// `PUT /api/activities/{id}` — partial update.
pub async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateActivityRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut activity = load_activity(&state, id).await?;
    state
        .lifecycle
        .update_activity(
            &mut activity,
            UpdateActivityParams {
                title: req.title,
                slug: req.slug,
                description: req.description,
                cover_image: req.cover_image,
                start_time: req.start_time,
                end_time: req.end_time,
                layout_config: req.layout_config,
                seo_config: req.seo_config,
                share_config: req.share_config,
                access_config: req.access_config,
            },
        )
        .await?;
    Ok(Json(json!({ "data": activity })))
}

/// `DELETE /api/activities/{id}?hard=` — soft delete by default.
pub async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(query): Query<DeleteActivityQuery>,
) -> Result<impl IntoResponse, AppError> {
    let mut activity = load_activity(&state, id).await?;
    state.lifecycle.delete(&mut activity, query.hard).await?;
    Ok(Json(json!({ "data": { "deleted": true, "hard": query.hard } })))
}

/// `POST /api/activities/{id}/publish` — publish now or schedule.
pub async fn publish_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<PublishRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut activity = load_activity(&state, id).await?;
    state
        .lifecycle
        .publish(&mut activity, req.scheduled_time)
        .await?;
    Ok(Json(json!({ "data": activity })))
}

/// `POST /api/activities/{id}/archive`.
pub async fn archive_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut activity = load_activity(&state, id).await?;
    state.lifecycle.archive(&mut activity).await?;
    Ok(Json(json!({ "data": activity })))
}

/// `POST /api/activities/{id}/restore` — deleted back to draft.
pub async fn restore_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut activity = load_activity(&state, id).await?;
    state.lifecycle.restore(&mut activity).await?;
    Ok(Json(json!({ "data": activity })))
}

/// `POST /api/activities/{id}/duplicate` — deep copy as a fresh draft.
pub async fn duplicate_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<DuplicateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let source = load_activity(&state, id).await?;
    let copy = state.lifecycle.duplicate(&source, req.title).await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": copy }))))
}
