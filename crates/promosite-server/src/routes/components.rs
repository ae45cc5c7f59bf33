use std::sync::Arc;

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use promosite_core::component::{Component, ComponentDescriptor};
use promosite_core::store::ContentStore;

use crate::routes::activities::load_activity;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub ids: Vec<i64>,
}

async fn load_component(state: &AppState, id: i64) -> Result<Component, AppError> {
    state
        .db
        .get_component(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("component {id}")))
}

/// `GET /api/activities/{id}/components` — the list in render order.
pub async fn list_components(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let components = state.db.components_for_activity(id).await?;
    Ok(Json(json!({ "data": components })))
}

/// `PUT /api/activities/{id}/components` — destructive replace-all.
///
/// The body is the complete desired component list; everything currently
/// stored for the activity is deleted first.
pub async fn replace_components(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(descriptors): Json<Vec<ComponentDescriptor>>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    let components = state.lifecycle.replace_components(id, &descriptors).await?;
    Ok(Json(json!({ "data": components })))
}

/// `POST /api/activities/{id}/components/reorder` — full permutation of
/// the activity's component ids.
pub async fn reorder_components(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<ReorderRequest>,
) -> Result<impl IntoResponse, AppError> {
    load_activity(&state, id).await?;
    state.lifecycle.reorder_components(id, &req.ids).await?;
    let components = state.db.components_for_activity(id).await?;
    Ok(Json(json!({ "data": components })))
}

/// `POST /api/components/{id}/move-up`. A component already at position 0
/// stays put; `moved` reports whether anything changed.
pub async fn move_component_up(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut component = load_component(&state, id).await?;
    let moved = state.lifecycle.move_component_up(&mut component).await?;
    Ok(Json(json!({ "data": component, "moved": moved })))
}

/// `POST /api/components/{id}/move-down`.
pub async fn move_component_down(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let mut component = load_component(&state, id).await?;
    state.lifecycle.move_component_down(&mut component).await?;
    Ok(Json(json!({ "data": component })))
}

/// `POST /api/components/{id}/duplicate` — copy placed right after the
/// original.
pub async fn duplicate_component(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let component = load_component(&state, id).await?;
    let copy = state.lifecycle.duplicate_component(&component).await?;
    Ok((axum::http::StatusCode::CREATED, Json(json!({ "data": copy }))))
}
