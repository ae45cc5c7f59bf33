use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use promosite_core::store::ContentStore;
use promosite_core::template::Template;
use promosite_core::templating::InstantiateOverrides;

use crate::routes::activities::load_activity;
use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct ListTemplatesQuery {
    /// Include inactive templates too.
    #[serde(default)]
    pub all: bool,
}

#[derive(Debug, Deserialize)]
pub struct InstantiateRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub cover_image: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SnapshotRequest {
    pub name: String,
    pub code: String,
    pub description: Option<String>,
}

async fn load_template(state: &AppState, id: i64) -> Result<Template, AppError> {
    state
        .db
        .get_template(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("template {id}")))
}

/// `GET /api/templates` — active templates, or all with `?all=true`.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTemplatesQuery>,
) -> Result<impl IntoResponse, AppError> {
    let templates = state.db.list_templates(!query.all).await?;
    Ok(Json(json!({ "data": templates })))
}

/// `POST /api/templates/{id}/activities` — instantiate a new draft
/// activity from the template.
pub async fn instantiate_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<InstantiateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = load_template(&state, id).await?;
    let (activity, components) = state
        .templates
        .instantiate(
            &template,
            InstantiateOverrides {
                title: req.title,
                slug: req.slug,
                description: req.description,
                cover_image: req.cover_image,
            },
        )
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "data": { "activity": activity, "components": components } })),
    ))
}

/// `POST /api/activities/{id}/snapshot` — capture the activity's layout
/// as a reusable custom template.
pub async fn snapshot_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<SnapshotRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.name.is_empty() {
        return Err(AppError::BadRequest("name is required".to_string()));
    }
    if req.code.is_empty() {
        return Err(AppError::BadRequest("code is required".to_string()));
    }

    let activity = load_activity(&state, id).await?;
    let template = state
        .templates
        .snapshot(&activity, &req.name, &req.code, req.description)
        .await?;
    Ok((StatusCode::CREATED, Json(json!({ "data": template }))))
}

/// `DELETE /api/templates/{id}` — refused for system templates.
pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let template = load_template(&state, id).await?;
    let deleted = state.templates.delete(&template).await?;
    Ok(Json(json!({ "data": { "deleted": deleted } })))
}
