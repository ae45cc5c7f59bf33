use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use promosite_core::event::{event_type, TrackContext};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct TrackRequest {
    pub activity_id: i64,
    #[serde(rename = "type")]
    pub event_type: String,
    pub session_id: Option<String>,
    #[serde(default)]
    pub data: Value,
    pub utm_source: Option<String>,
    /// Seconds, for `stay_duration` events.
    pub duration: Option<f64>,
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Client address: first hop of X-Forwarded-For when present.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next().map(|ip| ip.trim().to_string()))
}

/// `POST /api/track` — record one visitor interaction.
///
/// Dispatches to the collector by event type. Always returns `202` with
/// `{"ok": true}` so the tracking script never surfaces errors to visitors;
/// only malformed requests get a 4xx.
#[tracing::instrument(skip(state, headers, req), fields(activity_id = req.activity_id, event_type = %req.event_type))]
pub async fn track(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<TrackRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = req
        .session_id
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("session_id is required".to_string()))?;

    let ctx = TrackContext {
        session_id,
        user_id: None,
        user_agent: header_str(&headers, "user-agent"),
        referer: header_str(&headers, "referer"),
        utm_source: req.utm_source,
        client_ip: client_ip(&headers),
    };

    let data = if req.data.is_object() {
        req.data
    } else {
        Value::Object(Default::default())
    };

    match req.event_type.as_str() {
        event_type::VIEW => {
            state
                .collector
                .record_page_view(req.activity_id, &ctx)
                .await?;
        }
        event_type::SHARE => {
            state
                .collector
                .record_share(req.activity_id, &ctx, data)
                .await?;
        }
        event_type::FORM_SUBMIT => {
            state
                .collector
                .record_form_submit(req.activity_id, &ctx, data)
                .await?;
        }
        event_type::CONVERSION => {
            state
                .collector
                .record_conversion(req.activity_id, &ctx, data)
                .await?;
        }
        event_type::STAY_DURATION => {
            let seconds = req.duration.ok_or_else(|| {
                AppError::BadRequest("duration is required for stay_duration".to_string())
            })?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(AppError::BadRequest(
                    "duration must be a non-negative number".to_string(),
                ));
            }
            state
                .collector
                .record_stay_duration(req.activity_id, &ctx, seconds)
                .await?;
        }
        // Open set: click, component_interact, anything the client sends.
        other => {
            state
                .collector
                .record_event(req.activity_id, &ctx, other, data)
                .await?;
        }
    }

    Ok((StatusCode::ACCEPTED, Json(json!({ "ok": true }))))
}
