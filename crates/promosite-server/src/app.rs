use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{routes, state::AppState};

/// Construct the Axum [`Router`] with all routes and middleware attached.
///
/// Middleware is applied in outer-to-inner order:
///
/// 1. `TraceLayer` — structured request/response logging via `tracing`.
/// 2. `CorsLayer` — permissive CORS for the tracking endpoint (activity
///    pages embed the tracker cross-origin; browsers need CORS headers).
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/track", post(routes::track::track))
        .route("/api/activities", post(routes::activities::create_activity))
        .route(
            "/api/activities/{id}",
            get(routes::activities::get_activity)
                .put(routes::activities::update_activity)
                .delete(routes::activities::delete_activity),
        )
        .route(
            "/api/activities/{id}/publish",
            post(routes::activities::publish_activity),
        )
        .route(
            "/api/activities/{id}/archive",
            post(routes::activities::archive_activity),
        )
        .route(
            "/api/activities/{id}/restore",
            post(routes::activities::restore_activity),
        )
        .route(
            "/api/activities/{id}/duplicate",
            post(routes::activities::duplicate_activity),
        )
        .route(
            "/api/activities/{id}/components",
            get(routes::components::list_components)
                .put(routes::components::replace_components),
        )
        .route(
            "/api/activities/{id}/components/reorder",
            post(routes::components::reorder_components),
        )
        .route(
            "/api/components/{id}/move-up",
            post(routes::components::move_component_up),
        )
        .route(
            "/api/components/{id}/move-down",
            post(routes::components::move_component_down),
        )
        .route(
            "/api/components/{id}/duplicate",
            post(routes::components::duplicate_component),
        )
        .route("/api/templates", get(routes::templates::list_templates))
        .route(
            "/api/templates/{id}",
            delete(routes::templates::delete_template),
        )
        .route(
            "/api/templates/{id}/activities",
            post(routes::templates::instantiate_template),
        )
        .route(
            "/api/activities/{id}/snapshot",
            post(routes::templates::snapshot_activity),
        )
        .route(
            "/api/activities/{id}/stats/summary",
            get(routes::stats::summary),
        )
        .route("/api/activities/{id}/stats/trend", get(routes::stats::trend))
        .route(
            "/api/activities/{id}/stats/devices",
            get(routes::stats::devices),
        )
        .route(
            "/api/activities/{id}/stats/sources",
            get(routes::stats::sources),
        )
        .route(
            "/api/activities/{id}/stats/regions",
            get(routes::stats::regions),
        )
        .route(
            "/api/activities/{id}/stats/bounce-rate",
            post(routes::stats::recompute_bounce_rate),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
