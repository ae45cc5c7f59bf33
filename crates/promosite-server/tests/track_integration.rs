use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use promosite_core::config::Config;
use promosite_duckdb::DuckDbBackend;
use promosite_server::app::build_app;
use promosite_server::state::AppState;

fn test_config() -> Config {
    Config {
        port: 0,
        data_dir: "/tmp/promosite-test".to_string(),
        duckdb_memory_limit: "1GB".to_string(),
        retention_days: 365,
        scheduler_tick_seconds: 60,
        cors_origins: vec![],
    }
}

fn test_app() -> Router {
    let db = DuckDbBackend::open_in_memory().expect("in-memory DuckDB");
    let state = Arc::new(AppState::new(db, test_config()));
    build_app(state)
}

async fn json_body(response: axum::http::Response<Body>) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("parse JSON")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("build request")
}

async fn create_activity(app: &Router, title: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(post_json("/api/activities", json!({ "title": title })))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::CREATED);
    json_body(response).await["data"]["id"].as_i64().expect("id")
}

async fn track(app: &Router, body: Value) -> StatusCode {
    let response = app
        .clone()
        .oneshot(post_json("/api/track", body))
        .await
        .expect("request");
    response.status()
}

#[tokio::test]
async fn views_accumulate_pv_and_dedup_uv_per_session() {
    let app = test_app();
    let id = create_activity(&app, "Launch").await;

    for session in ["s1", "s1", "s2"] {
        let status = track(
            &app,
            json!({ "activity_id": id, "type": "view", "session_id": session }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/activities/{id}/stats/summary"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["pv"], 3);
    assert_eq!(json["data"]["uv"], 2);
}

#[tokio::test]
async fn track_requires_session_id() {
    let app = test_app();
    let status = track(&app, json!({ "activity_id": 1, "type": "view" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn stay_duration_requires_duration() {
    let app = test_app();
    let missing = track(
        &app,
        json!({ "activity_id": 1, "type": "stay_duration", "session_id": "s1" }),
    )
    .await;
    assert_eq!(missing, StatusCode::BAD_REQUEST);

    let negative = track(
        &app,
        json!({ "activity_id": 1, "type": "stay_duration", "session_id": "s1", "duration": -5.0 }),
    )
    .await;
    assert_eq!(negative, StatusCode::BAD_REQUEST);

    let ok = track(
        &app,
        json!({ "activity_id": 1, "type": "stay_duration", "session_id": "s1", "duration": 30.0 }),
    )
    .await;
    assert_eq!(ok, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn counter_events_show_up_in_summary() {
    let app = test_app();
    let id = create_activity(&app, "Promo").await;

    for kind in ["share", "form_submit", "conversion"] {
        let status = track(
            &app,
            json!({ "activity_id": id, "type": kind, "session_id": "s1", "data": {"k": "v"} }),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/activities/{id}/stats/summary"))
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    let json = json_body(response).await;
    assert_eq!(json["data"]["share_count"], 1);
    assert_eq!(json["data"]["form_submit_count"], 1);
    assert_eq!(json["data"]["conversion_count"], 1);
}

#[tokio::test]
async fn classification_feeds_the_distribution_endpoints() {
    let app = test_app();
    let id = create_activity(&app, "Promo").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/track")
        .header("content-type", "application/json")
        .header("user-agent", "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)")
        .header("referer", "https://weixin.qq.com/some/page")
        .header("x-forwarded-for", "127.0.0.1")
        .body(Body::from(
            json!({ "activity_id": id, "type": "view", "session_id": "s1" }).to_string(),
        ))
        .expect("build request");
    let response = app.clone().oneshot(request).await.expect("request");
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let devices = json_body(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/activities/{id}/stats/devices"))
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("request"),
    )
    .await;
    assert_eq!(devices["data"]["mobile"], 1);

    let sources = json_body(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/activities/{id}/stats/sources"))
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("request"),
    )
    .await;
    assert_eq!(sources["data"]["wechat"], 1);

    let regions = json_body(
        app.clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/activities/{id}/stats/regions"))
                    .body(Body::empty())
                    .expect("build request"),
            )
            .await
            .expect("request"),
    )
    .await;
    assert_eq!(regions["data"]["local"], 1);
}

#[tokio::test]
async fn bounce_rate_recompute_counts_single_event_sessions() {
    let app = test_app();
    let id = create_activity(&app, "Promo").await;

    // s1 bounces (one event); s2 does not (two events).
    track(
        &app,
        json!({ "activity_id": id, "type": "click", "session_id": "s1" }),
    )
    .await;
    track(
        &app,
        json!({ "activity_id": id, "type": "click", "session_id": "s2" }),
    )
    .await;
    track(
        &app,
        json!({ "activity_id": id, "type": "share", "session_id": "s2" }),
    )
    .await;

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/api/activities/{id}/stats/bounce-rate"),
            json!({}),
        ))
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["bounce_rate"], 50.0);
}

#[tokio::test]
async fn stats_routes_404_for_unknown_activity() {
    let app = test_app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/activities/999/stats/summary")
                .body(Body::empty())
                .expect("build request"),
        )
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "not_found");
}
