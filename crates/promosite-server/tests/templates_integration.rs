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

fn request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("request");
    let status = response.status();
    (status, json_body(response).await)
}

/// Create an activity with two components and snapshot it, returning
/// (activity id, template json).
async fn snapshot_fixture(app: &Router) -> (i64, Value) {
    let (status, json) = send(
        app,
        request(
            "POST",
            "/api/activities",
            Some(json!({ "title": "Flash Sale", "description": "48h only" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = json["data"]["id"].as_i64().expect("id");

    let (status, _) = send(
        app,
        request(
            "PUT",
            &format!("/api/activities/{id}/components"),
            Some(json!([
                { "type": "banner", "config": {"image": "hero.png"} },
                { "type": "countdown", "config": {"ends": "soon"} },
            ])),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(
        app,
        request(
            "POST",
            &format!("/api/activities/{id}/snapshot"),
            Some(json!({ "name": "Sale Layout", "code": "sale-layout" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (id, json["data"].clone())
}

#[tokio::test]
async fn snapshot_captures_layout_as_custom_template() {
    let app = test_app();
    let (_, template) = snapshot_fixture(&app).await;

    assert_eq!(template["category"], "custom");
    assert_eq!(template["is_system"], false);
    assert_eq!(template["is_active"], true);
    let blueprint = template["layout_config"]["components"]
        .as_array()
        .expect("components");
    assert_eq!(blueprint.len(), 2);
    assert_eq!(blueprint[0]["type"], "banner");
    assert_eq!(blueprint[0]["props"]["image"], "hero.png");
    assert_eq!(template["default_data"]["description"], "48h only");

    let (status, json) = send(&app, request("GET", "/api/templates", None)).await;
    assert_eq!(status, StatusCode::OK);
    let listed = json["data"].as_array().expect("array");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["code"], "sale-layout");
}

#[tokio::test]
async fn snapshot_rejects_duplicate_codes() {
    let app = test_app();
    let (activity_id, _) = snapshot_fixture(&app).await;

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/api/activities/{activity_id}/snapshot"),
            Some(json!({ "name": "Again", "code": "sale-layout" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "invalid_state");
}

#[tokio::test]
async fn snapshot_requires_name_and_code() {
    let app = test_app();
    let (activity_id, _) = snapshot_fixture(&app).await;

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/activities/{activity_id}/snapshot"),
            Some(json!({ "name": "", "code": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/activities/{activity_id}/snapshot"),
            Some(json!({ "name": "x", "code": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn instantiate_builds_a_draft_from_the_template() {
    let app = test_app();
    let (_, template) = snapshot_fixture(&app).await;
    let template_id = template["id"].as_i64().expect("id");

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/api/templates/{template_id}/activities"),
            Some(json!({ "title": "Spring Edition" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let activity = &json["data"]["activity"];
    assert_eq!(activity["title"], "Spring Edition");
    assert_eq!(activity["status"], "draft");
    // Description falls back to the template's default_data.
    assert_eq!(activity["description"], "48h only");
    assert_eq!(activity["template_id"], template_id);

    let components = json["data"]["components"].as_array().expect("components");
    assert_eq!(components.len(), 2);
    assert_eq!(components[0]["component_type"], "banner");
    assert!(components.iter().all(|c| c["is_visible"] == true));

    // Usage is counted on the stored template.
    let (_, listed) = send(&app, request("GET", "/api/templates", None)).await;
    assert_eq!(listed["data"][0]["usage_count"], 1);
}

#[tokio::test]
async fn instantiate_defaults_the_title_to_name_and_date() {
    let app = test_app();
    let (_, template) = snapshot_fixture(&app).await;
    let template_id = template["id"].as_i64().expect("id");

    let (status, json) = send(
        &app,
        request(
            "POST",
            &format!("/api/templates/{template_id}/activities"),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let expected = format!("Sale Layout - {}", chrono::Utc::now().date_naive());
    assert_eq!(json["data"]["activity"]["title"], expected);
}

#[tokio::test]
async fn delete_template_removes_it_from_the_list() {
    let app = test_app();
    let (_, template) = snapshot_fixture(&app).await;
    let template_id = template["id"].as_i64().expect("id");

    let (status, json) = send(
        &app,
        request("DELETE", &format!("/api/templates/{template_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["deleted"], true);

    let (_, listed) = send(&app, request("GET", "/api/templates", None)).await;
    assert_eq!(listed["data"].as_array().expect("array").len(), 0);

    let (status, json) = send(
        &app,
        request("DELETE", &format!("/api/templates/{template_id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[tokio::test]
async fn unknown_template_is_404() {
    let app = test_app();
    let (status, json) = send(
        &app,
        request(
            "POST",
            "/api/templates/999/activities",
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}
