//! End-to-end tests driving the HTTP API against a scratch data dir

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::path::Path;
use tempfile::TempDir;
use tower::ServiceExt;

use cuemaster_analytics::analytics::AnalyticsApiServer;
use cuemaster_analytics::config::Config;
use cuemaster_analytics::storage::SheetStore;

fn test_config(data_dir: &Path) -> Config {
    Config {
        port: 0,
        data_dir: data_dir.to_path_buf(),
        lock_wait_secs: 5,
        recent_limit: 10,
    }
}

async fn initialized_router() -> (TempDir, Router) {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    SheetStore::open(&config.data_dir, config.lock_wait())
        .setup()
        .await
        .unwrap();
    let router = AnalyticsApiServer::new(config).build_router();
    (dir, router)
}

async fn send(router: &Router, request: Request<Body>) -> Value {
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn ping_reports_service_version() {
    let (_dir, router) = initialized_router().await;
    let body = send(&router, get("/ping")).await;

    assert_eq!(body["status"], "ok");
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("cuemaster-analytics"));
}

#[tokio::test]
async fn submit_then_summary_end_to_end() {
    let (_dir, router) = initialized_router().await;

    let body = send(
        &router,
        post_json("/submit", r#"{"totalSessions": 3, "totalTimeMs": 120000}"#),
    )
    .await;
    assert_eq!(body["result"], "success");
    assert_eq!(body["row"], 1);

    let body = send(&router, get("/summary")).await;
    assert_eq!(body["result"], "success");
    let summary = &body["summary"];
    assert_eq!(summary["count"], 1);
    assert_eq!(summary["totalSessions"], 3);
    // Two minutes is 0.0 hours at one decimal place.
    assert_eq!(summary["totalTimeHours"], 0.0);
}

#[tokio::test]
async fn submit_accepts_flat_query_params() {
    let (_dir, router) = initialized_router().await;

    let body = send(
        &router,
        get("/submit?userId=player-7&luckFlips=10&luckHeads=6&luckTails=4"),
    )
    .await;
    assert_eq!(body["result"], "success");

    let body = send(&router, get("/summary")).await;
    let summary = &body["summary"];
    assert_eq!(summary["totalFlips"], 10);
    assert_eq!(summary["totalHeads"], 6);
    assert_eq!(summary["totalTails"], 4);
}

#[tokio::test]
async fn submit_accepts_json_data_envelope() {
    let (_dir, router) = initialized_router().await;

    let body = send(
        &router,
        get("/submit?data=%7B%22userId%22%3A%22player-9%22%2C%22totalSessions%22%3A2%7D"),
    )
    .await;
    assert_eq!(body["result"], "success");

    let body = send(&router, get("/summary")).await;
    assert_eq!(body["summary"]["totalSessions"], 2);
}

#[tokio::test]
async fn malformed_body_is_an_error_payload_not_a_500() {
    let (_dir, router) = initialized_router().await;

    let body = send(&router, post_json("/submit", "{definitely not json")).await;
    assert_eq!(body["result"], "error");
    assert!(body["message"].as_str().unwrap().contains("Malformed"));

    // Nothing was appended.
    let body = send(&router, get("/summary")).await;
    assert_eq!(body["summary"]["count"], 0);
}

#[tokio::test]
async fn uninitialized_store_asks_for_setup() {
    let dir = TempDir::new().unwrap();
    let router = AnalyticsApiServer::new(test_config(dir.path())).build_router();

    let body = send(&router, post_json("/submit", "{}")).await;
    assert_eq!(body["result"], "error");
    assert!(body["message"].as_str().unwrap().contains("setup"));

    let body = send(&router, get("/summary")).await;
    assert_eq!(body["result"], "error");
}

#[tokio::test]
async fn weighted_averages_across_submissions() {
    let (_dir, router) = initialized_router().await;

    send(
        &router,
        post_json(
            "/submit",
            r#"{"tempoAvgShotTime": 10, "tempoTotalShots": 2, "velocityAvgSpeed": 18, "velocityBreaks": 3, "velocityMaxSpeed": 22.46}"#,
        ),
    )
    .await;
    send(
        &router,
        post_json(
            "/submit",
            r#"{"tempoAvgShotTime": 20, "tempoTotalShots": 1, "velocityAvgSpeed": 24, "velocityBreaks": 1, "velocityMaxSpeed": 21}"#,
        ),
    )
    .await;

    let summary = send(&router, get("/summary")).await["summary"].clone();
    assert_eq!(summary["avgShotTime"], 13.33);
    assert_eq!(summary["avgBreakSpeed"], 19.5);
    assert_eq!(summary["maxBreakSpeed"], 22.5);
    assert_eq!(summary["totalShots"], 3);
    assert_eq!(summary["totalBreaks"], 4);
}

#[tokio::test]
async fn summary_is_stable_between_submissions() {
    let (_dir, router) = initialized_router().await;
    send(&router, post_json("/submit", r#"{"totalSessions": 1}"#)).await;

    let first = send(&router, get("/summary")).await;
    let second = send(&router, get("/summary")).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn recency_view_returns_latest_ten_reversed() {
    let (_dir, router) = initialized_router().await;

    for i in 1..=12 {
        let payload = format!(
            r#"{{"userId": "integration-test-user", "totalSessions": {}}}"#,
            i
        );
        let body = send(&router, post_json("/submit", &payload)).await;
        assert_eq!(body["result"], "success");
        assert_eq!(body["row"], i);
    }

    let summary = send(&router, get("/summary")).await["summary"].clone();
    let recent = summary["recentSubmissions"].as_array().unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0]["sessions"], 12);
    assert_eq!(recent[9]["sessions"], 3);
    assert_eq!(recent[0]["identity"], "integrat…");
}

#[tokio::test]
async fn concurrent_submissions_each_append_one_row() {
    let (_dir, router) = initialized_router().await;

    let mut handles = Vec::new();
    for i in 0..8 {
        let router = router.clone();
        handles.push(tokio::spawn(async move {
            let payload = format!(r#"{{"userId": "player-{}", "totalSessions": 1}}"#, i);
            let body = send(&router, post_json("/submit", &payload)).await;
            assert_eq!(body["result"], "success");
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let summary = send(&router, get("/summary")).await["summary"].clone();
    assert_eq!(summary["count"], 8);
    assert_eq!(summary["uniqueUsers"], 8);
    assert_eq!(summary["totalSessions"], 8);
}

#[tokio::test]
async fn profile_fields_default_and_booleans_decode() {
    let (_dir, router) = initialized_router().await;

    send(
        &router,
        post_json(
            "/submit",
            r#"{"signedIn": "true", "proUser": "1", "timezone": "undefined"}"#,
        ),
    )
    .await;
    send(&router, post_json("/submit", "{}")).await;

    let summary = send(&router, get("/summary")).await["summary"].clone();
    assert_eq!(summary["signedInUsers"], 1);
    assert_eq!(summary["proUsers"], 1);
    // Both rows fell back to the anonymous identity.
    assert_eq!(summary["uniqueUsers"], 1);
}
