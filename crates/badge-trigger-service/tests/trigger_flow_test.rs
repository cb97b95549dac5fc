//! 触发接口端到端测试
//!
//! 使用内存存储与记录型发布器驱动完整的 HTTP 流程。

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::{Request, StatusCode}};
use badge_shared::test_utils::TestDataGenerator;
use badge_trigger::{AuthPolicy, routes};
use badge_trigger_testkit::{SlowAwardStore, TestHarness, state_with_store, unavailable_state};
use serde_json::json;

use common::{TOKEN, app, json_trigger, send, trigger_request};

#[tokio::test]
async fn first_successful_run_awards_first_compile_and_notifies() {
    let harness = TestHarness::open();
    harness.runs.set_successful_runs("u1", 1);

    let (status, body) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "awarded": ["first_compile"] }));
    assert!(harness.awards.contains("u1", "first_compile"));
    assert_eq!(
        harness.publisher.messages_on("user:u1:badges"),
        vec!["first_compile".to_string()]
    );
}

#[tokio::test]
async fn repeated_trigger_is_idempotent_and_publishes_once() {
    let harness = TestHarness::open();
    harness.runs.set_successful_runs("u1", 1);

    for expected in [json!(["first_compile"]), json!([])] {
        let (status, body) = send(
            app(harness.state.clone()),
            json_trigger(&TestDataGenerator::run_success_body("u1"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awarded"], expected);
    }

    assert_eq!(harness.awards.len(), 1);
    assert_eq!(harness.publisher.messages().len(), 1);
}

#[tokio::test]
async fn run_count_above_threshold_awards_nothing() {
    let harness = TestHarness::open();
    harness.runs.set_successful_runs("veteran", 5);

    let (status, body) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("veteran"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "awarded": [] }));
    assert!(harness.awards.is_empty());
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn unrecognized_event_is_accepted_without_candidates() {
    let harness = TestHarness::open();

    let (status, body) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::trigger_body("u1", "page_view"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "awarded": [] }));
    assert!(harness.awards.is_empty());
}

#[tokio::test]
async fn missing_or_wrong_token_is_rejected_without_side_effects() {
    let harness = TestHarness::with_token(TOKEN);
    let body = TestDataGenerator::run_success_body("u1");

    for token in [None, Some("wrong-token"), Some("")] {
        let (status, resp) = send(app(harness.state.clone()), json_trigger(&body, token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "token: {:?}", token);
        assert_eq!(resp["code"], "UNAUTHORIZED");
    }

    // 方案名区分大小写
    let request = Request::builder()
        .method("POST")
        .uri("/api/badges/trigger")
        .header("content-type", "application/json")
        .header("authorization", format!("bearer {}", TOKEN))
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, _) = send(app(harness.state.clone()), request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert!(harness.awards.is_empty());
    assert!(harness.publisher.messages().is_empty());
}

#[tokio::test]
async fn correct_token_is_accepted() {
    let harness = TestHarness::with_token(TOKEN);

    let (status, body) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("u1"), Some(TOKEN)),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["awarded"], json!(["first_compile"]));
}

#[tokio::test]
async fn auth_is_checked_before_body_parsing() {
    let harness = TestHarness::with_token(TOKEN);

    let (status, _) = send(app(harness.state.clone()), trigger_request("not json", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_is_a_validation_error() {
    let harness = TestHarness::open();

    let (status, body) = send(app(harness.state.clone()), trigger_request("{oops", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn missing_user_id_is_a_validation_error() {
    let harness = TestHarness::open();

    for payload in [json!({ "event": "run_success" }), json!({ "user_id": "  ", "event": "run_success" })] {
        let (status, body) = send(app(harness.state.clone()), json_trigger(&payload, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
    }
    assert!(harness.awards.is_empty());
}

#[tokio::test]
async fn storage_outage_returns_503_and_publishes_nothing() {
    let state = unavailable_state(AuthPolicy::Open);

    let (status, body) = send(
        app(state),
        json_trigger(&TestDataGenerator::run_success_body("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "STORAGE_UNAVAILABLE");
    // 不向调用方暴露内部细节
    assert!(!body["message"].as_str().unwrap_or_default().contains("pool"));
}

#[tokio::test]
async fn history_outage_returns_503() {
    let harness = TestHarness::open();
    harness.runs.set_failing(true);

    let (status, _) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(harness.awards.is_empty());
}

#[tokio::test]
async fn publish_failure_still_reports_award() {
    let harness = TestHarness::open();
    harness.publisher.set_failing(true);

    let (status, body) = send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["awarded"], json!(["first_compile"]));
    assert!(harness.awards.contains("u1", "first_compile"));
}

#[tokio::test]
async fn user_badges_lists_awarded_badges() {
    let harness = TestHarness::with_token(TOKEN);
    send(
        app(harness.state.clone()),
        json_trigger(&TestDataGenerator::run_success_body("u1"), Some(TOKEN)),
    )
    .await;

    let request = Request::builder()
        .uri("/api/badges/users/u1")
        .header("authorization", format!("Bearer {}", TOKEN))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(harness.state.clone()), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["user_id"], "u1");
    assert_eq!(body["badges"][0]["badge_id"], "first_compile");

    let unauthorized = Request::builder()
        .uri("/api/badges/users/u1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(app(harness.state.clone()), unauthorized).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn probes_report_ok_without_infrastructure() {
    let harness = TestHarness::open();

    for uri in ["/health", "/ready"] {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        let (status, body) = send(app(harness.state.clone()), request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}

#[tokio::test]
async fn responses_carry_request_id() {
    use tower::ServiceExt;

    let harness = TestHarness::open();
    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-42")
        .body(Body::empty())
        .unwrap();

    let response = app(harness.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "req-42");
}

#[tokio::test]
async fn request_timeout_is_reported_as_unavailable() {
    // 单次操作超时大于整体请求超时时，由整体超时兜底
    let state = state_with_store(
        AuthPolicy::Open,
        Arc::new(SlowAwardStore::new(Duration::from_secs(2))),
        Duration::from_secs(10),
    );
    let router = routes::build_router(state, Duration::from_millis(50));

    let (status, _) = send(
        router,
        json_trigger(&TestDataGenerator::run_success_body("u1"), None),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}
