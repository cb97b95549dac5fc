//! 并发触发测试
//!
//! 同一用户的并发请求中只能有一个拿到 `Granted`，且只发布一次通知。

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use badge_shared::test_utils::TestDataGenerator;
use badge_trigger_testkit::TestHarness;
use futures::future::join_all;

use common::{app, json_trigger, send};

const CONCURRENCY: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_grant_exactly_once() {
    let harness = Arc::new(TestHarness::open());
    harness.runs.set_successful_runs("racer", 1);

    let tasks = (0..CONCURRENCY).map(|_| {
        let harness = harness.clone();
        tokio::spawn(async move {
            send(
                app(harness.state.clone()),
                json_trigger(&TestDataGenerator::run_success_body("racer"), None),
            )
            .await
        })
    });

    let results = join_all(tasks).await;

    let mut granted = 0;
    for result in results {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        granted += body["awarded"].as_array().map(|a| a.len()).unwrap_or(0);
    }

    assert_eq!(granted, 1);
    assert_eq!(harness.awards.len(), 1);
    assert_eq!(harness.publisher.messages_on("user:racer:badges").len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_triggers_for_distinct_users_are_independent() {
    let harness = Arc::new(TestHarness::open());

    let tasks = (0..CONCURRENCY).map(|i| {
        let harness = harness.clone();
        tokio::spawn(async move {
            let user_id = format!("user-{}", i);
            send(
                app(harness.state.clone()),
                json_trigger(&TestDataGenerator::run_success_body(&user_id), None),
            )
            .await
        })
    });

    for result in join_all(tasks).await {
        let (status, body) = result.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["awarded"].as_array().map(|a| a.len()), Some(1));
    }

    assert_eq!(harness.awards.len(), CONCURRENCY);
    assert_eq!(harness.publisher.messages().len(), CONCURRENCY);
}
