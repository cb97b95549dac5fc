//! 集成测试公共辅助

#![allow(dead_code)]

use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use badge_trigger::{routes, state::AppState};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

pub const TOKEN: &str = "s3cret-token";

pub fn app(state: AppState) -> Router {
    routes::build_router(state, Duration::from_secs(5))
}

/// 构造触发请求，`token` 为 `None` 时不带 Authorization 头
pub fn trigger_request(body: impl Into<Body>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/badges/trigger")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(body.into()).unwrap()
}

pub fn json_trigger(body: &Value, token: Option<&str>) -> Request<Body> {
    trigger_request(body.to_string(), token)
}

/// 发送请求并返回状态码与 JSON 响应体
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}
