//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    middleware,
    routing::{get, post},
};
use badge_shared::observability::middleware as obs_middleware;
use tower_http::timeout::TimeoutLayer;

use crate::{handlers, state::AppState};

/// 徽章业务路由
pub fn badge_routes() -> Router<AppState> {
    Router::new()
        .route("/trigger", post(handlers::trigger::trigger_badges))
        .route(
            "/users/{user_id}",
            get(handlers::trigger::list_user_badges),
        )
}

/// 构建完整应用路由
///
/// 中间件从外到内依次为：请求 ID、追踪与指标、请求超时。
/// 追踪与超时挂在路由上，指标按路由模板（如 `/api/badges/users/{user_id}`）打标签。
/// 整体超时按存储不可用处理，返回 503。
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api/badges", badge_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .route_layer(TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            request_timeout,
        ))
        .route_layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
