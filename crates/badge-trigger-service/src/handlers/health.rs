//! 探针处理器

use axum::{Json, extract::State, http::StatusCode};
use serde_json::{Value, json};

use crate::state::AppState;

const SERVICE_NAME: &str = "badge-trigger-service";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：检查数据库和 Redis 连接是否可用
///
/// 数据库不可用时返回 503，使负载均衡摘除该实例；Redis 不可用只标记为降级，
/// 因为通知失败不影响发放。
pub async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db_ok = match &state.db {
        Some(db) => db.health_check().await.is_ok(),
        None => true,
    };
    let redis_ok = match &state.pubsub {
        Some(pubsub) => pubsub.health_check().await.is_ok(),
        None => true,
    };

    let status = match (db_ok, redis_ok) {
        (true, true) => "ok",
        (true, false) => "degraded",
        (false, _) => "unavailable",
    };
    let code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "status": status,
            "service": SERVICE_NAME,
            "checks": {
                "database": if db_ok { "ok" } else { "fail" },
                "redis": if redis_ok { "ok" } else { "fail" }
            }
        })),
    )
}
