//! 徽章触发 API 处理器
//!
//! 接收活动追踪方上报的事件，同步完成规则评估、发放与通知，返回本次新发放的徽章。

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::{HeaderMap, header::AUTHORIZATION},
};
use tracing::{debug, info};

use crate::{
    error::{Result, TriggerError},
    models::{TriggerRequest, TriggerResponse, UserBadgesResponse},
    state::AppState,
};

/// 触发徽章评估
///
/// POST /api/badges/trigger
///
/// 先认证后解析：令牌缺失或错误时，即便请求体不是合法 JSON 也返回 401。
pub async fn trigger_badges(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: std::result::Result<Json<TriggerRequest>, JsonRejection>,
) -> Result<Json<TriggerResponse>> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state.intake.authorize(authorization)?;

    let Json(request) = payload.map_err(|rejection| {
        debug!(error = %rejection.body_text(), "请求体解析失败");
        TriggerError::Validation(format!("请求体格式错误: {}", rejection.body_text()))
    })?;

    let event = state.intake.submit(request, authorization)?;
    let user_id = event.user_id.clone();
    let response = state.service.trigger(event).await?;

    if !response.awarded.is_empty() {
        info!(user_id = %user_id, awarded = ?response.awarded, "本次请求发放徽章");
    }

    Ok(Json(response))
}

/// 查询用户已获得的徽章
///
/// GET /api/badges/users/{user_id}
///
/// 与触发接口使用同一认证策略。
pub async fn list_user_badges(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(user_id): Path<String>,
) -> Result<Json<UserBadgesResponse>> {
    let authorization = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    state.intake.authorize(authorization)?;

    if user_id.trim().is_empty() {
        return Err(TriggerError::Validation("user_id 不能为空".into()));
    }

    let records = state.service.list_awards(&user_id).await?;
    Ok(Json(UserBadgesResponse::from_records(&user_id, records)))
}
