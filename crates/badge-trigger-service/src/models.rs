//! 领域模型与请求响应 DTO

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use validator::{Validate, ValidationError};

/// 内置徽章标识
pub mod badges {
    /// 首次成功运行代码
    pub const FIRST_COMPILE: &str = "first_compile";
}

/// 活动事件类型
///
/// 未识别的类型不是错误，只是不会命中任何规则
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventType {
    RunSuccess,
    Unrecognized(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::RunSuccess => "run_success",
            Self::Unrecognized(raw) => raw,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl From<&str> for EventType {
    fn from(raw: &str) -> Self {
        match raw {
            "run_success" => Self::RunSuccess,
            other => Self::Unrecognized(other.to_string()),
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 已通过认证和校验的活动事件
///
/// 只在请求内存活，不会原样落库
#[derive(Debug, Clone)]
pub struct ActivityEvent {
    pub user_id: String,
    pub event_type: EventType,
    pub meta: Map<String, Value>,
}

impl ActivityEvent {
    pub fn new(user_id: impl Into<String>, event_type: EventType) -> Self {
        Self {
            user_id: user_id.into(),
            event_type,
            meta: Map::new(),
        }
    }
}

/// 单次发放尝试的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwardOutcome {
    /// 本次调用写入了发放记录
    Granted,
    /// 记录此前已存在，本次调用没有产生任何写入
    AlreadyAwarded,
}

impl AwardOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::AlreadyAwarded => "already_awarded",
        }
    }
}

/// 用户徽章发放记录（user_badges 表）
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct AwardRecord {
    pub user_id: String,
    pub badge_id: String,
    pub awarded_at: DateTime<Utc>,
}

// ==================== 请求 / 响应 ====================

fn validate_user_id(user_id: &str) -> Result<(), ValidationError> {
    if user_id.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some("user_id 不能为空".into());
        return Err(err);
    }
    Ok(())
}

/// 触发接口请求体
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TriggerRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_user_id"))]
    pub user_id: String,
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub meta: Map<String, Value>,
}

/// 触发接口响应体
///
/// `awarded` 只包含本次请求新发放的徽章，与通知是否送达无关
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    pub awarded: Vec<String>,
}

/// 用户徽章条目
#[derive(Debug, Clone, Serialize)]
pub struct UserBadgeItem {
    pub badge_id: String,
    pub awarded_at: DateTime<Utc>,
}

/// 用户徽章列表响应
#[derive(Debug, Clone, Serialize)]
pub struct UserBadgesResponse {
    pub user_id: String,
    pub badges: Vec<UserBadgeItem>,
}

impl UserBadgesResponse {
    pub fn from_records(user_id: &str, records: Vec<AwardRecord>) -> Self {
        Self {
            user_id: user_id.to_string(),
            badges: records
                .into_iter()
                .map(|r| UserBadgeItem {
                    badge_id: r.badge_id,
                    awarded_at: r.awarded_at,
                })
                .collect(),
        }
    }
}
