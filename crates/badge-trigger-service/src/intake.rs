//! 事件入口
//!
//! 对外部投递的活动事件做认证与校验，任何失败都发生在写存储之前。
//!
//! 认证策略在启动时由配置构造并注入，请求处理过程中不会再读取环境变量。

use tracing::{debug, warn};
use validator::Validate;

use crate::error::{Result, TriggerError};
use crate::models::{ActivityEvent, EventType, TriggerRequest};

const BEARER_PREFIX: &str = "Bearer ";

/// 入口认证策略
#[derive(Clone, PartialEq, Eq)]
pub enum AuthPolicy {
    /// 不校验调用方，任何请求都接受
    Open,
    /// 要求 `Authorization: Bearer <token>` 与配置的令牌完全一致
    TokenRequired { token: String },
}

impl AuthPolicy {
    /// 根据配置构造策略，未配置或为空字符串时为 `Open`
    pub fn from_token(token: Option<String>) -> Self {
        match token {
            Some(token) if !token.is_empty() => Self::TokenRequired { token },
            _ => Self::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// 按策略校验 Authorization 头
    pub fn check(&self, authorization: Option<&str>) -> Result<()> {
        let expected = match self {
            Self::Open => return Ok(()),
            Self::TokenRequired { token } => token,
        };

        let provided = match authorization.and_then(|h| h.strip_prefix(BEARER_PREFIX)) {
            Some(token) => token,
            None => return Err(TriggerError::Unauthorized("缺少认证 Token".to_string())),
        };

        if provided != expected {
            warn!("Bearer token mismatch");
            return Err(TriggerError::Unauthorized("认证 Token 无效".to_string()));
        }

        Ok(())
    }
}

// 令牌不进入日志
impl std::fmt::Debug for AuthPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open => f.write_str("Open"),
            Self::TokenRequired { .. } => f.write_str("TokenRequired { token: *** }"),
        }
    }
}

/// 事件入口组件
#[derive(Debug, Clone)]
pub struct EventIntake {
    policy: AuthPolicy,
}

impl EventIntake {
    pub fn new(policy: AuthPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AuthPolicy {
        &self.policy
    }

    /// 只做认证（读接口使用）
    pub fn authorize(&self, authorization: Option<&str>) -> Result<()> {
        self.policy.check(authorization)
    }

    /// 认证并校验事件，返回可交给规则引擎的事件
    ///
    /// 先认证后校验：令牌错误时无论请求体内容如何都返回未授权
    pub fn submit(
        &self,
        request: TriggerRequest,
        authorization: Option<&str>,
    ) -> Result<ActivityEvent> {
        self.authorize(authorization)?;
        request.validate()?;

        let event_type = EventType::from(request.event.as_str());
        if !event_type.is_recognized() {
            debug!(event = %event_type, "未识别的事件类型，不会触发任何徽章");
        }

        Ok(ActivityEvent {
            user_id: request.user_id,
            event_type,
            meta: request.meta,
        })
    }
}
