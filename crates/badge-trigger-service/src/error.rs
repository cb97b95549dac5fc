//! 徽章触发服务错误类型
//!
//! 错误分四类：认证失败、参数校验失败、存储不可用（可重试）、通知发布失败（不对外暴露）

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use badge_shared::error::{BadgeError as InfraError, is_connection_error};
use serde_json::json;

/// 徽章触发服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("未授权: {0}")]
    Unauthorized(String),

    #[error("参数验证失败: {0}")]
    Validation(String),

    /// 连接失败、连接池耗尽或超时，调用方可安全重试
    #[error("存储不可用: {0}")]
    StorageUnavailable(String),

    /// 只在服务内部记录日志，不会作为请求结果返回
    #[error("通知发布失败: {0}")]
    Publish(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

impl TriggerError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Publish(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
            Self::Publish(_) => "PUBLISH_FAILURE",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

impl IntoResponse for TriggerError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::StorageUnavailable(e) => {
                tracing::error!(error = %e, "存储不可用");
                "存储暂不可用，请稍后重试".to_string()
            }
            Self::Publish(e) | Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<sqlx::Error> for TriggerError {
    fn from(err: sqlx::Error) -> Self {
        if is_connection_error(&err) {
            Self::StorageUnavailable(err.to_string())
        } else {
            Self::Internal(format!("数据库错误: {}", err))
        }
    }
}

impl From<InfraError> for TriggerError {
    fn from(err: InfraError) -> Self {
        match err {
            InfraError::Database(e) => e.into(),
            InfraError::Timeout { operation } => {
                Self::StorageUnavailable(format!("{} 超时", operation))
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for TriggerError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, TriggerError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn all_error_variants() -> Vec<(TriggerError, StatusCode, &'static str)> {
        vec![
            (TriggerError::Unauthorized("no token".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (TriggerError::Validation("user_id".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (
                TriggerError::StorageUnavailable("pool timed out".into()),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORAGE_UNAVAILABLE",
            ),
            (TriggerError::Publish("redis down".into()), StatusCode::INTERNAL_SERVER_ERROR, "PUBLISH_FAILURE"),
            (TriggerError::Internal("oops".into()), StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        ]
    }

    #[test]
    fn test_all_variants_status_and_code() {
        for (error, expected_status, expected_code) in all_error_variants() {
            assert_eq!(error.status_code(), expected_status, "{:?}", error);
            assert_eq!(error.error_code(), expected_code, "{:?}", error);
        }
    }

    #[test]
    fn test_only_storage_unavailable_is_retryable() {
        for (error, _, _) in all_error_variants() {
            let expected = matches!(error, TriggerError::StorageUnavailable(_));
            assert_eq!(error.is_retryable(), expected, "{:?}", error);
        }
    }

    #[test]
    fn test_sqlx_connection_errors_become_storage_unavailable() {
        let err: TriggerError = sqlx::Error::PoolTimedOut.into();
        assert!(matches!(err, TriggerError::StorageUnavailable(_)));

        let err: TriggerError = sqlx::Error::PoolClosed.into();
        assert!(err.is_retryable());
    }

    #[test]
    fn test_sqlx_query_errors_become_internal() {
        let err: TriggerError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, TriggerError::Internal(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_infra_timeout_becomes_storage_unavailable() {
        let err: TriggerError = InfraError::Timeout {
            operation: "award".into(),
        }
        .into();
        assert!(matches!(err, TriggerError::StorageUnavailable(ref m) if m.contains("award")));
    }

    /// 存储错误的响应不能泄露连接串等内部细节
    #[tokio::test]
    async fn test_storage_error_hides_internal_details() {
        let response =
            TriggerError::StorageUnavailable("postgres://10.0.0.5:5432 refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["code"], "STORAGE_UNAVAILABLE");
        assert!(!body["message"].as_str().unwrap().contains("10.0.0.5"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_business_error_keeps_message() {
        let response = TriggerError::Unauthorized("token mismatch".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["message"].as_str().unwrap().contains("token mismatch"));
    }
}
