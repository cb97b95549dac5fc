//! 徽章通知发布器
//!
//! 通过 `BadgePublisher` trait 抽象发布行为。生产实现基于 Redis PUBLISH，
//! 没有确认、没有重试、不落盘：进程在发放提交后、发布完成前崩溃时通知会丢失。

use std::sync::Arc;

use async_trait::async_trait;
use badge_shared::pubsub::PubSub;
use tracing::{debug, instrument};

use crate::error::{Result, TriggerError};

/// 用户徽章通知频道
pub fn channel_for(user_id: &str) -> String {
    format!("user:{}:badges", user_id)
}

/// 通知发布器 trait
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BadgePublisher: Send + Sync {
    /// 向 `user:{user_id}:badges` 发布一条消息，载荷为徽章标识
    async fn publish(&self, user_id: &str, badge_id: &str) -> Result<()>;
}

/// Redis 发布器
pub struct RedisBadgePublisher {
    pubsub: Arc<PubSub>,
}

impl RedisBadgePublisher {
    pub fn new(pubsub: Arc<PubSub>) -> Self {
        Self { pubsub }
    }
}

#[async_trait]
impl BadgePublisher for RedisBadgePublisher {
    #[instrument(skip(self))]
    async fn publish(&self, user_id: &str, badge_id: &str) -> Result<()> {
        let channel = channel_for(user_id);
        let receivers = self
            .pubsub
            .publish(&channel, badge_id)
            .await
            .map_err(|e| TriggerError::Publish(e.to_string()))?;

        debug!(channel = %channel, receivers, "徽章通知已发布");
        Ok(())
    }
}
