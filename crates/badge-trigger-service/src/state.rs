//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use badge_shared::{database::Database, pubsub::PubSub};

use crate::intake::EventIntake;
use crate::service::TriggerService;

/// Axum 应用共享状态
///
/// 业务组件通过 Arc 在 handler 间共享；基础设施句柄仅供就绪探针使用，
/// 测试环境下为空。
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TriggerService>,
    pub intake: Arc<EventIntake>,
    /// PostgreSQL 连接池
    pub db: Option<Database>,
    /// Redis 发布连接
    pub pubsub: Option<Arc<PubSub>>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(service: Arc<TriggerService>, intake: Arc<EventIntake>) -> Self {
        Self {
            service,
            intake,
            db: None,
            pubsub: None,
        }
    }

    /// 挂载基础设施句柄
    pub fn with_infrastructure(mut self, db: Database, pubsub: Arc<PubSub>) -> Self {
        self.db = Some(db);
        self.pubsub = Some(pubsub);
        self
    }
}
