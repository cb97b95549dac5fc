//! 徽章触发服务
//!
//! 接收活动追踪方上报的用户事件，评估徽章规则，以幂等方式发放徽章并实时通知用户。
//!
//! ## 核心功能
//!
//! - **事件接入**：静态令牌认证与参数校验
//! - **规则引擎**：按事件类型分派的纯函数规则表
//! - **幂等发放**：依赖 `(user_id, badge_id)` 唯一约束的原子条件插入
//! - **实时通知**：向 `user:{user_id}:badges` 频道尽力而为地发布
//!
//! ## 模块结构
//!
//! - `intake`: 认证策略与事件校验
//! - `rules`: 规则 trait 与规则引擎
//! - `repository`: 发放记录与运行历史的持久化
//! - `notification`: 通知发布
//! - `service`: 触发流程编排
//! - `handlers` / `routes` / `state`: HTTP 接口层

pub mod error;
pub mod handlers;
pub mod intake;
pub mod models;
pub mod notification;
pub mod repository;
pub mod routes;
pub mod rules;
pub mod service;
pub mod state;

pub use error::{Result, TriggerError};
pub use intake::{AuthPolicy, EventIntake};
pub use models::{ActivityEvent, AwardOutcome, AwardRecord, EventType, TriggerRequest, TriggerResponse};
pub use rules::{BadgeRule, RuleEngine};
pub use service::TriggerService;

/// 数据库迁移
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
