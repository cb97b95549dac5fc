//! 仓储 Trait 定义
//!
//! 服务层依赖抽象而非具体实现，便于替换为内存实现或 mock

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AwardOutcome, AwardRecord};

/// 幂等发放存储
///
/// `try_award` 必须是单次原子条件写入，返回值表示**本次调用**是否写入了记录。
/// 并发调用同一 (user_id, badge_id) 时最多只有一个调用得到 `Granted`。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AwardStore: Send + Sync {
    async fn try_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome>;
    async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>>;
}

/// 运行记录只读仓储（runs 表由执行引擎维护）
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RunHistoryRepository: Send + Sync {
    async fn count_successful_runs(&self, user_id: &str) -> Result<i64>;
}
