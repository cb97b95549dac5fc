//! 用户徽章发放仓储
//!
//! user_badges 表上的 (user_id, badge_id) 唯一约束是"每个徽章最多发放一次"的唯一保证，
//! 应用层不做先查后写。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use super::traits::AwardStore;
use crate::error::Result;
use crate::models::{AwardOutcome, AwardRecord};

/// PostgreSQL 发放存储
pub struct PgAwardStore {
    pool: PgPool,
}

impl PgAwardStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 原子条件写入
    ///
    /// 冲突时 DO NOTHING，受影响行数为 0 即说明记录此前已存在
    #[instrument(skip(self))]
    pub async fn try_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_badges (user_id, badge_id, awarded_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id, badge_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(badge_id)
        .execute(&self.pool)
        .await?;

        let outcome = if result.rows_affected() > 0 {
            AwardOutcome::Granted
        } else {
            AwardOutcome::AlreadyAwarded
        };

        debug!(outcome = outcome.as_str(), "award insert finished");
        Ok(outcome)
    }

    /// 列出用户已获得的徽章
    pub async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>> {
        let records = sqlx::query_as::<_, AwardRecord>(
            r#"
            SELECT user_id, badge_id, awarded_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY awarded_at ASC, badge_id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl AwardStore for PgAwardStore {
    async fn try_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome> {
        self.try_award(user_id, badge_id).await
    }

    async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>> {
        self.list_awards(user_id).await
    }
}
