//! 运行记录仓储

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use super::traits::RunHistoryRepository;
use crate::error::Result;

/// 读取执行引擎写入的 runs 表
pub struct PgRunRepository {
    pool: PgPool,
}

impl PgRunRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 统计用户的成功运行次数
    #[instrument(skip(self))]
    pub async fn count_successful_runs(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)::BIGINT
            FROM runs
            WHERE user_id = $1 AND success
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl RunHistoryRepository for PgRunRepository {
    async fn count_successful_runs(&self, user_id: &str) -> Result<i64> {
        self.count_successful_runs(user_id).await
    }
}
