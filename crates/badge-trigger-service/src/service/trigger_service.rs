//! 徽章触发服务
//!
//! 处理一次活动事件的完整流程：
//!
//! 1. 事件类型没有登记规则时直接返回空结果，不访问存储
//! 2. 读取用户历史（成功运行次数）
//! 3. 规则引擎计算候选徽章
//! 4. 逐个执行原子发放，`Granted` 计入响应
//! 5. 仅对 `Granted` 发布通知，发布失败只记录日志
//!
//! 发放与通知之间没有事务：发放提交后通知丢失是可接受的，
//! 而发放失败（存储不可用）会作为可重试错误返回，重试是安全的，因为发放本身是幂等的。

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use badge_shared::observability::metrics;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, TriggerError};
use crate::models::{ActivityEvent, AwardOutcome, AwardRecord, TriggerResponse};
use crate::notification::BadgePublisher;
use crate::repository::{AwardStore, RunHistoryRepository};
use crate::rules::{HistorySnapshot, RuleEngine};

/// 徽章触发服务
pub struct TriggerService {
    engine: RuleEngine,
    awards: Arc<dyn AwardStore>,
    runs: Arc<dyn RunHistoryRepository>,
    publisher: Arc<dyn BadgePublisher>,
    /// 单次存储 / 发布调用的超时
    operation_timeout: Duration,
}

impl TriggerService {
    pub fn new(
        engine: RuleEngine,
        awards: Arc<dyn AwardStore>,
        runs: Arc<dyn RunHistoryRepository>,
        publisher: Arc<dyn BadgePublisher>,
        operation_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            awards,
            runs,
            publisher,
            operation_timeout,
        }
    }

    /// 处理一次活动事件
    #[instrument(skip(self, event), fields(user_id = %event.user_id, event_type = %event.event_type))]
    pub async fn trigger(&self, event: ActivityEvent) -> Result<TriggerResponse> {
        let start = Instant::now();
        let result = self.process(&event).await;

        let status = match &result {
            Ok(_) => "ok",
            Err(e) if e.is_retryable() => "unavailable",
            Err(_) => "error",
        };
        metrics::record_trigger_event(
            metric_event_label(&event),
            status,
            start.elapsed().as_secs_f64(),
        );

        result
    }

    async fn process(&self, event: &ActivityEvent) -> Result<TriggerResponse> {
        if !self.engine.has_rules_for(&event.event_type) {
            debug!("事件类型没有登记规则，跳过");
            return Ok(TriggerResponse::default());
        }

        let successful_runs = self
            .with_timeout("count runs", self.runs.count_successful_runs(&event.user_id))
            .await?;
        let history = HistorySnapshot::new(successful_runs);

        let candidates = self.engine.evaluate(event, &history);
        debug!(successful_runs, candidates = ?candidates, "规则评估完成");

        let mut awarded = Vec::with_capacity(candidates.len());
        for badge_id in candidates {
            let outcome = match self
                .with_timeout("award", self.awards.try_award(&event.user_id, &badge_id))
                .await
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    metrics::record_badge_award(&badge_id, "failed");
                    return Err(e);
                }
            };
            metrics::record_badge_award(&badge_id, outcome.as_str());

            match outcome {
                AwardOutcome::Granted => {
                    info!(badge_id = %badge_id, "徽章发放成功");
                    self.notify(&event.user_id, &badge_id).await;
                    awarded.push(badge_id);
                }
                AwardOutcome::AlreadyAwarded => {
                    debug!(badge_id = %badge_id, "徽章此前已发放");
                }
            }
        }

        Ok(TriggerResponse { awarded })
    }

    /// 发布通知，失败只记录日志
    async fn notify(&self, user_id: &str, badge_id: &str) {
        match self.publish(user_id, badge_id).await {
            Ok(()) => metrics::record_notification("published"),
            Err(e) => {
                metrics::record_notification("failed");
                warn!(
                    user_id = %user_id,
                    badge_id = %badge_id,
                    error = %e,
                    "徽章通知发布失败，发放结果不受影响"
                );
            }
        }
    }

    /// 带超时的发布，超时归为发布失败
    async fn publish(&self, user_id: &str, badge_id: &str) -> Result<()> {
        self.with_timeout_as(
            "publish",
            self.publisher.publish(user_id, badge_id),
            TriggerError::Publish,
        )
        .await
    }

    /// 查询用户已获得的徽章
    #[instrument(skip(self))]
    pub async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>> {
        self.with_timeout("list awards", self.awards.list_awards(user_id))
            .await
    }

    /// 为存储调用加上超时，超时视为存储不可用
    async fn with_timeout<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        self.with_timeout_as(operation, fut, TriggerError::StorageUnavailable)
            .await
    }

    async fn with_timeout_as<T, F>(
        &self,
        operation: &str,
        fut: F,
        on_timeout: fn(String) -> TriggerError,
    ) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.operation_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(on_timeout(format!(
                "{} 超时 ({}ms)",
                operation,
                self.operation_timeout.as_millis()
            ))),
        }
    }
}

/// 未识别事件统一归为一个标签，避免任意字符串撑爆指标基数
fn metric_event_label(event: &ActivityEvent) -> &str {
    if event.event_type.is_recognized() {
        event.event_type.as_str()
    } else {
        "unrecognized"
    }
}
