//! 徽章触发服务测试工具
//!
//! 提供内存版的存储与发布器，供集成测试在没有 PostgreSQL / Redis 的情况下
//! 驱动完整的触发流程。只作为 dev-dependency 使用，不进入服务二进制。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use badge_trigger::{
    AuthPolicy, AwardOutcome, AwardRecord, EventIntake, Result, RuleEngine, TriggerError,
    TriggerService,
    notification::{BadgePublisher, channel_for},
    repository::{AwardStore, RunHistoryRepository},
    state::AppState,
};

/// 内存发放存储
///
/// `DashMap::entry` 在分片锁内完成查找和插入，与数据库唯一约束一样保证同一
/// `(user_id, badge_id)` 只会有一次 `Granted`。
#[derive(Default)]
pub struct InMemoryAwardStore {
    records: DashMap<(String, String), AwardRecord>,
}

impl InMemoryAwardStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, user_id: &str, badge_id: &str) -> bool {
        self.records
            .contains_key(&(user_id.to_string(), badge_id.to_string()))
    }
}

#[async_trait]
impl AwardStore for InMemoryAwardStore {
    async fn try_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome> {
        match self
            .records
            .entry((user_id.to_string(), badge_id.to_string()))
        {
            Entry::Occupied(_) => Ok(AwardOutcome::AlreadyAwarded),
            Entry::Vacant(slot) => {
                slot.insert(AwardRecord {
                    user_id: user_id.to_string(),
                    badge_id: badge_id.to_string(),
                    awarded_at: Utc::now(),
                });
                Ok(AwardOutcome::Granted)
            }
        }
    }

    async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>> {
        let mut records: Vec<AwardRecord> = self
            .records
            .iter()
            .filter(|r| r.key().0 == user_id)
            .map(|r| r.value().clone())
            .collect();
        records.sort_by(|a, b| {
            a.awarded_at
                .cmp(&b.awarded_at)
                .then_with(|| a.badge_id.cmp(&b.badge_id))
        });
        Ok(records)
    }
}

/// 始终不可用的存储，模拟数据库宕机
#[derive(Default)]
pub struct UnavailableAwardStore;

#[async_trait]
impl AwardStore for UnavailableAwardStore {
    async fn try_award(&self, _user_id: &str, _badge_id: &str) -> Result<AwardOutcome> {
        Err(TriggerError::StorageUnavailable(
            "pool timed out while waiting for an open connection".into(),
        ))
    }

    async fn list_awards(&self, _user_id: &str) -> Result<Vec<AwardRecord>> {
        Err(TriggerError::StorageUnavailable(
            "pool timed out while waiting for an open connection".into(),
        ))
    }
}

/// 每次调用都先等待固定时长的存储，用于验证超时处理
pub struct SlowAwardStore {
    delay: Duration,
    inner: InMemoryAwardStore,
}

impl SlowAwardStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: InMemoryAwardStore::new(),
        }
    }
}

#[async_trait]
impl AwardStore for SlowAwardStore {
    async fn try_award(&self, user_id: &str, badge_id: &str) -> Result<AwardOutcome> {
        tokio::time::sleep(self.delay).await;
        self.inner.try_award(user_id, badge_id).await
    }

    async fn list_awards(&self, user_id: &str) -> Result<Vec<AwardRecord>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list_awards(user_id).await
    }
}

/// 内存运行历史
#[derive(Default)]
pub struct InMemoryRunHistory {
    counts: DashMap<String, i64>,
    failing: AtomicBool,
}

impl InMemoryRunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置用户的成功运行次数
    pub fn set_successful_runs(&self, user_id: &str, count: i64) {
        self.counts.insert(user_id.to_string(), count);
    }

    /// 切换为查询失败模式
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RunHistoryRepository for InMemoryRunHistory {
    async fn count_successful_runs(&self, user_id: &str) -> Result<i64> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TriggerError::StorageUnavailable("runs 查询失败".into()));
        }
        Ok(self.counts.get(user_id).map(|c| *c).unwrap_or(0))
    }
}

/// 记录发布内容的发布器
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换为发布失败模式
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// 已发布的 `(channel, payload)` 列表
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// 发往指定频道的消息
    pub fn messages_on(&self, channel: &str) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter(|(c, _)| c == channel)
            .map(|(_, payload)| payload)
            .collect()
    }
}

#[async_trait]
impl BadgePublisher for RecordingPublisher {
    async fn publish(&self, user_id: &str, badge_id: &str) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TriggerError::Publish("connection refused".into()));
        }
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((channel_for(user_id), badge_id.to_string()));
        }
        Ok(())
    }
}

/// 组装好的测试环境
///
/// 持有各个内存组件的句柄，便于在请求之后检查副作用。
pub struct TestHarness {
    pub awards: Arc<InMemoryAwardStore>,
    pub runs: Arc<InMemoryRunHistory>,
    pub publisher: Arc<RecordingPublisher>,
    pub state: AppState,
}

impl TestHarness {
    /// 无令牌（开放）策略
    pub fn open() -> Self {
        Self::with_policy(AuthPolicy::Open)
    }

    /// 需要令牌的策略
    pub fn with_token(token: &str) -> Self {
        Self::with_policy(AuthPolicy::from_token(Some(token.to_string())))
    }

    pub fn with_policy(policy: AuthPolicy) -> Self {
        let awards = Arc::new(InMemoryAwardStore::new());
        let runs = Arc::new(InMemoryRunHistory::new());
        let publisher = Arc::new(RecordingPublisher::new());

        let service = TriggerService::new(
            RuleEngine::default(),
            awards.clone(),
            runs.clone(),
            publisher.clone(),
            Duration::from_secs(1),
        );
        let state = AppState::new(Arc::new(service), Arc::new(EventIntake::new(policy)));

        Self {
            awards,
            runs,
            publisher,
            state,
        }
    }
}

/// 使用不可用存储的应用状态
pub fn unavailable_state(policy: AuthPolicy) -> AppState {
    state_with_store(policy, Arc::new(UnavailableAwardStore), Duration::from_secs(1))
}

/// 使用指定发放存储与单次操作超时的应用状态
pub fn state_with_store(
    policy: AuthPolicy,
    awards: Arc<dyn AwardStore>,
    operation_timeout: Duration,
) -> AppState {
    let service = TriggerService::new(
        RuleEngine::default(),
        awards,
        Arc::new(InMemoryRunHistory::new()),
        Arc::new(RecordingPublisher::new()),
        operation_timeout,
    );
    AppState::new(Arc::new(service), Arc::new(EventIntake::new(policy)))
}
