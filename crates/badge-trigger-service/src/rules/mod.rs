//! 徽章规则引擎
//!
//! 根据事件与用户历史计算候选徽章集合。规则按事件类型登记在表中，
//! 新增规则只需 `register`，不需要改动已有规则。
//!
//! 引擎本身是纯计算：用户历史由调用方预先读取后通过 [`UserHistory`] 传入，
//! 评估过程不做任何 I/O，因此可以脱离存储单独测试。
//!
//! ## 使用示例
//!
//! ```ignore
//! use badge_trigger::rules::{HistorySnapshot, RuleEngine};
//!
//! let engine = RuleEngine::with_defaults(1);
//! let history = HistorySnapshot::new(0);
//! let candidates = engine.evaluate(&event, &history);
//! ```

mod first_compile;

pub use first_compile::FirstCompileRule;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use crate::models::{ActivityEvent, EventType};

/// 用户历史只读访问器
pub trait UserHistory {
    /// 评估时已记录的成功运行次数
    fn successful_runs(&self) -> i64;
}

/// 调用方读取的历史快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistorySnapshot {
    pub successful_runs: i64,
}

impl HistorySnapshot {
    pub fn new(successful_runs: i64) -> Self {
        Self { successful_runs }
    }
}

impl UserHistory for HistorySnapshot {
    fn successful_runs(&self) -> i64 {
        self.successful_runs
    }
}

/// 徽章规则
///
/// 每条规则绑定一种事件类型和一个徽章，`matches` 必须无副作用
pub trait BadgeRule: Send + Sync {
    /// 规则监听的事件类型
    fn event_type(&self) -> EventType;

    /// 命中时授予的徽章
    fn badge_id(&self) -> &str;

    /// 判断事件与历史是否满足条件
    fn matches(&self, event: &ActivityEvent, history: &dyn UserHistory) -> bool;
}

/// 规则引擎
pub struct RuleEngine {
    rules: HashMap<EventType, Vec<Arc<dyn BadgeRule>>>,
}

impl RuleEngine {
    /// 创建空引擎
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// 创建包含内置规则的引擎
    ///
    /// - FirstCompileRule: 成功运行次数不超过 `first_compile_max_runs` 时授予 first_compile
    pub fn with_defaults(first_compile_max_runs: i64) -> Self {
        let mut engine = Self::new();
        engine.register(Arc::new(FirstCompileRule::new(first_compile_max_runs)));

        info!(rule_count = engine.len(), "徽章规则初始化完成");
        engine
    }

    /// 登记一条规则
    pub fn register(&mut self, rule: Arc<dyn BadgeRule>) -> &mut Self {
        let event_type = rule.event_type();
        debug!(event_type = %event_type, badge_id = rule.badge_id(), "登记徽章规则");
        self.rules.entry(event_type).or_default().push(rule);
        self
    }

    /// 该事件类型是否登记了规则
    ///
    /// 调用方据此决定是否需要读取用户历史
    pub fn has_rules_for(&self, event_type: &EventType) -> bool {
        self.rules.get(event_type).is_some_and(|rules| !rules.is_empty())
    }

    /// 计算候选徽章集合
    pub fn evaluate(&self, event: &ActivityEvent, history: &dyn UserHistory) -> BTreeSet<String> {
        let Some(rules) = self.rules.get(&event.event_type) else {
            return BTreeSet::new();
        };

        rules
            .iter()
            .filter(|rule| rule.matches(event, history))
            .map(|rule| rule.badge_id().to_string())
            .collect()
    }

    /// 已登记的规则总数
    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::with_defaults(1)
    }
}
