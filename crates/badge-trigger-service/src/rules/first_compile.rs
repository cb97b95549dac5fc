//! first_compile 规则：用户最初的几次成功运行授予徽章

use super::{BadgeRule, UserHistory};
use crate::models::{ActivityEvent, EventType, badges};

/// 成功运行次数不超过 `max_runs` 时命中
///
/// 次数取评估时 runs 表中已记录的成功运行数。执行引擎先落库再投递事件时，
/// 这个数包含触发本次事件的那次运行，因此默认阈值为 1。
#[derive(Debug, Clone)]
pub struct FirstCompileRule {
    max_runs: i64,
}

impl FirstCompileRule {
    pub fn new(max_runs: i64) -> Self {
        Self { max_runs }
    }

    pub fn max_runs(&self) -> i64 {
        self.max_runs
    }
}

impl Default for FirstCompileRule {
    fn default() -> Self {
        Self::new(1)
    }
}

impl BadgeRule for FirstCompileRule {
    fn event_type(&self) -> EventType {
        EventType::RunSuccess
    }

    fn badge_id(&self) -> &str {
        badges::FIRST_COMPILE
    }

    fn matches(&self, _event: &ActivityEvent, history: &dyn UserHistory) -> bool {
        history.successful_runs() <= self.max_runs
    }
}
