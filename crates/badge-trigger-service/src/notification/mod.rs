//! 通知模块
//!
//! 徽章新发放后向用户频道做尽力而为的实时推送。
//!
//! 若将来需要至少一次送达，应改为 outbox 模式：与发放记录在同一事务内写入待发通知，
//! 再由后台任务异步投递并重试。

mod publisher;

pub use publisher::{BadgePublisher, RedisBadgePublisher, channel_for};

#[cfg(test)]
pub use publisher::MockBadgePublisher;
