//! 共享库
//!
//! 包含徽章服务共用的配置、错误处理、数据库连接池、Redis 发布订阅、可观测性等基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod pubsub;
pub mod test_utils;
