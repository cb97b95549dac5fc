//! HTTP 请求处理器

pub mod health;
pub mod trigger;
