//! 业务服务层

mod trigger_service;

pub use trigger_service::TriggerService;
