//! 数据库仓储层
//!
//! - 仓储只负责数据持久化，不包含业务逻辑
//! - 使用 SQLx 访问共享连接池，连接按查询租用
//! - 定义 trait 接口以支持 mock 测试

mod award_repo;
mod run_repo;
mod traits;

pub use award_repo::PgAwardStore;
pub use run_repo::PgRunRepository;
pub use traits::*;
