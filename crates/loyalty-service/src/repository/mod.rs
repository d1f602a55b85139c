//! 数据存储层
//!
//! 用户、订单和提现的持久化接口。
//!
//! ## 设计原则
//!
//! - 存储只负责持久化和事务原子性，不包含业务校验
//! - 余额变更（入账、提现）在单个事务内完成，依赖行锁保证并发正确
//! - 定义 trait 接口以支持 mock 测试和内存实现

mod memory;
mod postgres;
mod traits;

pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use traits::*;
