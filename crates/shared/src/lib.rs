//! 共享库
//!
//! 包含积分服务使用的配置、错误处理、数据库连接、重试策略和可观测性基础设施代码。

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod retry;
