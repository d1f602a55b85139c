//! 积分累计服务
//!
//! 用户注册后上传购物订单号，由外部积分计算系统评估订单积分；
//! 用户可以查询余额、用积分抵扣（提现）并查看提现记录。
//!
//! ## 模块结构
//!
//! - `models`: 用户、订单、提现实体
//! - `repository`: 存储接口及 PostgreSQL / 内存实现
//! - `accrual`: 积分计算系统客户端
//! - `service`: 对账引擎与业务服务
//! - `auth`: JWT 与密码哈希
//! - `validation`: 订单号 Luhn 校验
//! - `dto` / `handlers` / `middleware` / `routes` / `state`: HTTP 层
//! - `worker`: 后台对账轮询

pub mod accrual;
pub mod auth;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod validation;
pub mod worker;

pub use error::{LoyaltyError, Result};
pub use service::{LoyaltyService, ReconciliationEngine};
