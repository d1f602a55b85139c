//! 积分计算系统模拟服务
//!
//! 实现计算系统的查询协议 `GET /api/orders/{number}`，用于本地开发和联调。
//!
//! # 主要模块
//!
//! - `orders`: 订单状态推进（REGISTERED → PROCESSING → PROCESSED | INVALID）
//! - `rate_limit`: 每分钟请求数限制
//! - `server`: HTTP 路由与保留订单号

pub mod orders;
pub mod rate_limit;
pub mod server;

pub use orders::{MockOrder, MockStatus, OrderBook, OrderBookConfig};
pub use rate_limit::RateLimiter;
pub use server::{MockState, mock_routes};
