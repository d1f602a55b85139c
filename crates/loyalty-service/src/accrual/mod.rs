//! 积分计算系统（accrual）客户端
//!
//! 计算系统是订单积分的唯一权威来源。客户端在启动时构造一次，由对账引擎共享。

mod client;
mod error;

pub use client::{AccrualClient, AccrualResponse, AccrualStatus, HttpAccrualClient};
pub use error::AccrualError;

#[cfg(test)]
pub use client::MockAccrualClient;
