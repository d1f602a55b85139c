//! 领域模型
//!
//! 用户、订单、提现记录及订单状态枚举。

mod entities;
mod enums;

pub use entities::{Balance, FinalizeOutcome, NewWithdrawal, Order, UploadOutcome, User, Withdrawal};
pub use enums::OrderStatus;
