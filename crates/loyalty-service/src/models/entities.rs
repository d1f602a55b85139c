//! 实体定义

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::OrderStatus;

/// 用户
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    /// 当前可用积分，只由订单入账增加、由提现减少
    pub balance: f64,
    pub created_at: DateTime<Utc>,
}

/// 订单
///
/// 订单号全局唯一，第一个上传者永久拥有该订单号
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Order {
    pub id: i64,
    pub order_number: String,
    pub user_id: i64,
    pub status: OrderStatus,
    /// 仅在 PROCESSED 后有意义
    pub accrual: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

/// 提现记录（只追加）
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct Withdrawal {
    pub id: i64,
    pub user_id: i64,
    /// 提现凭证订单号，须通过 Luhn 校验，但不要求对应已上传的订单
    pub order_number: String,
    pub amount: f64,
    pub processed_at: DateTime<Utc>,
}

/// 待写入的提现请求
#[derive(Debug, Clone, PartialEq)]
pub struct NewWithdrawal {
    pub user_id: i64,
    pub order_number: String,
    pub amount: f64,
}

/// 积分余额
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Balance {
    /// 当前余额
    pub current: f64,
    /// 历史提现总额
    pub withdrawn: f64,
}

/// 订单上传结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// 新订单已受理
    Accepted,
    /// 当前用户此前已上传过该订单
    AlreadyUploaded,
}

/// 订单入账结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinalizeOutcome {
    /// 订单已置为 PROCESSED，积分已入账
    Finalized { user_id: i64, balance: f64 },
    /// 订单此前已是终态，本次未做任何修改
    AlreadyTerminal(OrderStatus),
}
