//! 响应 DTO

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Balance, Order, OrderStatus, Withdrawal};

/// 注册 / 登录响应
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// 订单条目
#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        // 只有 PROCESSED 订单展示积分
        let accrual = match order.status {
            OrderStatus::Processed => order.accrual,
            _ => None,
        };
        Self {
            number: order.order_number,
            status: order.status,
            accrual,
            uploaded_at: order.uploaded_at,
        }
    }
}

/// 余额
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub current: f64,
    pub withdrawn: f64,
}

impl From<Balance> for BalanceResponse {
    fn from(balance: Balance) -> Self {
        Self {
            current: balance.current,
            withdrawn: balance.withdrawn,
        }
    }
}

/// 提现条目
#[derive(Debug, Serialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: f64,
    pub processed_at: DateTime<Utc>,
}

impl From<Withdrawal> for WithdrawalResponse {
    fn from(w: Withdrawal) -> Self {
        Self {
            order: w.order_number,
            sum: w.amount,
            processed_at: w.processed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(status: OrderStatus, accrual: Option<f64>) -> Order {
        Order {
            id: 1,
            order_number: "9278923470".into(),
            user_id: 1,
            status,
            accrual,
            uploaded_at: "2020-12-10T15:15:45Z".parse().unwrap(),
        }
    }

    #[test]
    fn test_order_response_shape() {
        let json = serde_json::to_value(OrderResponse::from(order(OrderStatus::Processed, Some(500.0)))).unwrap();
        assert_eq!(json["number"], "9278923470");
        assert_eq!(json["status"], "PROCESSED");
        assert_eq!(json["accrual"], 500.0);
        assert_eq!(json["uploaded_at"], "2020-12-10T15:15:45Z");

        // 非 PROCESSED 订单不输出 accrual 字段
        let json = serde_json::to_value(OrderResponse::from(order(OrderStatus::Processing, None))).unwrap();
        assert!(json.get("accrual").is_none());
    }
}
