//! 枚举类型定义

use serde::{Deserialize, Serialize};

/// 订单状态
///
/// 状态只会前进：NEW -> PROCESSING -> INVALID | PROCESSED。
/// NEW 与 PROCESSING 为待处理状态，INVALID 与 PROCESSED 为终态，终态订单不再轮询。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "varchar", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// 已上传，尚未被计算系统受理
    #[default]
    New,
    /// 计算系统处理中
    Processing,
    /// 计算系统拒绝，不会产生积分
    Invalid,
    /// 处理完成，积分已入账
    Processed,
}

impl OrderStatus {
    /// 是否为终态
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }

    /// 是否仍需向计算系统轮询
    pub fn is_pending(self) -> bool {
        !self.is_terminal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::Processing => "PROCESSING",
            Self::Invalid => "INVALID",
            Self::Processed => "PROCESSED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!OrderStatus::New.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Invalid.is_terminal());
        assert!(OrderStatus::Processed.is_terminal());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");

        let status: OrderStatus = serde_json::from_str("\"PROCESSED\"").unwrap();
        assert_eq!(status, OrderStatus::Processed);
        assert_eq!(status.to_string(), "PROCESSED");
    }
}
