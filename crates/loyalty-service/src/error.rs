//! 积分服务错误类型定义
//!
//! 业务错误映射到明确的 HTTP 状态码；系统错误只返回通用提示，细节记录到日志。

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::accrual::AccrualError;

/// 积分服务错误类型
#[derive(Debug, thiserror::Error)]
pub enum LoyaltyError {
    // 认证错误
    #[error("未授权: {0}")]
    Unauthorized(String),
    #[error("用户名或密码错误")]
    InvalidCredentials,
    #[error("用户名已被占用: {0}")]
    UserAlreadyExists(String),
    #[error("用户不存在: {0}")]
    UserNotFound(i64),

    // 验证错误
    #[error("参数验证失败: {0}")]
    Validation(String),
    #[error("订单号格式错误: {0}")]
    InvalidOrderNumber(String),

    // 业务错误
    #[error("订单已被其他用户上传: {0}")]
    OrderUploadedByAnotherUser(String),
    #[error("订单不存在: {0}")]
    OrderNotFound(String),
    #[error("余额不足")]
    NotEnoughFunds,

    // 计算系统
    #[error("计算系统返回未知状态: {0}")]
    UnknownAccrualStatus(String),
    #[error("计算系统返回非法积分: 订单 {order}, 积分 {amount}")]
    InvalidAccrualAmount { order: String, amount: f64 },
    #[error(transparent)]
    Accrual(#[from] AccrualError),

    // 系统错误
    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl LoyaltyError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::UserAlreadyExists(_) | Self::OrderUploadedByAnotherUser(_) => {
                StatusCode::CONFLICT
            }
            Self::UserNotFound(_) | Self::OrderNotFound(_) => StatusCode::NOT_FOUND,

            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,

            Self::NotEnoughFunds => StatusCode::PAYMENT_REQUIRED,

            Self::UnknownAccrualStatus(_) | Self::InvalidAccrualAmount { .. } | Self::Accrual(_) => {
                StatusCode::BAD_GATEWAY
            }

            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::UserAlreadyExists(_) => "USER_ALREADY_EXISTS",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InvalidOrderNumber(_) => "INVALID_ORDER_NUMBER",
            Self::OrderUploadedByAnotherUser(_) => "ORDER_UPLOADED_BY_ANOTHER_USER",
            Self::OrderNotFound(_) => "ORDER_NOT_FOUND",
            Self::NotEnoughFunds => "NOT_ENOUGH_FUNDS",
            Self::UnknownAccrualStatus(_) => "UNKNOWN_ACCRUAL_STATUS",
            Self::InvalidAccrualAmount { .. } => "INVALID_ACCRUAL_AMOUNT",
            Self::Accrual(_) => "ACCRUAL_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 计算系统的暂时性错误：订单保持待处理，下一轮对账会重新查询
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Accrual(e) if e.is_transient())
    }
}

impl IntoResponse for LoyaltyError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::Database(e) => {
                tracing::error!(error = %e, "数据库操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Accrual(e) => {
                tracing::error!(error = %e, "计算系统调用失败");
                "积分计算服务暂不可用".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for LoyaltyError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation(errors.to_string())
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, LoyaltyError>;
