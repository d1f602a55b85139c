//! 请求 DTO

use serde::Deserialize;
use validator::Validate;

/// 注册 / 登录请求
#[derive(Debug, Deserialize, Validate)]
pub struct AuthRequest {
    #[validate(length(min = 1, max = 255, message = "登录名长度必须在 1-255 之间"))]
    pub login: String,
    #[validate(length(min = 1, max = 72, message = "密码长度必须在 1-72 之间"))]
    pub password: String,
}

/// 提现请求
#[derive(Debug, Deserialize, Validate)]
pub struct WithdrawRequest {
    /// 凭证订单号，Luhn 校验在服务层完成（失败返回 422）
    #[validate(length(min = 1, message = "订单号不能为空"))]
    pub order: String,
    #[validate(range(exclusive_min = 0.0, message = "提现金额必须大于 0"))]
    pub sum: f64,
}
