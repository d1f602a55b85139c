//! HTTP 请求处理器

pub mod balance;
pub mod health;
pub mod order;
pub mod user;

use axum::Json;
use axum::extract::rejection::JsonRejection;

use crate::error::LoyaltyError;

/// 把 JSON 解析失败统一映射为 400
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, LoyaltyError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| LoyaltyError::Validation(e.body_text()))
}
