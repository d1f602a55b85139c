//! 用户注册与登录

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, HeaderValue, header::AUTHORIZATION},
};
use validator::Validate;

use super::json_body;
use crate::dto::{AuthRequest, TokenResponse};
use crate::error::{LoyaltyError, Result};
use crate::state::AppState;

/// 用户注册，成功后直接登录
///
/// POST /api/user/register
pub async fn register(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AuthRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<TokenResponse>)> {
    let req = json_body(payload)?;
    req.validate()?;

    let token = state.service.register(&req.login, &req.password).await?;
    token_response(token)
}

/// 用户登录
///
/// POST /api/user/login
pub async fn login(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AuthRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<TokenResponse>)> {
    let req = json_body(payload)?;
    req.validate()?;

    let token = state.service.login(&req.login, &req.password).await?;
    token_response(token)
}

/// Token 同时放在 Authorization 头和响应体中
fn token_response(token: String) -> Result<(HeaderMap, Json<TokenResponse>)> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|e| LoyaltyError::Internal(format!("Token 无法写入响应头: {}", e)))?;
    headers.insert(AUTHORIZATION, value);

    Ok((headers, Json(TokenResponse { token })))
}
