//! JWT 认证中间件
//!
//! 验证请求中的 Bearer Token，确认用户仍然存在后将用户信息注入请求扩展

use axum::{
    body::Body,
    extract::State,
    http::{HeaderValue, Request, header::AUTHORIZATION},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::LoyaltyError;
use crate::state::AppState;

/// 已认证用户，由认证中间件注入请求扩展
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: i64,
    pub login: String,
}

/// 认证中间件
///
/// 仅挂载在需要认证的路由上（`route_layer`）
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim);

    let Some(token) = token else {
        return LoyaltyError::Unauthorized("缺少认证 Token".to_string()).into_response();
    };

    match state.service.authenticate(token).await {
        Ok(user) => {
            request.extensions_mut().insert(AuthUser {
                id: user.id,
                login: user.login,
            });
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// 为所有响应注入 HTTP 安全头
pub async fn security_headers(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "strict-transport-security",
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );
    headers.insert("x-xss-protection", HeaderValue::from_static("0"));
    response
}
