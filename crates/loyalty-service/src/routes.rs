//! 路由配置模块

use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use loyalty_shared::observability::middleware as obs_middleware;
use tower_http::timeout::TimeoutLayer;

use crate::handlers;
use crate::middleware::{auth_middleware, security_headers};
use crate::state::AppState;

/// 单个请求的处理超时
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// 公开路由：注册与登录
fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(handlers::user::register))
        .route("/user/login", post(handlers::user::login))
}

/// 需要认证的路由
fn protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/user/orders",
            post(handlers::order::upload_order).get(handlers::order::list_orders),
        )
        .route("/user/balance", get(handlers::balance::get_balance))
        .route("/user/balance/withdraw", post(handlers::balance::withdraw))
        .route("/user/withdrawals", get(handlers::balance::list_withdrawals))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// `/api` 下的全部业务路由
pub fn api_routes(state: AppState) -> Router<AppState> {
    public_routes().merge(protected_routes(state))
}

/// 构建完整应用：业务路由、探针与全局中间件
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api_routes(state.clone()))
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn(security_headers))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        // 可观测性中间件：请求追踪和指标收集
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
