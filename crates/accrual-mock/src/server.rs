//! 模拟计算系统 HTTP 接口
//!
//! 保留订单号用于触发异常分支：
//! - `1234567890`：204，订单未登记
//! - `9876543210`：500
//! - `2468013579`：429，不带 `Retry-After`

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
    routing::get,
};
use tracing::{debug, warn};

use crate::orders::OrderBook;
use crate::rate_limit::RateLimiter;

pub const NO_CONTENT_ORDER: &str = "1234567890";
pub const INTERNAL_ERROR_ORDER: &str = "9876543210";
pub const TOO_MANY_REQUESTS_ORDER: &str = "2468013579";

/// 模拟服务状态
#[derive(Clone)]
pub struct MockState {
    pub book: Arc<OrderBook>,
    pub limiter: Option<Arc<RateLimiter>>,
}

impl MockState {
    pub fn new(book: OrderBook, limiter: Option<RateLimiter>) -> Self {
        Self {
            book: Arc::new(book),
            limiter: limiter.map(Arc::new),
        }
    }
}

/// 计算系统路由
pub fn mock_routes(state: MockState) -> Router {
    Router::new()
        .route("/api/orders/{number}", get(get_order))
        .with_state(state)
}

/// 查询订单积分
///
/// GET /api/orders/{number}
async fn get_order(State(state): State<MockState>, Path(number): Path<String>) -> Response {
    if let Some(limiter) = &state.limiter
        && let Err(wait) = limiter.try_acquire()
    {
        warn!(order = %number, "Rate limit exceeded");
        return too_many_requests(limiter.limit(), wait.as_secs_f64().ceil() as u64);
    }

    match number.as_str() {
        NO_CONTENT_ORDER => StatusCode::NO_CONTENT.into_response(),
        INTERNAL_ERROR_ORDER => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        TOO_MANY_REQUESTS_ORDER => StatusCode::TOO_MANY_REQUESTS.into_response(),
        _ => {
            let order = state.book.query(&number);
            debug!(order = %number, status = ?order.status, "Order queried");
            Json(order).into_response()
        }
    }
}

fn too_many_requests(limit: u32, retry_after_secs: u64) -> Response {
    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        format!("No more than {} requests per minute allowed", limit),
    )
        .into_response();
    response
        .headers_mut()
        .insert(RETRY_AFTER, HeaderValue::from(retry_after_secs.max(1)));
    response
}
