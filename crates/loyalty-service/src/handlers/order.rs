//! 订单上传与查询

use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::dto::OrderResponse;
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::models::UploadOutcome;
use crate::state::AppState;

/// 上传订单号（text/plain 请求体）
///
/// POST /api/user/orders
pub async fn upload_order(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: String,
) -> Result<StatusCode> {
    let outcome = state.service.upload_order(user.id, &body).await?;

    Ok(match outcome {
        UploadOutcome::Accepted => StatusCode::ACCEPTED,
        UploadOutcome::AlreadyUploaded => StatusCode::OK,
    })
}

/// 订单列表，无订单时返回 204
///
/// GET /api/user/orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let orders = state.service.list_orders(user.id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<OrderResponse> = orders.into_iter().map(OrderResponse::from).collect();
    Ok(Json(body).into_response())
}
