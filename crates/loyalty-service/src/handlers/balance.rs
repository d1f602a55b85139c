//! 余额、提现与提现记录

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use validator::Validate;

use super::json_body;
use crate::dto::{BalanceResponse, WithdrawRequest, WithdrawalResponse};
use crate::error::Result;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// 当前余额与累计提现
///
/// GET /api/user/balance
pub async fn get_balance(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<BalanceResponse>> {
    let balance = state.service.get_balance(user.id).await?;
    Ok(Json(balance.into()))
}

/// 提现
///
/// POST /api/user/balance/withdraw
pub async fn withdraw(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: std::result::Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode> {
    let req = json_body(payload)?;
    req.validate()?;

    state.service.withdraw(user.id, &req.order, req.sum).await?;
    Ok(StatusCode::OK)
}

/// 提现记录，无记录时返回 204
///
/// GET /api/user/withdrawals
pub async fn list_withdrawals(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response> {
    let withdrawals = state.service.list_withdrawals(user.id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    let body: Vec<WithdrawalResponse> = withdrawals.into_iter().map(Into::into).collect();
    Ok(Json(body).into_response())
}
