//! 请求与响应 DTO

mod request;
mod response;

pub use request::{AuthRequest, WithdrawRequest};
pub use response::{BalanceResponse, OrderResponse, TokenResponse, WithdrawalResponse};
