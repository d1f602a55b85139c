//! 服务层
//!
//! - `reconciliation`: 待处理订单对账引擎
//! - `loyalty`: 用户、订单、余额相关的业务用例

mod loyalty;
mod reconciliation;

pub use loyalty::LoyaltyService;
pub use reconciliation::{OrderUpdate, ReconcileReport, ReconciliationEngine};
