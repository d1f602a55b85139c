//! 应用状态定义

use std::sync::Arc;

use crate::service::LoyaltyService;

/// Axum 应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LoyaltyService>,
}

impl AppState {
    pub fn new(service: Arc<LoyaltyService>) -> Self {
        Self { service }
    }
}
