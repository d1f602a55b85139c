//! 积分业务服务
//!
//! 注册、登录、订单上传、余额查询与提现。订单的积分结算委托给对账引擎。

use std::sync::Arc;

use loyalty_shared::observability::metrics;
use tracing::{info, instrument, warn};

use super::reconciliation::{OrderUpdate, ReconciliationEngine};
use crate::auth::{JwtManager, PasswordHasher};
use crate::error::{LoyaltyError, Result};
use crate::models::{Balance, NewWithdrawal, Order, UploadOutcome, User, Withdrawal};
use crate::repository::LoyaltyStore;
use crate::validation::OrderNumberValidator;

/// 积分业务服务
pub struct LoyaltyService {
    store: Arc<dyn LoyaltyStore>,
    engine: ReconciliationEngine,
    jwt: JwtManager,
    hasher: PasswordHasher,
    validator: OrderNumberValidator,
}

impl LoyaltyService {
    pub fn new(
        store: Arc<dyn LoyaltyStore>,
        engine: ReconciliationEngine,
        jwt: JwtManager,
        hasher: PasswordHasher,
        validator: OrderNumberValidator,
    ) -> Self {
        Self {
            store,
            engine,
            jwt,
            hasher,
            validator,
        }
    }

    /// 对账引擎，供后台轮询 worker 使用
    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }

    // ==================== 用户 ====================

    /// 注册并直接登录，返回 Token
    #[instrument(skip(self, password))]
    pub async fn register(&self, login: &str, password: &str) -> Result<String> {
        let hash = self.hasher.hash(password)?;
        let user = self.store.add_user(login, &hash).await?;

        info!(user_id = user.id, "User registered");
        self.jwt.generate_token(user.id)
    }

    /// 登录，返回 Token
    #[instrument(skip(self, password))]
    pub async fn login(&self, login: &str, password: &str) -> Result<String> {
        let user = self
            .store
            .get_user_by_login(login)
            .await?
            .ok_or(LoyaltyError::InvalidCredentials)?;

        if !self.hasher.verify(password, &user.password_hash)? {
            warn!(user_id = user.id, "Login failed: wrong password");
            return Err(LoyaltyError::InvalidCredentials);
        }

        self.jwt.generate_token(user.id)
    }

    /// 校验 Token 并确认用户仍然存在
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let claims = self.jwt.verify_token(token)?;
        let user_id = claims.user_id()?;

        self.store
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| LoyaltyError::Unauthorized("用户不存在".to_string()))
    }

    // ==================== 订单 ====================

    /// 上传订单号
    ///
    /// 第一个上传者永久拥有该订单号；同一用户重复上传返回 `AlreadyUploaded`。
    #[instrument(skip(self))]
    pub async fn upload_order(&self, user_id: i64, order_number: &str) -> Result<UploadOutcome> {
        let order_number = order_number.trim();
        if order_number.is_empty() {
            return Err(LoyaltyError::Validation("订单号不能为空".to_string()));
        }
        self.validator.validate(order_number)?;

        let outcome = self.store.upload_order(user_id, order_number).await?;
        if outcome == UploadOutcome::Accepted {
            info!("Order accepted for processing");
        }
        Ok(outcome)
    }

    /// 用户订单列表，按上传时间倒序
    pub async fn list_orders(&self, user_id: i64) -> Result<Vec<Order>> {
        self.store.get_orders_by_user_id(user_id).await
    }

    /// 立即向计算系统查询单个订单
    pub async fn update_order_accrual(&self, order_number: &str) -> Result<OrderUpdate> {
        self.engine.update_order_accrual(order_number).await
    }

    // ==================== 余额与提现 ====================

    /// 当前余额与历史提现总额
    pub async fn get_balance(&self, user_id: i64) -> Result<Balance> {
        let user = self
            .store
            .get_user_by_id(user_id)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;
        let withdrawn = self.store.get_withdrawals_sum_by_user_id(user_id).await?;

        Ok(Balance {
            current: user.balance,
            withdrawn,
        })
    }

    /// 提现
    ///
    /// 凭证订单号只需通过 Luhn 校验，不要求是已上传的订单。
    #[instrument(skip(self))]
    pub async fn withdraw(&self, user_id: i64, order_number: &str, sum: f64) -> Result<Withdrawal> {
        self.validator.validate(order_number)?;
        if !sum.is_finite() || sum <= 0.0 {
            return Err(LoyaltyError::Validation("提现金额必须大于 0".to_string()));
        }

        let result = self
            .store
            .process_withdrawal(&NewWithdrawal {
                user_id,
                order_number: order_number.to_string(),
                amount: sum,
            })
            .await;

        match &result {
            Ok(_) => {
                info!("Withdrawal processed");
                metrics::record_withdrawal("accepted");
            }
            Err(LoyaltyError::NotEnoughFunds) => metrics::record_withdrawal("not_enough_funds"),
            Err(_) => metrics::record_withdrawal("error"),
        }

        result
    }

    /// 提现记录，按处理时间倒序
    pub async fn list_withdrawals(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        self.store.get_withdrawals_by_user_id(user_id).await
    }

    /// 存储可用性检查
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::MockAccrualClient;
    use crate::auth::JwtConfig;
    use crate::repository::MemoryStore;
    use loyalty_shared::config::ReconcileConfig;

    fn service_with_store() -> (LoyaltyService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let engine = ReconciliationEngine::new(
            store.clone(),
            Arc::new(MockAccrualClient::new()),
            &ReconcileConfig::default(),
        );
        let service = LoyaltyService::new(
            store.clone(),
            engine,
            JwtManager::new(JwtConfig::default()),
            PasswordHasher::new(4),
            OrderNumberValidator::default(),
        );
        (service, store)
    }

    #[tokio::test]
    async fn test_register_login_authenticate() {
        let (service, _) = service_with_store();

        let token = service.register("alice", "secret").await.unwrap();
        let user = service.authenticate(&token).await.unwrap();
        assert_eq!(user.login, "alice");

        let token = service.login("alice", "secret").await.unwrap();
        assert_eq!(service.authenticate(&token).await.unwrap().id, user.id);

        assert!(matches!(
            service.login("alice", "wrong").await,
            Err(LoyaltyError::InvalidCredentials)
        ));
        assert!(matches!(
            service.login("nobody", "secret").await,
            Err(LoyaltyError::InvalidCredentials)
        ));
        assert!(matches!(
            service.register("alice", "again").await,
            Err(LoyaltyError::UserAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_token_for_missing_user_rejected() {
        let (service, _) = service_with_store();
        let token = JwtManager::new(JwtConfig::default()).generate_token(999).unwrap();

        assert!(matches!(
            service.authenticate(&token).await,
            Err(LoyaltyError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_order_validation() {
        let (service, store) = service_with_store();
        let user = store.add_user("alice", "hash").await.unwrap().id;

        assert!(matches!(
            service.upload_order(user, "  ").await,
            Err(LoyaltyError::Validation(_))
        ));
        assert!(matches!(
            service.upload_order(user, "12345678902").await,
            Err(LoyaltyError::InvalidOrderNumber(_))
        ));
        assert_eq!(
            service.upload_order(user, "12345678903\n").await.unwrap(),
            UploadOutcome::Accepted
        );
        assert_eq!(
            service.upload_order(user, "12345678903").await.unwrap(),
            UploadOutcome::AlreadyUploaded
        );
    }

    #[tokio::test]
    async fn test_balance_and_withdraw() {
        let (service, store) = service_with_store();
        let user = store.add_user("alice", "hash").await.unwrap().id;
        store.set_balance(user, 729.98).unwrap();

        assert!(matches!(
            service.withdraw(user, "2377225624", 1000.0).await,
            Err(LoyaltyError::NotEnoughFunds)
        ));
        assert!(matches!(
            service.withdraw(user, "12345678902", 10.0).await,
            Err(LoyaltyError::InvalidOrderNumber(_))
        ));
        assert!(matches!(
            service.withdraw(user, "2377225624", 0.0).await,
            Err(LoyaltyError::Validation(_))
        ));

        service.withdraw(user, "2377225624", 229.98).await.unwrap();

        let balance = service.get_balance(user).await.unwrap();
        assert!((balance.current - 500.0).abs() < 1e-9);
        assert!((balance.withdrawn - 229.98).abs() < 1e-9);
        assert_eq!(service.list_withdrawals(user).await.unwrap().len(), 1);
    }
}
