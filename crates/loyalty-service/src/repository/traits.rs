//! 存储 Trait 定义

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{FinalizeOutcome, NewWithdrawal, Order, OrderStatus, UploadOutcome, User, Withdrawal};

/// 积分存储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    // 用户
    /// 创建用户，登录名已存在时返回 `UserAlreadyExists`
    async fn add_user(&self, login: &str, password_hash: &str) -> Result<User>;
    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>>;

    // 订单
    /// 原子地认领订单号，被其他用户认领时返回 `OrderUploadedByAnotherUser`
    async fn upload_order(&self, user_id: i64, order_number: &str) -> Result<UploadOutcome>;
    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>>;
    /// 按上传时间倒序
    async fn get_orders_by_user_id(&self, user_id: i64) -> Result<Vec<Order>>;
    /// 所有待处理订单号，按上传时间先后排序
    async fn get_pending_orders(&self) -> Result<Vec<String>>;
    /// 更新待处理订单的状态，终态订单不会被改写；返回是否有行被更新
    async fn set_order_status(&self, order_number: &str, status: OrderStatus) -> Result<bool>;
    /// 单事务内将订单置为 PROCESSED 并把积分加到所属用户余额
    async fn finalize_order_and_update_balance(
        &self,
        order_number: &str,
        amount: f64,
    ) -> Result<FinalizeOutcome>;

    // 提现
    /// 单事务内写入提现记录并扣减余额，余额不足时返回 `NotEnoughFunds` 且不做任何写入
    async fn process_withdrawal(&self, withdrawal: &NewWithdrawal) -> Result<Withdrawal>;
    async fn get_withdrawals_sum_by_user_id(&self, user_id: i64) -> Result<f64>;
    /// 按处理时间倒序
    async fn get_withdrawals_by_user_id(&self, user_id: i64) -> Result<Vec<Withdrawal>>;

    /// 存储可用性检查
    async fn ping(&self) -> Result<()>;
}
