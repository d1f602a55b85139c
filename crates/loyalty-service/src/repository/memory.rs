//! 内存存储实现
//!
//! 所有状态由一把互斥锁保护，每个操作在持锁期间完成，语义上等价于单个事务。
//! 用于测试和本地开发。

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use super::traits::LoyaltyStore;
use crate::error::{LoyaltyError, Result};
use crate::models::{
    FinalizeOutcome, NewWithdrawal, Order, OrderStatus, UploadOutcome, User, Withdrawal,
};

#[derive(Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    logins: HashMap<String, i64>,
    orders: HashMap<String, Order>,
    withdrawals: Vec<Withdrawal>,
    next_user_id: i64,
    next_order_id: i64,
    next_withdrawal_id: i64,
}

/// 内存存储
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 直接设置用户余额，用于准备测试数据
    pub fn set_balance(&self, user_id: i64, balance: f64) -> Result<()> {
        let mut state = self.state.lock();
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(LoyaltyError::UserNotFound(user_id))?;
        user.balance = balance;
        Ok(())
    }
}

#[async_trait]
impl LoyaltyStore for MemoryStore {
    async fn add_user(&self, login: &str, password_hash: &str) -> Result<User> {
        let mut state = self.state.lock();
        if state.logins.contains_key(login) {
            return Err(LoyaltyError::UserAlreadyExists(login.to_string()));
        }

        state.next_user_id += 1;
        let user = User {
            id: state.next_user_id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
            balance: 0.0,
            created_at: Utc::now(),
        };
        state.logins.insert(user.login.clone(), user.id);
        state.users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let state = self.state.lock();
        Ok(state
            .logins
            .get(login)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.state.lock().users.get(&id).cloned())
    }

    async fn upload_order(&self, user_id: i64, order_number: &str) -> Result<UploadOutcome> {
        let mut state = self.state.lock();

        if let Some(existing) = state.orders.get(order_number) {
            return if existing.user_id == user_id {
                Ok(UploadOutcome::AlreadyUploaded)
            } else {
                Err(LoyaltyError::OrderUploadedByAnotherUser(
                    order_number.to_string(),
                ))
            };
        }

        if !state.users.contains_key(&user_id) {
            return Err(LoyaltyError::UserNotFound(user_id));
        }

        state.next_order_id += 1;
        let order = Order {
            id: state.next_order_id,
            order_number: order_number.to_string(),
            user_id,
            status: OrderStatus::New,
            accrual: None,
            uploaded_at: Utc::now(),
        };
        state.orders.insert(order.order_number.clone(), order);

        Ok(UploadOutcome::Accepted)
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        Ok(self.state.lock().orders.get(order_number).cloned())
    }

    async fn get_orders_by_user_id(&self, user_id: i64) -> Result<Vec<Order>> {
        let state = self.state.lock();
        let mut orders: Vec<Order> = state
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| (b.uploaded_at, b.id).cmp(&(a.uploaded_at, a.id)));
        Ok(orders)
    }

    async fn get_pending_orders(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let mut pending: Vec<&Order> = state
            .orders
            .values()
            .filter(|o| o.status.is_pending())
            .collect();
        pending.sort_by_key(|o| (o.uploaded_at, o.id));
        Ok(pending.into_iter().map(|o| o.order_number.clone()).collect())
    }

    async fn set_order_status(&self, order_number: &str, status: OrderStatus) -> Result<bool> {
        let mut state = self.state.lock();
        match state.orders.get_mut(order_number) {
            Some(order) if order.status.is_pending() => {
                order.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn finalize_order_and_update_balance(
        &self,
        order_number: &str,
        amount: f64,
    ) -> Result<FinalizeOutcome> {
        let mut state = self.state.lock();

        let (user_id, status) = state
            .orders
            .get(order_number)
            .map(|o| (o.user_id, o.status))
            .ok_or_else(|| LoyaltyError::OrderNotFound(order_number.to_string()))?;

        if status.is_terminal() {
            return Ok(FinalizeOutcome::AlreadyTerminal(status));
        }
        if !state.users.contains_key(&user_id) {
            return Err(LoyaltyError::UserNotFound(user_id));
        }

        // 先确认用户存在再写入，任何失败都不会留下部分修改
        if let Some(order) = state.orders.get_mut(order_number) {
            order.status = OrderStatus::Processed;
            order.accrual = Some(amount);
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or(LoyaltyError::UserNotFound(user_id))?;
        user.balance += amount;

        Ok(FinalizeOutcome::Finalized {
            user_id,
            balance: user.balance,
        })
    }

    async fn process_withdrawal(&self, withdrawal: &NewWithdrawal) -> Result<Withdrawal> {
        let mut state = self.state.lock();

        let user = state
            .users
            .get_mut(&withdrawal.user_id)
            .ok_or(LoyaltyError::UserNotFound(withdrawal.user_id))?;
        if user.balance < withdrawal.amount {
            return Err(LoyaltyError::NotEnoughFunds);
        }
        user.balance -= withdrawal.amount;

        state.next_withdrawal_id += 1;
        let record = Withdrawal {
            id: state.next_withdrawal_id,
            user_id: withdrawal.user_id,
            order_number: withdrawal.order_number.clone(),
            amount: withdrawal.amount,
            processed_at: Utc::now(),
        };
        state.withdrawals.push(record.clone());

        Ok(record)
    }

    async fn get_withdrawals_sum_by_user_id(&self, user_id: i64) -> Result<f64> {
        let state = self.state.lock();
        Ok(state
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .map(|w| w.amount)
            .sum())
    }

    async fn get_withdrawals_by_user_id(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let state = self.state.lock();
        let mut withdrawals: Vec<Withdrawal> = state
            .withdrawals
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        withdrawals.sort_by(|a, b| (b.processed_at, b.id).cmp(&(a.processed_at, a.id)));
        Ok(withdrawals)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
