//! PostgreSQL 存储实现
//!
//! 余额相关操作使用事务内 `FOR UPDATE` 行锁，同一用户的并发入账与提现串行化。

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::traits::LoyaltyStore;
use crate::error::{LoyaltyError, Result};
use crate::models::{
    FinalizeOutcome, NewWithdrawal, Order, OrderStatus, UploadOutcome, User, Withdrawal,
};

/// PostgreSQL 存储
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoyaltyStore for PgStore {
    // ==================== 用户 ====================

    async fn add_user(&self, login: &str, password_hash: &str) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            ON CONFLICT (login) DO NOTHING
            RETURNING id, login, password_hash, balance, created_at
            "#,
        )
        .bind(login)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or_else(|| LoyaltyError::UserAlreadyExists(login.to_string()))
    }

    async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash, balance, created_at
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash, balance, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    // ==================== 订单 ====================

    async fn upload_order(&self, user_id: i64, order_number: &str) -> Result<UploadOutcome> {
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO orders (order_number, user_id, status)
            VALUES ($1, $2, $3)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(order_number)
        .bind(user_id)
        .bind(OrderStatus::New)
        .fetch_optional(&self.pool)
        .await?;

        if inserted.is_some() {
            return Ok(UploadOutcome::Accepted);
        }

        // 订单号已被认领，比较归属
        let owner: Option<i64> =
            sqlx::query_scalar("SELECT user_id FROM orders WHERE order_number = $1")
                .bind(order_number)
                .fetch_optional(&self.pool)
                .await?;

        match owner {
            Some(owner) if owner == user_id => Ok(UploadOutcome::AlreadyUploaded),
            Some(_) => Err(LoyaltyError::OrderUploadedByAnotherUser(
                order_number.to_string(),
            )),
            None => Err(LoyaltyError::Internal(format!(
                "订单 {} 插入冲突但查询不到归属",
                order_number
            ))),
        }
    }

    async fn get_order_by_number(&self, order_number: &str) -> Result<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE order_number = $1
            "#,
        )
        .bind(order_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    async fn get_orders_by_user_id(&self, user_id: i64) -> Result<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, order_number, user_id, status, accrual, uploaded_at
            FROM orders
            WHERE user_id = $1
            ORDER BY uploaded_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    async fn get_pending_orders(&self) -> Result<Vec<String>> {
        let numbers = sqlx::query_scalar::<_, String>(
            r#"
            SELECT order_number
            FROM orders
            WHERE status IN ('NEW', 'PROCESSING')
            ORDER BY uploaded_at ASC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(numbers)
    }

    async fn set_order_status(&self, order_number: &str, status: OrderStatus) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders
            SET status = $2
            WHERE order_number = $1
              AND status IN ('NEW', 'PROCESSING')
            "#,
        )
        .bind(order_number)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn finalize_order_and_update_balance(
        &self,
        order_number: &str,
        amount: f64,
    ) -> Result<FinalizeOutcome> {
        let mut tx = self.pool.begin().await?;

        let order: Option<(i64, OrderStatus)> = sqlx::query_as(
            r#"
            SELECT user_id, status
            FROM orders
            WHERE order_number = $1
            FOR UPDATE
            "#,
        )
        .bind(order_number)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((user_id, status)) = order else {
            return Err(LoyaltyError::OrderNotFound(order_number.to_string()));
        };

        if status.is_terminal() {
            tx.rollback().await?;
            debug!(order_number, %status, "Order already terminal, skipping credit");
            return Ok(FinalizeOutcome::AlreadyTerminal(status));
        }

        sqlx::query(
            r#"
            UPDATE orders
            SET status = $2, accrual = $3
            WHERE order_number = $1
            "#,
        )
        .bind(order_number)
        .bind(OrderStatus::Processed)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        let balance = sqlx::query_scalar::<_, f64>("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LoyaltyError::UserNotFound(user_id))?;

        let new_balance = balance + amount;

        sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
            .bind(user_id)
            .bind(new_balance)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(FinalizeOutcome::Finalized {
            user_id,
            balance: new_balance,
        })
    }

    // ==================== 提现 ====================

    async fn process_withdrawal(&self, withdrawal: &NewWithdrawal) -> Result<Withdrawal> {
        let mut tx = self.pool.begin().await?;

        let balance = sqlx::query_scalar::<_, f64>("SELECT balance FROM users WHERE id = $1 FOR UPDATE")
            .bind(withdrawal.user_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LoyaltyError::UserNotFound(withdrawal.user_id))?;

        if balance < withdrawal.amount {
            tx.rollback().await?;
            return Err(LoyaltyError::NotEnoughFunds);
        }

        let record = sqlx::query_as::<_, Withdrawal>(
            r#"
            INSERT INTO withdrawals (user_id, order_number, amount)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, order_number, amount, processed_at
            "#,
        )
        .bind(withdrawal.user_id)
        .bind(&withdrawal.order_number)
        .bind(withdrawal.amount)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET balance = $2 WHERE id = $1")
            .bind(withdrawal.user_id)
            .bind(balance - withdrawal.amount)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(record)
    }

    async fn get_withdrawals_sum_by_user_id(&self, user_id: i64) -> Result<f64> {
        let sum: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::DOUBLE PRECISION FROM withdrawals WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum)
    }

    async fn get_withdrawals_by_user_id(&self, user_id: i64) -> Result<Vec<Withdrawal>> {
        let withdrawals = sqlx::query_as::<_, Withdrawal>(
            r#"
            SELECT id, user_id, order_number, amount, processed_at
            FROM withdrawals
            WHERE user_id = $1
            ORDER BY processed_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(withdrawals)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
