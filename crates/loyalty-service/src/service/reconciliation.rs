//! 待处理订单对账引擎
//!
//! 周期性地把所有 NEW / PROCESSING 订单送入固定大小的 worker 池，逐个向计算系统查询并落库：
//!
//! | 计算系统状态 | 本地动作 |
//! |---|---|
//! | INVALID | 置为 INVALID |
//! | REGISTERED / PROCESSING | 置为 PROCESSING |
//! | PROCESSED | 单事务置为 PROCESSED 并把积分加到用户余额 |
//! | 其他 | 返回 `UnknownAccrualStatus` |
//!
//! 单个订单失败不会影响进程，worker 按配置的策略放弃本轮或跳过该订单。

use std::sync::Arc;

use loyalty_shared::config::{ReconcileConfig, WorkerErrorPolicy};
use loyalty_shared::observability::metrics;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::accrual::{AccrualClient, AccrualStatus};
use crate::error::{LoyaltyError, Result};
use crate::models::{FinalizeOutcome, OrderStatus};
use crate::repository::LoyaltyStore;

/// 单个订单的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OrderUpdate {
    /// 订单被计算系统拒绝
    Invalidated,
    /// 计算系统仍在处理
    Processing,
    /// 订单完成并入账
    Credited { amount: f64 },
    /// 订单已是终态，未做修改
    Unchanged,
}

/// 一轮对账的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// 已交给 worker 处理的订单数
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 因 worker 放弃或取消而未处理的订单数
    pub abandoned: usize,
    /// 本轮是否被取消打断
    pub cancelled: bool,
}

#[derive(Debug, Default)]
struct WorkerStats {
    succeeded: usize,
    failed: usize,
}

/// 对账引擎
#[derive(Clone)]
pub struct ReconciliationEngine {
    store: Arc<dyn LoyaltyStore>,
    client: Arc<dyn AccrualClient>,
    workers: usize,
    on_error: WorkerErrorPolicy,
}

impl ReconciliationEngine {
    pub fn new(
        store: Arc<dyn LoyaltyStore>,
        client: Arc<dyn AccrualClient>,
        config: &ReconcileConfig,
    ) -> Self {
        Self {
            store,
            client,
            workers: config.workers.max(1),
            on_error: config.on_worker_error,
        }
    }

    /// 查询单个订单并应用状态变更
    ///
    /// 计算系统的错误原样向上返回，不在这里重试。
    #[instrument(skip(self))]
    pub async fn update_order_accrual(&self, order_number: &str) -> Result<OrderUpdate> {
        let response = self.client.get_order_accrual(order_number).await?;

        let update = match response.status {
            AccrualStatus::Invalid => {
                if self.transition(order_number, OrderStatus::Invalid).await? {
                    OrderUpdate::Invalidated
                } else {
                    OrderUpdate::Unchanged
                }
            }
            AccrualStatus::Registered | AccrualStatus::Processing => {
                if self.transition(order_number, OrderStatus::Processing).await? {
                    OrderUpdate::Processing
                } else {
                    OrderUpdate::Unchanged
                }
            }
            AccrualStatus::Processed => {
                let amount = response.accrual.unwrap_or(0.0);
                if !amount.is_finite() || amount < 0.0 {
                    return Err(LoyaltyError::InvalidAccrualAmount {
                        order: order_number.to_string(),
                        amount,
                    });
                }

                match self
                    .store
                    .finalize_order_and_update_balance(order_number, amount)
                    .await?
                {
                    FinalizeOutcome::Finalized { user_id, balance } => {
                        info!(user_id, amount, balance, "Order processed, balance credited");
                        metrics::record_order_transition(OrderStatus::Processed.as_str());
                        metrics::record_accrual_credited(amount);
                        OrderUpdate::Credited { amount }
                    }
                    FinalizeOutcome::AlreadyTerminal(status) => {
                        debug!(%status, "Order already terminal");
                        OrderUpdate::Unchanged
                    }
                }
            }
            AccrualStatus::Unknown(status) => {
                return Err(LoyaltyError::UnknownAccrualStatus(status));
            }
        };

        Ok(update)
    }

    /// 只改写待处理订单，返回是否有订单被更新
    async fn transition(&self, order_number: &str, status: OrderStatus) -> Result<bool> {
        let updated = self.store.set_order_status(order_number, status).await?;
        if updated {
            metrics::record_order_transition(status.as_str());
        }
        Ok(updated)
    }

    /// 处理所有待处理订单
    ///
    /// 订单号一次性放入预先按批次大小分配的通道后关闭通道，再启动固定数量的 worker。
    /// worker 在两个订单之间检查取消信号；正在进行的请求和事务会执行完毕。
    /// 列出订单失败时直接返回错误，单个订单失败只计入报告。
    pub async fn update_pending_orders(&self, cancel: &CancellationToken) -> Result<ReconcileReport> {
        let orders = self.store.get_pending_orders().await?;
        if orders.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let total = orders.len();
        let (tx, rx) = mpsc::channel::<String>(total);
        for number in orders {
            tx.try_send(number)
                .map_err(|e| LoyaltyError::Internal(format!("对账队列写入失败: {}", e)))?;
        }
        drop(tx);

        let rx = Arc::new(Mutex::new(rx));
        let mut workers = JoinSet::new();
        for worker_id in 0..self.workers.min(total) {
            let engine = self.clone();
            let rx = rx.clone();
            let cancel = cancel.clone();
            workers.spawn(async move { engine.run_worker(worker_id, rx, cancel).await });
        }

        let mut report = ReconcileReport::default();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(stats) => {
                    report.succeeded += stats.succeeded;
                    report.failed += stats.failed;
                }
                Err(e) => error!(error = %e, "Reconcile worker panicked"),
            }
        }

        // 所有 worker 退出后仍留在队列里的订单即为本轮放弃的订单
        let mut rx = rx.lock().await;
        while rx.try_recv().is_ok() {
            report.abandoned += 1;
        }
        report.dispatched = total - report.abandoned;
        report.cancelled = cancel.is_cancelled();

        metrics::record_reconcile_batch(report.dispatched, report.failed);

        Ok(report)
    }

    async fn run_worker(
        &self,
        worker_id: usize,
        rx: Arc<Mutex<mpsc::Receiver<String>>>,
        cancel: CancellationToken,
    ) -> WorkerStats {
        let mut stats = WorkerStats::default();

        loop {
            let next = {
                let mut rx = rx.lock().await;
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    number = rx.recv() => number,
                }
            };
            let Some(order_number) = next else {
                break;
            };

            match self.update_order_accrual(&order_number).await {
                Ok(update) => {
                    debug!(worker_id, order_number, ?update, "Order reconciled");
                    stats.succeeded += 1;
                }
                Err(e) => {
                    stats.failed += 1;
                    warn!(
                        worker_id,
                        order_number,
                        error = %e,
                        transient = e.is_transient(),
                        policy = ?self.on_error,
                        "Failed to update order accrual"
                    );
                    if self.on_error == WorkerErrorPolicy::Abandon {
                        break;
                    }
                }
            }
        }

        stats
    }
}
