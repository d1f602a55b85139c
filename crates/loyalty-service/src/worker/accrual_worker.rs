//! 积分对账轮询 Worker
//!
//! 以固定间隔触发一轮待处理订单对账，直到收到取消信号。
//! 上一轮结束后才会开始下一轮，轮次之间不会重叠。

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::service::ReconciliationEngine;

/// 对账轮询 Worker
pub struct AccrualWorker {
    engine: ReconciliationEngine,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl AccrualWorker {
    /// 创建 AccrualWorker 实例
    ///
    /// # 参数
    /// - `engine`: 对账引擎
    /// - `poll_interval`: 轮询间隔
    /// - `cancel`: 进程级取消信号，同时传递给引擎内的 worker
    pub fn new(engine: ReconciliationEngine, poll_interval: Duration, cancel: CancellationToken) -> Self {
        Self {
            engine,
            poll_interval,
            cancel,
        }
    }

    /// 主循环：持续轮询直到取消
    pub async fn run(&self) {
        info!(poll_interval = ?self.poll_interval, "AccrualWorker 已启动");

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => self.tick().await,
            }
        }

        info!("AccrualWorker 已停止");
    }

    async fn tick(&self) {
        match self.engine.update_pending_orders(&self.cancel).await {
            Ok(report) if report.dispatched > 0 || report.abandoned > 0 => {
                info!(
                    dispatched = report.dispatched,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    abandoned = report.abandoned,
                    cancelled = report.cancelled,
                    "对账轮次完成"
                );
            }
            Ok(_) => debug!("没有待处理订单"),
            Err(e) => error!(error = %e, "获取待处理订单失败"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accrual::{AccrualResponse, AccrualStatus, MockAccrualClient};
    use crate::models::OrderStatus;
    use crate::repository::{LoyaltyStore, MemoryStore};
    use loyalty_shared::config::ReconcileConfig;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_worker_processes_orders_and_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        let user = store.add_user("alice", "hash").await.unwrap().id;
        store.upload_order(user, "79927398713").await.unwrap();

        let mut client = MockAccrualClient::new();
        client.expect_get_order_accrual().returning(|n| {
            Ok(AccrualResponse {
                order: n.to_string(),
                status: AccrualStatus::Processed,
                accrual: Some(42.0),
            })
        });

        let engine = ReconciliationEngine::new(store.clone(), Arc::new(client), &ReconcileConfig::default());
        let cancel = CancellationToken::new();
        let worker = AccrualWorker::new(engine, Duration::from_millis(10), cancel.clone());
        let handle = tokio::spawn(async move { worker.run().await });

        let mut processed = false;
        for _ in 0..100 {
            let order = store.get_order_by_number("79927398713").await.unwrap().unwrap();
            if order.status == OrderStatus::Processed {
                processed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(processed, "订单应在轮询中被处理");
        assert_eq!(store.get_user_by_id(user).await.unwrap().unwrap().balance, 42.0);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("worker 应在取消后退出")
            .unwrap();
    }
}
