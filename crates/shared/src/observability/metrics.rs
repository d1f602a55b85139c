//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫
pub struct MetricsHandle {
    _server_handle: tokio::task::JoinHandle<()>,
}

/// 初始化 Prometheus 指标导出
///
/// 启动一个独立的 HTTP 服务器在指定端口暴露 `/metrics` 端点。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let server_handle = start_metrics_server(addr, handle).await?;

    Ok(MetricsHandle {
        _server_handle: server_handle,
    })
}

/// 注册指标描述，出现在 /metrics 的 HELP 注释中
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!("http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds"
    );

    metrics::describe_counter!(
        "accrual_requests_total",
        "Calls to the accrual system by outcome"
    );
    metrics::describe_histogram!(
        "accrual_request_duration_seconds",
        "Accrual system call duration in seconds, retries included"
    );

    metrics::describe_counter!(
        "order_transitions_total",
        "Order status changes applied by reconciliation"
    );
    metrics::describe_counter!(
        "accrual_credited_total",
        "Loyalty points credited to user balances"
    );

    metrics::describe_counter!("reconcile_batches_total", "Reconciliation passes run");
    metrics::describe_histogram!(
        "reconcile_batch_size",
        "Pending orders dispatched per reconciliation pass"
    );
    metrics::describe_counter!(
        "reconcile_worker_failures_total",
        "Orders whose reconciliation failed"
    );

    metrics::describe_counter!("withdrawals_total", "Withdrawal attempts by outcome");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 启动指标 HTTP 服务器
async fn start_metrics_server(
    addr: SocketAddr,
    handle: PrometheusHandle,
) -> Result<tokio::task::JoinHandle<()>> {
    let app = Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }));

    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(server_handle)
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录 HTTP 请求
#[inline]
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status_str = status.to_string();
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str.clone()
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status_str
    )
    .record(duration_secs);
}

/// 记录对积分计算系统的一次查询（含重试）
#[inline]
pub fn record_accrual_request(outcome: &str, duration_secs: f64) {
    metrics::counter!("accrual_requests_total", "outcome" => outcome.to_string()).increment(1);
    metrics::histogram!("accrual_request_duration_seconds", "outcome" => outcome.to_string())
        .record(duration_secs);
}

/// 记录订单状态变更
#[inline]
pub fn record_order_transition(status: &str) {
    metrics::counter!("order_transitions_total", "status" => status.to_string()).increment(1);
}

/// 记录入账积分
#[inline]
pub fn record_accrual_credited(amount: f64) {
    // counter 只接受整数，按分（0.01）记录
    let cents = (amount * 100.0).round();
    if cents > 0.0 {
        metrics::counter!("accrual_credited_total").increment(cents as u64);
    }
}

/// 记录一轮对账
#[inline]
pub fn record_reconcile_batch(dispatched: usize, failed: usize) {
    metrics::counter!("reconcile_batches_total").increment(1);
    metrics::histogram!("reconcile_batch_size").record(dispatched as f64);
    if failed > 0 {
        metrics::counter!("reconcile_worker_failures_total").increment(failed as u64);
    }
}

/// 记录提现结果
#[inline]
pub fn record_withdrawal(outcome: &str) {
    metrics::counter!("withdrawals_total", "outcome" => outcome.to_string()).increment(1);
}
