//! 可观测性
//!
//! - `tracing`: 结构化日志（文本或 JSON）
//! - `metrics`: Prometheus 指标，独立端口暴露 `/metrics`
//! - `middleware`: HTTP 请求追踪与 request id

pub mod metrics;
pub mod middleware;
pub mod tracing;

use ::tracing::info;
use anyhow::Result;
use serde::Deserialize;

/// 可观测性配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 服务名称，用于标识日志和指标的来源
    pub service_name: String,

    /// Prometheus 指标导出端口，为 0 时不启动指标服务器
    pub metrics_port: u16,

    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,

    /// 是否启用 JSON 格式日志
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: "loyalty-service".to_string(),
            metrics_port: 9090,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl ObservabilityConfig {
    /// 以调用方的服务名覆盖配置中的服务名
    pub fn with_service_name(mut self, service_name: &str) -> Self {
        self.service_name = service_name.to_string();
        self
    }

    fn metrics_enabled(&self) -> bool {
        self.metrics_port != 0
    }
}

/// 可观测性资源守卫
///
/// 持有指标服务器任务，需在 `main` 中保持存活直到进程退出。
pub struct ObservabilityGuard {
    _metrics_handle: Option<metrics::MetricsHandle>,
}

impl Drop for ObservabilityGuard {
    fn drop(&mut self) {
        info!("Shutting down observability...");
    }
}

/// 初始化日志与 Prometheus 指标
///
/// `metrics_port` 为 0 时只初始化日志。
pub async fn init(config: &ObservabilityConfig) -> Result<ObservabilityGuard> {
    tracing::init(config)?;

    let metrics_handle = if config.metrics_enabled() {
        Some(metrics::init(config).await?)
    } else {
        None
    };

    info!(
        service = %config.service_name,
        metrics_port = config.metrics_port,
        json_logs = config.json_logs,
        "Observability initialized"
    );

    Ok(ObservabilityGuard {
        _metrics_handle: metrics_handle,
    })
}
