//! 计算系统 HTTP 客户端
//!
//! `GET {base}/api/orders/{number}`：
//! - 200 返回 `{order, status, accrual?}`
//! - 204 订单未登记
//! - 429 限流，按固定窗口重试，次数与累计等待时间均有上限
//! - 其他状态码直接报错，不重试

use std::time::{Duration, Instant};

use async_trait::async_trait;
use loyalty_shared::config::AccrualConfig;
use loyalty_shared::observability::metrics;
use loyalty_shared::retry::{RetryError, RetryPolicy, retry_with_policy};
use reqwest::StatusCode;
use reqwest::header::RETRY_AFTER;
use serde::Deserialize;
use tracing::{debug, instrument};

use super::AccrualError;

/// 计算系统返回的订单状态
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum AccrualStatus {
    /// 已登记，尚未开始计算
    Registered,
    Processing,
    Invalid,
    Processed,
    /// 协议之外的状态值，保留原文便于排查
    Unknown(String),
}

impl From<String> for AccrualStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "REGISTERED" => Self::Registered,
            "PROCESSING" => Self::Processing,
            "INVALID" => Self::Invalid,
            "PROCESSED" => Self::Processed,
            _ => Self::Unknown(value),
        }
    }
}

/// 计算系统响应体
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccrualResponse {
    pub order: String,
    pub status: AccrualStatus,
    #[serde(default)]
    pub accrual: Option<f64>,
}

/// 计算系统客户端接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccrualClient: Send + Sync {
    /// 查询订单的积分计算结果
    async fn get_order_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError>;
}

/// 基于 reqwest 的计算系统客户端
pub struct HttpAccrualClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl HttpAccrualClient {
    pub fn new(config: &AccrualConfig) -> Result<Self, AccrualError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        let retry = RetryPolicy::fixed_window(
            config.max_attempts,
            Duration::from_millis(config.retry_wait_ms),
            Duration::from_millis(config.max_total_wait_ms),
        );

        Ok(Self {
            http,
            base_url: config.base_url(),
            retry,
        })
    }

    /// 发起一次请求，不做重试
    async fn fetch_once(&self, order_number: &str) -> Result<AccrualResponse, AccrualError> {
        let url = format!("{}/api/orders/{}", self.base_url, order_number);
        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().await?;
                Ok(serde_json::from_slice(&body)?)
            }
            StatusCode::NO_CONTENT => Err(AccrualError::NoSuchOrder(order_number.to_string())),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse().ok());
                Err(AccrualError::RateLimited { retry_after })
            }
            other => Err(AccrualError::InvalidResponseCode(other.as_u16())),
        }
    }
}

#[async_trait]
impl AccrualClient for HttpAccrualClient {
    #[instrument(skip(self))]
    async fn get_order_accrual(&self, order_number: &str) -> Result<AccrualResponse, AccrualError> {
        let start = Instant::now();

        let result = retry_with_policy(
            &self.retry,
            "accrual.get_order",
            |e: &AccrualError| matches!(e, AccrualError::RateLimited { .. }),
            || self.fetch_once(order_number),
        )
        .await
        .map_err(|e| match e {
            RetryError::Exhausted { attempts, .. } => AccrualError::TooManyRetrials { attempts },
            RetryError::Permanent(e) => e,
        });

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.code(),
        };
        metrics::record_accrual_request(outcome, start.elapsed().as_secs_f64());
        debug!(outcome, "Accrual lookup finished");

        result
    }
}
