//! 重试策略与执行器
//!
//! 提供带退避的重试机制，用于瞬时故障（对端限流、数据库连接池满等）的自动恢复。
//! 哪些错误值得重试由调用方通过 `is_retryable` 闭包决定。

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

// ---------------------------------------------------------------------------
// RetryPolicy: 重试策略配置
// ---------------------------------------------------------------------------

/// 重试策略配置
///
/// `multiplier` 为 1.0 时每次等待固定窗口；大于 1.0 时为指数退避。
/// `max_total_delay` 限制所有重试累计的等待时间，超出后不再重试。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次执行）
    pub max_retries: u32,
    /// 首次重试前的等待时间
    pub initial_delay: Duration,
    /// 单次等待上限
    pub max_delay: Duration,
    /// 每次重试的退避倍数
    pub multiplier: f64,
    /// 累计等待上限
    pub max_total_delay: Duration,
}

impl Default for RetryPolicy {
    /// 默认策略：最多重试 3 次，初始等待 1 秒，最大等待 30 秒，倍数 2.0
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            max_total_delay: Duration::MAX,
        }
    }
}

impl RetryPolicy {
    /// 固定窗口策略：总共最多执行 `max_attempts` 次，每次重试前等待 `wait`
    pub fn fixed_window(max_attempts: u32, wait: Duration, max_total_delay: Duration) -> Self {
        Self {
            max_retries: max_attempts.saturating_sub(1),
            initial_delay: wait,
            max_delay: wait,
            multiplier: 1.0,
            max_total_delay,
        }
    }

    /// 计算第 N 次重试的等待时间（attempt 从 0 开始）
    ///
    /// 公式: initial_delay * multiplier^attempt，结果不超过 max_delay。
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.initial_delay.as_millis() as f64;
        let delay_ms = base_ms * self.multiplier.powi(attempt as i32);
        let capped_ms = delay_ms.min(self.max_delay.as_millis() as f64);
        Duration::from_millis(capped_ms as u64)
    }

    /// 是否应继续重试
    ///
    /// attempt 表示已经失败的次数，当 attempt < max_retries 时返回 true。
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

// ---------------------------------------------------------------------------
// retry_with_policy: 带重试的异步执行器
// ---------------------------------------------------------------------------

/// 重试执行结果
#[derive(Debug)]
pub enum RetryError<E> {
    /// 不可重试的错误，原样返回
    Permanent(E),
    /// 重试次数或累计等待时间用尽，携带最后一次错误和总执行次数
    Exhausted { last: E, attempts: u32 },
}

/// 带重试的异步执行器
///
/// 对任意异步操作应用重试策略。仅在操作返回可重试错误时才重试，
/// 其余错误以 `RetryError::Permanent` 直接向上传播。
pub async fn retry_with_policy<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    is_retryable: impl Fn(&E) -> bool,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt: u32 = 0;
    let mut waited = Duration::ZERO;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    info!(operation = operation_name, attempt, "操作在重试后成功");
                }
                return Ok(value);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    return Err(RetryError::Permanent(err));
                }

                let delay = policy.delay_for_attempt(attempt);
                let over_budget = waited.saturating_add(delay) > policy.max_total_delay;

                if !policy.should_retry(attempt) || over_budget {
                    warn!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        waited_ms = waited.as_millis() as u64,
                        error = %err,
                        "已达最大重试次数，放弃重试"
                    );
                    return Err(RetryError::Exhausted {
                        last: err,
                        attempts: attempt + 1,
                    });
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "操作失败，将在等待后重试"
                );

                tokio::time::sleep(delay).await;
                waited += delay;
                attempt += 1;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// 单元测试
// ---------------------------------------------------------------------------
