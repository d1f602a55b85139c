//! 固定窗口限流
//!
//! 每个窗口内最多放行 `limit` 个请求，超出后返回距窗口结束的剩余时间，
//! 用作 `Retry-After` 响应头。

use std::time::{Duration, Instant};

use parking_lot::Mutex;

struct Window {
    started: Instant,
    count: u32,
}

/// 固定窗口限流器
pub struct RateLimiter {
    limit: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    /// 每分钟 `limit` 个请求
    pub fn per_minute(limit: u32) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// 尝试占用一个名额，超限时返回需要等待的时间
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut state = self.state.lock();
        let now = Instant::now();

        let elapsed = now.duration_since(state.started);
        if elapsed >= self.window {
            state.started = now;
            state.count = 0;
        }

        if state.count < self.limit {
            state.count += 1;
            Ok(())
        } else {
            Err(self.window.saturating_sub(now.duration_since(state.started)))
        }
    }
}
