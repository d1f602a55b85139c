//! 计算系统客户端错误类型

use thiserror::Error;

/// 计算系统客户端错误
#[derive(Debug, Error)]
pub enum AccrualError {
    /// 计算系统中没有该订单（204），订单保持待处理
    #[error("计算系统未登记订单: {0}")]
    NoSuchOrder(String),

    /// 限流重试次数耗尽，下一轮对账会重新处理
    #[error("计算系统持续限流，已请求 {attempts} 次")]
    TooManyRetrials { attempts: u32 },

    /// 单次请求被限流（429），仅在客户端内部用于重试判断
    #[error("计算系统限流")]
    RateLimited { retry_after: Option<u64> },

    #[error("计算系统返回异常状态码: {0}")]
    InvalidResponseCode(u16),

    #[error("请求计算系统失败: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("计算系统响应无法解析: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AccrualError {
    /// 错误码，用于日志和指标标签
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoSuchOrder(_) => "no_such_order",
            Self::TooManyRetrials { .. } => "too_many_retrials",
            Self::RateLimited { .. } => "rate_limited",
            Self::InvalidResponseCode(_) => "invalid_response_code",
            Self::Transport(_) => "transport",
            Self::Decode(_) => "decode",
        }
    }

    /// 是否为暂时性错误（订单保持待处理，稍后重试即可）
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoSuchOrder(_) | Self::TooManyRetrials { .. } | Self::RateLimited { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_transience() {
        let cases: Vec<(AccrualError, &str, bool)> = vec![
            (AccrualError::NoSuchOrder("1".into()), "no_such_order", true),
            (AccrualError::TooManyRetrials { attempts: 3 }, "too_many_retrials", true),
            (AccrualError::RateLimited { retry_after: Some(60) }, "rate_limited", true),
            (AccrualError::InvalidResponseCode(500), "invalid_response_code", false),
        ];

        for (err, code, transient) in cases {
            assert_eq!(err.code(), code, "错误码不匹配: {:?}", err);
            assert_eq!(err.is_transient(), transient, "暂时性判断不匹配: {:?}", err);
        }
    }

    #[test]
    fn test_display_contains_context() {
        assert!(AccrualError::NoSuchOrder("123456789007".into())
            .to_string()
            .contains("123456789007"));
        assert!(AccrualError::InvalidResponseCode(503).to_string().contains("503"));
        assert!(AccrualError::TooManyRetrials { attempts: 3 }
            .to_string()
            .contains('3'));
    }
}
