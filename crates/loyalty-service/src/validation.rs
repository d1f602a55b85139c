//! 订单号校验
//!
//! 订单号为纯数字字符串，需通过 Luhn 校验。

use crate::error::LoyaltyError;

/// 订单号校验器
#[derive(Debug, Clone, Copy)]
pub struct OrderNumberValidator {
    max_len: usize,
}

impl Default for OrderNumberValidator {
    fn default() -> Self {
        Self { max_len: 64 }
    }
}

impl OrderNumberValidator {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    /// 是否为合法订单号
    pub fn is_valid(&self, number: &str) -> bool {
        if number.is_empty() || number.len() > self.max_len {
            return false;
        }
        if !number.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        let sum: u32 = number
            .bytes()
            .rev()
            .enumerate()
            .map(|(i, b)| {
                let digit = u32::from(b - b'0');
                if i % 2 == 1 {
                    let doubled = digit * 2;
                    if doubled > 9 { doubled - 9 } else { doubled }
                } else {
                    digit
                }
            })
            .sum();

        sum % 10 == 0
    }

    /// 校验订单号，失败返回 `InvalidOrderNumber`
    pub fn validate(&self, number: &str) -> Result<(), LoyaltyError> {
        if self.is_valid(number) {
            Ok(())
        } else {
            Err(LoyaltyError::InvalidOrderNumber(number.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luhn_numbers() {
        let validator = OrderNumberValidator::default();
        let cases = [
            ("79927398713", true),
            ("123456789049", true),
            ("123456789007", true),
            ("4561261212345467", true),
            ("2377225624", true),
            ("0", true),
            ("12345678902", false),
            ("79927398710", false),
            ("", false),
            ("1234a", false),
            (" 18", false),
            ("-18", false),
        ];

        for (number, expected) in cases {
            assert_eq!(validator.is_valid(number), expected, "订单号校验结果不符: {number:?}");
        }
    }

    #[test]
    fn test_length_limit() {
        let validator = OrderNumberValidator::new(4);
        assert!(validator.is_valid("18"));
        assert!(!validator.is_valid("2377225624"));
    }

    #[test]
    fn test_validate_error() {
        let err = OrderNumberValidator::default().validate("12345678902").unwrap_err();
        assert!(matches!(err, LoyaltyError::InvalidOrderNumber(ref n) if n == "12345678902"));
    }
}
