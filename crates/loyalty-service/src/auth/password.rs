//! 密码处理
//!
//! 提供密码哈希和验证功能

use crate::error::LoyaltyError;

/// bcrypt 密码哈希器
///
/// 计算成本由配置决定，测试中使用最低成本以加快速度
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// 对密码进行哈希处理
    pub fn hash(&self, password: &str) -> Result<String, LoyaltyError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| LoyaltyError::Internal(format!("密码哈希失败: {}", e)))
    }

    /// 比较明文密码与存储的哈希值
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, LoyaltyError> {
        bcrypt::verify(password, hash)
            .map_err(|e| LoyaltyError::Internal(format!("密码验证失败: {}", e)))
    }
}
