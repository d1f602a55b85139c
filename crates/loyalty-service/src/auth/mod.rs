//! 认证模块
//!
//! 提供 JWT Token 生成、验证和密码哈希功能

mod jwt;
mod password;

pub use jwt::{Claims, JwtConfig, JwtManager};
pub use password::PasswordHasher;
