//! JWT Token 处理
//!
//! 提供 JWT Token 的生成和验证功能

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use loyalty_shared::config::AuthConfig;
use serde::{Deserialize, Serialize};

use crate::error::LoyaltyError;

/// JWT 配置
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// 签名密钥
    pub secret: String,
    /// Token 有效期（小时）
    pub ttl_hours: i64,
    /// Token 签发者
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl_hours: config.token_ttl_hours,
            issuer: "gophermart".to_string(),
        }
    }
}

/// JWT Claims（Token 载荷）
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// 用户 ID
    pub sub: String,
    /// 签发时间
    pub iat: i64,
    /// 过期时间
    pub exp: i64,
    /// 签发者
    pub iss: String,
}

impl Claims {
    /// 解析用户 ID
    pub fn user_id(&self) -> Result<i64, LoyaltyError> {
        self.sub
            .parse()
            .map_err(|_| LoyaltyError::Unauthorized("无效的用户 ID".to_string()))
    }
}

/// JWT 管理器
#[derive(Clone)]
pub struct JwtManager {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl JwtManager {
    /// 创建 JWT 管理器
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 为用户生成 JWT Token（HS256）
    pub fn generate_token(&self, user_id: i64) -> Result<String, LoyaltyError> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.config.ttl_hours);

        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: self.config.issuer.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| LoyaltyError::Internal(format!("JWT 生成失败: {}", e)))
    }

    /// 验证并解析 JWT Token
    ///
    /// 返回解析后的 Claims，如果 Token 无效或过期则返回错误
    pub fn verify_token(&self, token: &str) -> Result<Claims, LoyaltyError> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(
            |e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    LoyaltyError::Unauthorized("Token 已过期".to_string())
                }
                jsonwebtoken::errors::ErrorKind::InvalidToken => {
                    LoyaltyError::Unauthorized("无效的 Token".to_string())
                }
                _ => LoyaltyError::Unauthorized(format!("Token 验证失败: {}", e)),
            },
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_and_verify_token() {
        let manager = JwtManager::new(JwtConfig::default());

        let token = manager.generate_token(42).unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.sub, "42");
        assert_eq!(claims.user_id().unwrap(), 42);
        assert_eq!(claims.iss, "gophermart");
    }

    #[test]
    fn test_invalid_token() {
        let manager = JwtManager::new(JwtConfig::default());
        assert!(manager.verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let issuer = JwtManager::new(JwtConfig {
            secret: "another-secret".to_string(),
            ..JwtConfig::default()
        });
        let verifier = JwtManager::new(JwtConfig::default());

        let token = issuer.generate_token(1).unwrap();
        assert!(matches!(
            verifier.verify_token(&token),
            Err(LoyaltyError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // 过期时间早于默认 60 秒的校验宽限
        let manager = JwtManager::new(JwtConfig {
            ttl_hours: -1,
            ..JwtConfig::default()
        });

        let token = manager.generate_token(1).unwrap();
        let err = manager.verify_token(&token).unwrap_err();
        assert!(err.to_string().contains("过期"));
    }
}
