//! PostgreSQL 连接池
//!
//! 启动时建立连接池并执行内嵌迁移（仓库根目录 `migrations/`），
//! 迁移记录在 `_sqlx_migrations` 表中，重复启动不会重复执行。

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, instrument};

use crate::config::DatabaseConfig;
use crate::error::{InfraError, Result};

/// 数据库连接池包装
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 解析连接串并建立连接池
    ///
    /// 连接串格式错误时返回 `InvalidConfig`，不会尝试连接。
    #[instrument(skip(config))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = PgConnectOptions::from_str(&config.url).map_err(|e| {
            InfraError::InvalidConfig {
                field: "database.url".to_string(),
                message: e.to_string(),
            }
        })?;

        info!(
            host = options.get_host(),
            database = options.get_database().unwrap_or_default(),
            max_connections = config.max_connections,
            "Connecting to database..."
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 执行内嵌迁移
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        info!("Database migrations applied");
        Ok(())
    }

    /// 等待已借出的连接归还后关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database connection pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_malformed_url_rejected_before_connecting() {
        let config = DatabaseConfig {
            url: "not a url".to_string(),
            ..DatabaseConfig::default()
        };

        let err = Database::connect(&config).await.err().unwrap();
        assert_eq!(err.code(), "INVALID_CONFIG");
    }

    #[tokio::test]
    #[ignore] // 需要数据库连接：DATABASE_URL=postgres://... cargo test -- --ignored
    async fn test_connect_and_migrate() {
        let config = DatabaseConfig {
            url: std::env::var("DATABASE_URL").unwrap_or_else(|_| DatabaseConfig::default().url),
            ..DatabaseConfig::default()
        };
        let db = Database::connect(&config).await.unwrap();
        db.run_migrations().await.unwrap();
        // 第二次迁移不应报错
        db.run_migrations().await.unwrap();
        sqlx::query("SELECT 1").execute(db.pool()).await.unwrap();
        db.close().await;
    }
}
