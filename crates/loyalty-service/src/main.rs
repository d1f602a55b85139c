//! 积分累计服务（gophermart）
//!
//! 提供用户注册、订单上传、余额与提现 REST API，
//! 后台 worker 周期性向积分计算系统对账未完结订单。

use std::sync::Arc;

use clap::Parser;
use loyalty_service::{
    LoyaltyService, ReconciliationEngine,
    accrual::HttpAccrualClient,
    auth::{JwtManager, PasswordHasher},
    repository::PgStore,
    routes,
    state::AppState,
    validation::OrderNumberValidator,
    worker::AccrualWorker,
};
use loyalty_shared::{
    config::{AppConfig, CliOverrides},
    database::Database,
    observability,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// 命令行参数，同名环境变量优先
#[derive(Debug, Parser)]
#[command(name = "gophermart", about = "积分累计服务")]
struct Args {
    /// 服务监听地址（host:port），环境变量 RUN_ADDRESS
    #[arg(short = 'a', long = "run-address")]
    run_address: Option<String>,

    /// 数据库连接串，环境变量 DATABASE_URI
    #[arg(short = 'd', long = "database-uri")]
    database_uri: Option<String>,

    /// 积分计算系统地址，环境变量 ACCRUAL_SYSTEM_ADDRESS
    #[arg(short = 'r', long = "accrual-address")]
    accrual_address: Option<String>,
}

impl From<Args> for CliOverrides {
    fn from(args: Args) -> Self {
        Self {
            run_address: args.run_address,
            database_uri: args.database_uri,
            accrual_address: args.accrual_address,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 配置优先级：约定环境变量 > 命令行参数 > LOYALTY_ 环境变量 > 配置文件
    let mut config = AppConfig::load("loyalty-service")?;
    config.apply_overrides(&args.into());
    config.validate()?;

    let obs_config = config.observability.clone().with_service_name(&config.service_name);
    let _guard = observability::init(&obs_config).await?;

    if config.auth.jwt_secret == loyalty_shared::config::DEFAULT_JWT_SECRET {
        warn!("Using default JWT secret - set SECRET_KEY for production");
    }

    info!("Starting gophermart on {}", config.server_addr());

    // 初始化基础设施
    let db = Database::connect(&config.database).await?;
    db.run_migrations().await?;

    let store = Arc::new(PgStore::new(db.pool().clone()));
    let client = Arc::new(HttpAccrualClient::new(&config.accrual)?);
    info!(accrual = %config.accrual.base_url(), "Accrual client initialized");

    let engine = ReconciliationEngine::new(store.clone(), client, &config.reconcile);
    let service = Arc::new(LoyaltyService::new(
        store,
        engine,
        JwtManager::new((&config.auth).into()),
        PasswordHasher::new(config.auth.bcrypt_cost),
        OrderNumberValidator::default(),
    ));

    // 启动对账 Worker，关闭信号到达后在当前批次的订单间隙退出
    let cancel = CancellationToken::new();
    let worker = AccrualWorker::new(
        service.engine().clone(),
        config.reconcile.poll_interval(),
        cancel.clone(),
    );
    let worker_handle = tokio::spawn(async move {
        worker.run().await;
    });

    let app = routes::build_router(AppState::new(service));

    let listener = TcpListener::bind(config.server_addr()).await?;
    info!("Listening on {}", config.server_addr());

    // 优雅关闭：停止接收新连接并等待已有请求处理完毕，同时通知 Worker 退出
    let shutdown_token = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown_token.cancel();
        })
        .await?;

    cancel.cancel();
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "Accrual worker terminated abnormally");
    }

    db.close().await;
    info!("Server shutdown complete");

    Ok(())
}

/// 监听关闭信号
///
/// SIGTERM 或 Ctrl+C 任一到达后返回，触发 axum 的优雅关闭流程。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "注册 Ctrl+C 处理器失败");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "注册 SIGTERM 处理器失败");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, initiating graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}
