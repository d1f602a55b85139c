//! 积分计算系统模拟服务入口

use accrual_mock::{MockState, OrderBook, OrderBookConfig, RateLimiter, mock_routes};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "accrual-mock", about = "积分计算系统模拟服务")]
struct Cli {
    /// 监听地址
    #[arg(short = 'a', long, env = "ACCRUAL_MOCK_ADDRESS", default_value = "localhost:8081")]
    address: String,

    /// 每分钟最多处理的请求数，0 表示不限流
    #[arg(long, default_value_t = 0)]
    rate_limit: u32,

    /// 订单最终被判定为 INVALID 的概率
    #[arg(long, default_value_t = 0.2)]
    invalid_ratio: f64,

    /// 单笔订单积分上限
    #[arg(long, default_value_t = 1000.0)]
    max_accrual: f64,

    /// 随机种子，固定后结果可复现
    #[arg(long)]
    seed: Option<u64>,

    /// 日志级别
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 优先使用环境变量 RUST_LOG，否则使用命令行参数指定的级别
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .init();

    let book = OrderBook::new(OrderBookConfig {
        invalid_ratio: cli.invalid_ratio,
        max_accrual: cli.max_accrual,
        seed: cli.seed,
    })?;
    let limiter = (cli.rate_limit > 0).then(|| RateLimiter::per_minute(cli.rate_limit));

    let app = mock_routes(MockState::new(book, limiter));

    let listener = TcpListener::bind(&cli.address).await?;
    info!(
        address = %cli.address,
        rate_limit = cli.rate_limit,
        "Accrual mock listening"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
