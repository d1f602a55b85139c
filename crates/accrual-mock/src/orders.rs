//! 模拟订单簿
//!
//! 每次查询把订单向前推进一步：首次查询登记为 REGISTERED，
//! 第二次进入 PROCESSING，第三次按配置的比例随机落到 INVALID 或 PROCESSED。
//! 终态之后结果保持不变。

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

/// 计算系统中的订单状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MockStatus {
    Registered,
    Processing,
    Invalid,
    Processed,
}

impl MockStatus {
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Invalid | Self::Processed)
    }
}

/// 查询响应体
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MockOrder {
    pub order: String,
    pub status: MockStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<f64>,
}

/// 订单簿配置
#[derive(Debug, Clone)]
pub struct OrderBookConfig {
    /// 订单最终被判定为 INVALID 的概率
    pub invalid_ratio: f64,
    /// 单笔订单积分上限
    pub max_accrual: f64,
    /// 随机种子，固定后结果可复现
    pub seed: Option<u64>,
}

impl Default for OrderBookConfig {
    fn default() -> Self {
        Self {
            invalid_ratio: 0.2,
            max_accrual: 1000.0,
            seed: None,
        }
    }
}

/// 内存订单簿，DashMap 保证同一订单号的推进互斥
pub struct OrderBook {
    orders: DashMap<String, MockOrder>,
    rng: Mutex<StdRng>,
    invalid_ratio: f64,
    max_accrual: f64,
}

impl OrderBook {
    /// 创建订单簿
    ///
    /// `invalid_ratio` 必须在 [0, 1] 内，`max_accrual` 必须是非负有限值。
    pub fn new(config: OrderBookConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            (0.0..=1.0).contains(&config.invalid_ratio),
            "invalid_ratio 必须在 0 到 1 之间: {}",
            config.invalid_ratio
        );
        anyhow::ensure!(
            config.max_accrual.is_finite() && config.max_accrual >= 0.0,
            "max_accrual 必须是非负有限值: {}",
            config.max_accrual
        );

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(Self {
            orders: DashMap::new(),
            rng: Mutex::new(rng),
            invalid_ratio: config.invalid_ratio,
            max_accrual: config.max_accrual,
        })
    }

    /// 查询订单并推进一步，返回推进后的结果
    pub fn query(&self, number: &str) -> MockOrder {
        match self.orders.entry(number.to_string()) {
            Entry::Vacant(vacant) => {
                let order = MockOrder {
                    order: number.to_string(),
                    status: MockStatus::Registered,
                    accrual: None,
                };
                vacant.insert(order.clone());
                order
            }
            Entry::Occupied(mut occupied) => {
                let order = occupied.get_mut();
                self.advance(order);
                order.clone()
            }
        }
    }

    fn advance(&self, order: &mut MockOrder) {
        match order.status {
            MockStatus::Registered => order.status = MockStatus::Processing,
            MockStatus::Processing => {
                let mut rng = self.rng.lock();
                if rng.random_bool(self.invalid_ratio) {
                    order.status = MockStatus::Invalid;
                } else {
                    let amount: f64 = rng.random_range(0.0..=self.max_accrual);
                    order.status = MockStatus::Processed;
                    order.accrual = Some((amount * 100.0).round() / 100.0);
                }
            }
            MockStatus::Invalid | MockStatus::Processed => {}
        }
    }

    /// 已登记的订单数
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}
