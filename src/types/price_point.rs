// Coin, DualPrice, PricePoint, PriceSeries
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 需要追踪的币种：CoinGecko 资产ID + 输出文件中使用的符号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub id: String,
    pub symbol: String,
}

impl Coin {
    pub fn new(id: &str, symbol: &str) -> Self {
        Self {
            id: id.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// 同一价格的美元/人民币表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DualPrice {
    #[serde(with = "rust_decimal::serde::float")]
    pub usd: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub cny: Decimal,
}

impl DualPrice {
    pub fn new(usd: Decimal, cny: Decimal) -> Self {
        Self { usd, cny }
    }

    pub fn zero() -> Self {
        Self::default()
    }
}

/// 图表上的一个采样点，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// 秒级时间戳
    pub timestamp: i64,
    /// 北京时间，格式 YYYY/MM/DD HH:MM:SS
    pub datetime: String,
    pub price: DualPrice,
    pub volume: u64,
}

/// 按时间先后排列的价格序列
pub type PriceSeries = Vec<PricePoint>;
