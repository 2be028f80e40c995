// 上游接口响应体，以及实时价格 / 历史价格的输出结构
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// CoinGecko /coins/{id}/market_chart 响应，数组元素为 [毫秒时间戳, 数值]
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MarketChartResponse {
    #[serde(default)]
    pub prices: Vec<(f64, f64)>,
    #[serde(default)]
    pub total_volumes: Vec<(f64, f64)>,
}

/// CoinGecko /simple/price 中单个币种的报价
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SimplePriceQuote {
    pub usd: Option<f64>,
    pub usd_24h_change: Option<f64>,
    pub cny: Option<f64>,
    pub cny_24h_change: Option<f64>,
}

pub type SimplePriceResponse = HashMap<String, SimplePriceQuote>;

/// exchangerate-api.com /v4/latest/USD 响应
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExchangeRateResponse {
    #[serde(default)]
    pub rates: HashMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    #[serde(with = "rust_decimal::serde::float")]
    pub usd: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub usd_change_24h: Option<Decimal>,
    #[serde(with = "rust_decimal::serde::float")]
    pub cny: Decimal,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub cny_change_24h: Option<Decimal>,
}

/// eth-btc-price.json：按币种符号展开，外加更新时间
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    #[serde(flatten)]
    pub coins: BTreeMap<String, CoinQuote>,
    pub last_updated: DateTime<Utc>,
}

impl PriceSnapshot {
    pub const FILE_NAME: &'static str = "eth-btc-price.json";
}

/// <symbol>-history.json 中的一天
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub date: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub usd: Decimal,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub cny: Option<Decimal>,
}
