// SummaryStats, CoinSeries, MergedChartDocument 以及旧版布局的 CoinChart / ChartDataBundle
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{DualPrice, Period, PeriodConfig, PriceSeries};

/// 采样序列的汇总统计，完全由序列推导
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub start_price: DualPrice,
    pub end_price: DualPrice,
    pub high_price: DualPrice,
    pub low_price: DualPrice,
    #[serde(with = "rust_decimal::serde::float")]
    pub change_percent: Decimal,
    pub total_volume: u64,
}

/// 单个币种在某个时间段内的数据与汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSeries {
    pub data: PriceSeries,
    pub summary: SummaryStats,
}

/// 每个时间段一个文件，按币种符号合并
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedChartDocument {
    pub period: Period,
    pub interval: String,
    pub data_type: String,
    pub coins: BTreeMap<String, CoinSeries>,
    pub last_updated: DateTime<Utc>,
}

impl MergedChartDocument {
    pub const DATA_TYPE: &'static str = "price";

    pub fn empty(config: &PeriodConfig) -> Self {
        Self {
            period: config.period,
            interval: config.interval_label.to_string(),
            data_type: Self::DATA_TYPE.to_string(),
            coins: BTreeMap::new(),
            last_updated: Utc::now(),
        }
    }

    /// 输出文件名，例如 chart-24h.json
    pub fn file_name(period: Period) -> String {
        format!("chart-{}.json", period)
    }

    /// 覆盖写入某个币种（后写者胜出）
    pub fn upsert(&mut self, symbol: &str, series: CoinSeries) {
        self.coins.insert(symbol.to_string(), series);
        self.last_updated = Utc::now();
    }
}

/// 旧版布局：单币种单时间段的图表数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinChart {
    pub coin: String,
    pub period: Period,
    pub interval: String,
    pub data: PriceSeries,
    pub summary: SummaryStats,
    pub last_updated: DateTime<Utc>,
}

impl CoinChart {
    /// 扁平缓存中的键，例如 eth_24h
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.coin, self.period)
    }

    pub fn file_name(&self) -> String {
        format!("charts/{}-{}.json", self.coin, self.period)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartQuery {
    pub coin: String,
    pub period: Period,
}

/// 旧版 chart-data.json：缓存数据加上查询说明
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartDataBundle {
    pub note: String,
    pub usage: String,
    pub available_queries: Vec<ChartQuery>,
    pub data: BTreeMap<String, CoinChart>,
    pub generated_at: DateTime<Utc>,
}

impl ChartDataBundle {
    pub const CACHE_FILE: &'static str = "chart-data-cache.json";
    pub const BUNDLE_FILE: &'static str = "chart-data.json";

    pub fn new(available_queries: Vec<ChartQuery>, data: BTreeMap<String, CoinChart>) -> Self {
        Self {
            note: "预生成的图表数据缓存，客户端按 coin 和 period 查找对应数据".to_string(),
            usage: "读取 chart-data-cache.json，键格式为 <coin>_<period>".to_string(),
            available_queries,
            data,
            generated_at: Utc::now(),
        }
    }
}
