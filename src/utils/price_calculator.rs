//! 价格计算工具
//!
//! 负责把上游原始价格转换为双币种价格点，并计算采样序列的汇总统计

use chrono::{DateTime, FixedOffset};
use num_traits::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{FeedError, Result};
use crate::types::{DualPrice, MarketChartResponse, PricePoint, PriceSeries, SummaryStats};

/// 北京时间 UTC+8
const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// 上游返回的单个原始点，尚未取整
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawPricePoint {
    pub timestamp_ms: f64,
    pub price: f64,
    pub volume: f64,
}

/// 价格计算工具
pub struct PriceCalculator;

impl PriceCalculator {
    /// 保留 dp 位小数，中点远离零取整
    pub fn round_dp(value: Decimal, dp: u32) -> Decimal {
        value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
    }

    /// 金额统一保留两位小数
    pub fn round_price(value: Decimal) -> Decimal {
        Self::round_dp(value, 2)
    }

    /// 把上游浮点数转换为 Decimal，NaN / 无穷大视为数据错误
    pub fn to_decimal(value: f64, field: &str) -> Result<Decimal> {
        Decimal::from_f64(value)
            .ok_or_else(|| FeedError::DataShape(format!("{} 不是有效数值: {}", field, value)))
    }

    /// 美元价格按汇率换算为人民币，溢出视为数据错误
    pub fn convert_to_cny(usd: Decimal, exchange_rate: Decimal) -> Result<Decimal> {
        usd.checked_mul(exchange_rate)
            .map(Self::round_price)
            .ok_or_else(|| {
                FeedError::DataShape(format!("人民币换算溢出: {} × {}", usd, exchange_rate))
            })
    }

    /// 计算价格变化百分比，previous_price 非正数时返回 None
    pub fn calculate_price_change_percentage(
        current_price: Decimal,
        previous_price: Decimal,
    ) -> Result<Option<Decimal>> {
        if previous_price <= Decimal::ZERO {
            return Ok(None);
        }

        current_price
            .checked_sub(previous_price)
            .and_then(|diff| diff.checked_div(previous_price))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .map(Some)
            .ok_or_else(|| {
                FeedError::DataShape(format!(
                    "涨跌幅计算溢出: {} → {}",
                    previous_price, current_price
                ))
            })
    }

    /// 按索引把 prices 与 total_volumes 配对，缺失的成交量记为0
    pub fn raw_points(response: &MarketChartResponse) -> Vec<RawPricePoint> {
        response
            .prices
            .iter()
            .enumerate()
            .map(|(i, (timestamp_ms, price))| RawPricePoint {
                timestamp_ms: *timestamp_ms,
                price: *price,
                volume: response.total_volumes.get(i).map(|(_, v)| *v).unwrap_or(0.0),
            })
            .collect()
    }

    /// 原始点转换为价格点：美元取整，人民币由未取整的美元价乘以汇率后取整
    pub fn build_point(raw: &RawPricePoint, exchange_rate: Decimal) -> Result<PricePoint> {
        let price = Self::to_decimal(raw.price, "price")?;
        let timestamp = (raw.timestamp_ms / 1000.0).floor() as i64;

        Ok(PricePoint {
            timestamp,
            datetime: Self::format_beijing_time(timestamp),
            price: DualPrice::new(
                Self::round_price(price),
                Self::convert_to_cny(price, exchange_rate)?,
            ),
            volume: raw.volume.max(0.0).round() as u64,
        })
    }

    pub fn build_series(raw: &[RawPricePoint], exchange_rate: Decimal) -> Result<PriceSeries> {
        raw.iter()
            .map(|point| Self::build_point(point, exchange_rate))
            .collect()
    }

    pub fn format_beijing_time(timestamp: i64) -> String {
        match (
            DateTime::from_timestamp(timestamp, 0),
            FixedOffset::east_opt(BEIJING_OFFSET_SECS),
        ) {
            (Some(utc), Some(offset)) => utc
                .with_timezone(&offset)
                .format("%Y/%m/%d %H:%M:%S")
                .to_string(),
            _ => String::new(),
        }
    }

    /// 计算汇总统计
    ///
    /// 最高/最低价的人民币值由美元极值乘以当前汇率重新计算，
    /// 而不是取各点已存储人民币值的极值。空序列返回全零汇总
    pub fn summarize(series: &[PricePoint], exchange_rate: Decimal) -> Result<SummaryStats> {
        let (first, last) = match (series.first(), series.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Ok(SummaryStats::default()),
        };

        let high_usd = series.iter().map(|p| p.price.usd).max().unwrap_or(Decimal::ZERO);
        let low_usd = series.iter().map(|p| p.price.usd).min().unwrap_or(Decimal::ZERO);

        let change_percent =
            Self::calculate_price_change_percentage(last.price.usd, first.price.usd)?
                .map(Self::round_price)
                .unwrap_or(Decimal::ZERO);

        Ok(SummaryStats {
            start_price: first.price,
            end_price: last.price,
            high_price: DualPrice::new(high_usd, Self::convert_to_cny(high_usd, exchange_rate)?),
            low_price: DualPrice::new(low_usd, Self::convert_to_cny(low_usd, exchange_rate)?),
            change_percent,
            total_volume: series.iter().map(|p| p.volume).sum(),
        })
    }
}

pub fn summarize(series: &[PricePoint], exchange_rate: Decimal) -> Result<SummaryStats> {
    PriceCalculator::summarize(series, exchange_rate)
}
