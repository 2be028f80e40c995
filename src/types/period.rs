// Period, SampleMode, PeriodConfig, PeriodTable
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error as ThisError;

/// 图表时间段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "24h")]
    Hour24,
    #[serde(rename = "7d")]
    Day7,
    #[serde(rename = "30d")]
    Day30,
    #[serde(rename = "1y")]
    Year1,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Hour1 => "1h",
            Period::Hour24 => "24h",
            Period::Day7 => "7d",
            Period::Day30 => "30d",
            Period::Year1 => "1y",
        }
    }

    pub fn all() -> Vec<Period> {
        vec![
            Period::Hour1,
            Period::Hour24,
            Period::Day7,
            Period::Day30,
            Period::Year1,
        ]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(ThisError, Debug, PartialEq, Eq)]
#[error("不支持的时间段: {0}")]
pub struct ParsePeriodError(pub String);

impl FromStr for Period {
    type Err = ParsePeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Period::Hour1),
            "24h" => Ok(Period::Hour24),
            "7d" => Ok(Period::Day7),
            "30d" => Ok(Period::Day30),
            "1y" => Ok(Period::Year1),
            other => Err(ParsePeriodError(other.to_string())),
        }
    }
}

/// 采样方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleMode {
    /// 按固定步长均匀抽取
    Uniform,
    /// 只保留末尾的 N 个点
    TailWindow,
}

/// 单个时间段的抓取与采样参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodConfig {
    pub period: Period,
    pub lookback_days: u32,
    /// 传给 market_chart 的 interval 参数，None 表示由上游自动决定粒度
    pub api_interval: Option<&'static str>,
    pub target_point_count: usize,
    pub interval_label: &'static str,
    pub sample_mode: SampleMode,
}

/// 时间段配置表，只读，显式传入使用方
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodTable {
    configs: Vec<PeriodConfig>,
}

impl PeriodTable {
    pub fn new(configs: Vec<PeriodConfig>) -> Self {
        Self { configs }
    }

    /// 默认配置：1h 取最近12个5分钟点，其余时间段均匀采样
    pub fn standard() -> Self {
        Self::new(vec![
            PeriodConfig {
                period: Period::Hour1,
                lookback_days: 1,
                api_interval: None,
                target_point_count: 12,
                interval_label: "5m",
                sample_mode: SampleMode::TailWindow,
            },
            PeriodConfig {
                period: Period::Hour24,
                lookback_days: 1,
                api_interval: None,
                target_point_count: 24,
                interval_label: "1h",
                sample_mode: SampleMode::Uniform,
            },
            PeriodConfig {
                period: Period::Day7,
                lookback_days: 7,
                api_interval: None,
                target_point_count: 42,
                interval_label: "4h",
                sample_mode: SampleMode::Uniform,
            },
            PeriodConfig {
                period: Period::Day30,
                lookback_days: 30,
                api_interval: Some("daily"),
                target_point_count: 30,
                interval_label: "1d",
                sample_mode: SampleMode::Uniform,
            },
            PeriodConfig {
                period: Period::Year1,
                lookback_days: 365,
                api_interval: Some("daily"),
                target_point_count: 52,
                interval_label: "7d",
                sample_mode: SampleMode::Uniform,
            },
        ])
    }

    pub fn get(&self, period: Period) -> Option<&PeriodConfig> {
        self.configs.iter().find(|c| c.period == period)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeriodConfig> {
        self.configs.iter()
    }

    pub fn periods(&self) -> Vec<Period> {
        self.configs.iter().map(|c| c.period).collect()
    }
}
