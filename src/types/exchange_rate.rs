use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Api,
    Backup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateStatus {
    Success,
    Fallback,
}

/// exchange-rate.json 的内容，由汇率任务写入，其他任务只读
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(with = "rust_decimal::serde::float")]
    pub usd_to_cny: Decimal,
    pub updated_at: DateTime<Utc>,
    pub source: RateSource,
    pub status: RateStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExchangeRate {
    pub const FILE_NAME: &'static str = "exchange-rate.json";

    pub fn from_api(usd_to_cny: Decimal) -> Self {
        Self {
            usd_to_cny,
            updated_at: Utc::now(),
            source: RateSource::Api,
            status: RateStatus::Success,
            error: None,
        }
    }

    pub fn fallback(backup_rate: Decimal, error: String) -> Self {
        Self {
            usd_to_cny: backup_rate,
            updated_at: Utc::now(),
            source: RateSource::Backup,
            status: RateStatus::Fallback,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RateStatus::Success
    }
}
