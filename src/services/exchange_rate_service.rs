//! 汇率任务
//!
//! 唯一写入 exchange-rate.json 的任务；其他任务通过 [`load_exchange_rate`] 只读

use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::services::http_client::{BackoffPolicy, HttpClient, Transport};
use crate::storage::{CacheRead, JsonStore};
use crate::types::{ExchangeRate, ExchangeRateResponse};
use crate::utils::PriceCalculator;

pub struct ExchangeRateService<T: Transport> {
    http: HttpClient<T>,
    store: JsonStore,
    api_url: String,
    policy: BackoffPolicy,
    backup_rate: Decimal,
}

impl<T: Transport> ExchangeRateService<T> {
    pub fn new(http: HttpClient<T>, store: JsonStore, config: &Config) -> Self {
        Self {
            http,
            store,
            api_url: config.upstream.exchange_rate_url.clone(),
            policy: BackoffPolicy::exchange_rate(),
            backup_rate: config.backup_rate,
        }
    }

    /// 请求 USD → CNY 汇率，保留4位小数
    async fn fetch_usd_to_cny(&self) -> Result<Decimal> {
        info!("🔄 正在获取USD到CNY汇率...");

        let data: ExchangeRateResponse = self.http.fetch_json(&self.api_url, &self.policy).await?;
        let cny = data
            .rates
            .get("CNY")
            .copied()
            .ok_or_else(|| FeedError::DataShape("响应缺少 CNY 汇率".to_string()))?;

        let rate = PriceCalculator::round_dp(PriceCalculator::to_decimal(cny, "rates.CNY")?, 4);
        if rate <= Decimal::ZERO {
            return Err(FeedError::DataShape(format!("无效的汇率: {}", rate)));
        }

        Ok(rate)
    }

    /// 获取汇率；所有尝试失败后返回备用汇率记录，不会报错
    pub async fn fetch_exchange_rate(&self) -> ExchangeRate {
        match self.fetch_usd_to_cny().await {
            Ok(rate) => {
                info!("✅ 汇率获取成功: 1 USD = {} CNY", rate);
                ExchangeRate::from_api(rate)
            }
            Err(e) => {
                warn!("❌ 所有尝试失败，使用备用汇率: {} ({})", self.backup_rate, e);
                ExchangeRate::fallback(self.backup_rate, e.to_string())
            }
        }
    }

    /// 获取并写入 exchange-rate.json，只有写入失败才返回错误
    pub async fn update(&self) -> Result<ExchangeRate> {
        let record = self.fetch_exchange_rate().await;
        self.store.write_pretty(ExchangeRate::FILE_NAME, &record)?;

        if record.is_success() {
            info!("✅ 汇率缓存已更新: 1 USD = {} CNY", record.usd_to_cny);
        } else {
            warn!("⚠️  使用备用汇率: 1 USD = {} CNY", record.usd_to_cny);
        }

        Ok(record)
    }
}

/// 读取本地汇率缓存；缺失、无法解析或非正数时回退到备用汇率
pub fn load_exchange_rate(store: &JsonStore, backup_rate: Decimal) -> CacheRead<Decimal> {
    let read = match store.read::<ExchangeRate>(ExchangeRate::FILE_NAME) {
        Ok(record) => CacheRead::Loaded(record.usd_to_cny),
        Err(reason) => CacheRead::Fallback {
            value: backup_rate,
            reason,
        },
    };

    read.validate(backup_rate, |rate| {
        if *rate > Decimal::ZERO {
            Ok(())
        } else {
            Err(format!("汇率必须为正数: {}", rate))
        }
    })
}
