use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::services::batch::BatchReport;
use crate::services::http_client::{BackoffPolicy, HttpClient, Pacing, Transport};
use crate::storage::JsonStore;
use crate::types::{Coin, CoinQuote, PriceSnapshot, SimplePriceResponse};
use crate::utils::PriceCalculator;

/// 实时价格快照任务，写入 eth-btc-price.json
pub struct PriceService<T: Transport> {
    http: HttpClient<T>,
    store: JsonStore,
    api_base: String,
    coins: Vec<Coin>,
    policy: BackoffPolicy,
    pacing: Pacing,
}

impl<T: Transport> PriceService<T> {
    pub fn new(http: HttpClient<T>, store: JsonStore, config: &Config) -> Self {
        Self {
            http,
            store,
            api_base: config.upstream.coingecko_url.clone(),
            coins: config.coins.clone(),
            policy: BackoffPolicy::market_data(),
            pacing: Pacing::from_millis(config.pacing.refresh_delay_ms),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn http(&self) -> &HttpClient<T> {
        &self.http
    }

    pub fn price_url(&self, coin: &Coin) -> String {
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd,cny&include_24hr_change=true",
            self.api_base, coin.id
        )
    }

    /// 获取单个币种报价，缺少 usd / cny 视为数据格式错误
    pub async fn fetch_quote(&self, coin: &Coin) -> Result<CoinQuote> {
        let url = self.price_url(coin);
        let mut data: SimplePriceResponse = self.http.fetch_json(&url, &self.policy).await?;

        let quote = data
            .remove(&coin.id)
            .ok_or_else(|| FeedError::DataShape(format!("响应中缺少 {}", coin.id)))?;

        let usd = quote
            .usd
            .ok_or_else(|| FeedError::DataShape(format!("{} 缺少 usd 价格", coin.id)))?;
        let cny = quote
            .cny
            .ok_or_else(|| FeedError::DataShape(format!("{} 缺少 cny 价格", coin.id)))?;

        Ok(CoinQuote {
            usd: PriceCalculator::to_decimal(usd, "usd")?,
            usd_change_24h: optional_decimal(quote.usd_24h_change, "usd_24h_change")?,
            cny: PriceCalculator::to_decimal(cny, "cny")?,
            cny_change_24h: optional_decimal(quote.cny_24h_change, "cny_24h_change")?,
        })
    }

    /// 逐个币种获取报价，至少一个成功才写入快照
    pub async fn update(&self) -> Result<BatchReport> {
        info!("🚀 开始更新实时价格...");

        let mut report = BatchReport::default();
        let mut coins = BTreeMap::new();

        for (index, coin) in self.coins.iter().enumerate() {
            if index > 0 {
                self.pacing.pause(index).await;
            }

            match self.fetch_quote(coin).await {
                Ok(quote) => {
                    info!("✅ {} 价格: ${} / ¥{}", coin.symbol.to_uppercase(), quote.usd, quote.cny);
                    coins.insert(coin.symbol.clone(), quote);
                    report.record_success(coin.symbol.clone());
                }
                Err(e) => {
                    error!("❌ {} 价格更新失败: {}", coin.symbol, e);
                    report.record_failure(coin.symbol.clone(), &e);
                }
            }
        }

        let report = report.into_result()?;

        let snapshot = PriceSnapshot {
            coins,
            last_updated: Utc::now(),
        };
        self.store.write_pretty(PriceSnapshot::FILE_NAME, &snapshot)?;

        info!("✅ 实时价格已更新 ({}/{})", report.succeeded.len(), report.total());
        Ok(report)
    }
}

fn optional_decimal(value: Option<f64>, field: &str) -> Result<Option<Decimal>> {
    value
        .map(|v| PriceCalculator::to_decimal(v, field))
        .transpose()
}
