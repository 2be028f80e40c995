//! 一年日线历史价格，每个币种写入 <symbol>-history.json

use chrono::DateTime;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::services::batch::BatchReport;
use crate::services::http_client::{BackoffPolicy, HttpClient, Pacing, Transport};
use crate::storage::JsonStore;
use crate::types::{Coin, HistoryEntry, MarketChartResponse};
use crate::utils::PriceCalculator;

const HISTORY_DAYS: u32 = 365;

pub struct HistoryService<T: Transport> {
    http: HttpClient<T>,
    store: JsonStore,
    api_base: String,
    coins: Vec<Coin>,
    policy: BackoffPolicy,
    pacing: Pacing,
}

impl<T: Transport> HistoryService<T> {
    pub fn new(http: HttpClient<T>, store: JsonStore, config: &Config) -> Self {
        Self {
            http,
            store,
            api_base: config.upstream.coingecko_url.clone(),
            coins: config.coins.clone(),
            policy: BackoffPolicy::market_data(),
            pacing: Pacing::from_millis(config.pacing.generate_delay_ms),
        }
    }

    pub fn history_url(&self, coin: &Coin, vs_currency: &str) -> String {
        format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}&interval=daily",
            self.api_base, coin.id, vs_currency, HISTORY_DAYS
        )
    }

    pub fn file_name(symbol: &str) -> String {
        format!("{}-history.json", symbol)
    }

    async fn fetch_currency(&self, coin: &Coin, vs_currency: &str) -> Result<MarketChartResponse> {
        let url = self.history_url(coin, vs_currency);
        self.http.fetch_json(&url, &self.policy).await
    }

    /// 按下标配对 USD 与 CNY 日线；CNY 数据不足的日期记为 null
    pub fn build_history(
        usd: &MarketChartResponse,
        cny: &MarketChartResponse,
    ) -> Result<Vec<HistoryEntry>> {
        if usd.prices.is_empty() {
            return Err(FeedError::DataShape("USD prices 为空".to_string()));
        }
        if cny.prices.len() < usd.prices.len() {
            warn!(
                "⚠️  CNY 数据点 ({}) 少于 USD ({})，缺失部分记为 null",
                cny.prices.len(),
                usd.prices.len()
            );
        }

        usd.prices
            .iter()
            .enumerate()
            .map(|(index, &(timestamp_ms, usd_price))| {
                let date = DateTime::from_timestamp_millis(timestamp_ms as i64)
                    .map(|dt| dt.format("%Y-%m-%d").to_string())
                    .ok_or_else(|| {
                        FeedError::DataShape(format!("无效的时间戳: {}", timestamp_ms))
                    })?;

                let usd = PriceCalculator::round_price(PriceCalculator::to_decimal(usd_price, "usd")?);
                let cny = cny
                    .prices
                    .get(index)
                    .map(|&(_, price)| PriceCalculator::to_decimal(price, "cny"))
                    .transpose()?
                    .map(PriceCalculator::round_price);

                Ok(HistoryEntry { date, usd, cny })
            })
            .collect()
    }

    /// 逐个币种写入历史文件，每个币种请求 USD 和 CNY 两次
    pub async fn update(&self) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut calls = 0usize;

        for coin in &self.coins {
            info!("🔄 正在获取 {} 历史数据...", coin.id);

            let result = async {
                if calls > 0 {
                    self.pacing.pause(calls).await;
                }
                calls += 1;
                let usd = self.fetch_currency(coin, "usd").await?;

                self.pacing.pause(calls).await;
                calls += 1;
                let cny = self.fetch_currency(coin, "cny").await?;

                let history = Self::build_history(&usd, &cny)?;
                self.store.write_pretty(&Self::file_name(&coin.symbol), &history)?;
                Ok::<usize, FeedError>(history.len())
            }
            .await;

            match result {
                Ok(days) => {
                    info!("✅ {} 已更新 ({} 天)", Self::file_name(&coin.symbol), days);
                    report.record_success(coin.symbol.clone());
                }
                Err(e) => {
                    error!("❌ {} 历史数据更新失败: {}", coin.symbol, e);
                    report.record_failure(coin.symbol.clone(), &e);
                }
            }
        }

        report.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http_client::testing::{ScriptedTransport, Step};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::Instant;

    const DAY_MS: u64 = 86_400_000;

    fn daily_body(days: usize, price: f64) -> String {
        let prices: Vec<String> = (0..days)
            .map(|i| format!("[{}, {}]", 1_700_006_400_000u64 + i as u64 * DAY_MS, price + i as f64))
            .collect();
        format!(r#"{{"prices": [{}]}}"#, prices.join(","))
    }

    fn service(
        transport: ScriptedTransport,
        coins: Vec<Coin>,
        store: JsonStore,
        pacing: Pacing,
    ) -> HistoryService<Arc<ScriptedTransport>> {
        HistoryService {
            http: HttpClient::new(Arc::new(transport)),
            store,
            api_base: "https://api.test/v3".to_string(),
            coins,
            policy: BackoffPolicy::market_data(),
            pacing,
        }
    }

    #[test]
    fn test_build_history_pairs_by_index() {
        let usd: MarketChartResponse =
            serde_json::from_str(r#"{"prices": [[1700006400000, 2000.456], [1700092800000, 2010.0]]}"#).unwrap();
        let cny: MarketChartResponse =
            serde_json::from_str(r#"{"prices": [[1700006400000, 14400.125]]}"#).unwrap();

        let history = HistoryService::<ScriptedTransport>::build_history(&usd, &cny).unwrap();

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].date, "2023-11-15");
        assert_eq!(history[0].usd, Decimal::from_str("2000.46").unwrap());
        assert_eq!(history[0].cny, Some(Decimal::from_str("14400.13").unwrap()));
        assert_eq!(history[1].date, "2023-11-16");
        assert_eq!(history[1].cny, None);

        let json = serde_json::to_value(&history).unwrap();
        assert!(json[1]["cny"].is_null());
    }

    #[test]
    fn test_build_history_rejects_empty_usd() {
        let empty = MarketChartResponse::default();
        let result = HistoryService::<ScriptedTransport>::build_history(&empty, &empty);
        assert!(matches!(result, Err(FeedError::DataShape(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_writes_each_coin_file() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new()
            .route("ethereum/market_chart?vs_currency=usd", vec![Step::Json(daily_body(366, 2000.0))])
            .route("ethereum/market_chart?vs_currency=cny", vec![Step::Json(daily_body(366, 14000.0))])
            .route("bitcoin/market_chart?vs_currency=usd", vec![Step::Status(404)]);
        let svc = service(
            transport,
            vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")],
            store.clone(),
            Pacing::Disabled,
        );

        let report = svc.update().await.unwrap();
        assert_eq!(report.succeeded, vec!["eth"]);
        assert_eq!(report.failed[0].0, "btc");

        let history: Vec<HistoryEntry> = store.read("eth-history.json").unwrap();
        assert_eq!(history.len(), 366);
        assert_eq!(history[365].usd, Decimal::from(2365));
        assert_eq!(history[365].cny, Some(Decimal::from(14365)));
        assert!(!store.path_of("btc-history.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_paces_every_request() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new().route("market_chart", vec![Step::Json(daily_body(3, 1.0))]);
        let svc = service(
            transport,
            vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")],
            JsonStore::new(dir.path()),
            Pacing::from_millis(2000),
        );

        let started = Instant::now();
        svc.update().await.unwrap();

        assert_eq!(svc.http.transport().call_count("market_chart"), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(6));
    }
}
