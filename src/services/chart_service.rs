//! 图表数据生成
//!
//! 依次处理 {币种 × 时间段}：抓取 → 采样 → 汇总 → 按时间段合并写入。
//! 单个组合失败只记录并跳过，全部失败时返回 BatchFailed

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{FeedError, Result};
use crate::services::batch::BatchReport;
use crate::services::http_client::{BackoffPolicy, HttpClient, Pacing, Transport};
use crate::storage::JsonStore;
use crate::types::{
    ChartDataBundle, ChartQuery, Coin, CoinChart, CoinSeries, MarketChartResponse,
    MergedChartDocument, Period, PeriodConfig, PeriodTable,
};
use crate::utils::{sample, PriceCalculator};

/// 图表任务参数
#[derive(Debug, Clone)]
pub struct ChartSettings {
    pub api_base: String,
    pub coins: Vec<Coin>,
    pub periods: PeriodTable,
    pub policy: BackoffPolicy,
    /// generate / legacy 模式的请求间隔
    pub generate_pacing: Pacing,
    /// 单时间段刷新的请求间隔
    pub refresh_pacing: Pacing,
}

impl ChartSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_base: config.upstream.coingecko_url.clone(),
            coins: config.coins.clone(),
            periods: PeriodTable::standard(),
            policy: BackoffPolicy::market_data(),
            generate_pacing: Pacing::from_millis(config.pacing.generate_delay_ms),
            refresh_pacing: Pacing::from_millis(config.pacing.refresh_delay_ms),
        }
    }
}

/// 图表任务的运行模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChartMode {
    /// 所有时间段，按时间段合并写入
    #[default]
    Generate,
    /// 只刷新一个时间段
    Refresh(Period),
    /// 旧版单币种文件布局
    Legacy,
}

impl FromStr for ChartMode {
    type Err = FeedError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generate" => Ok(ChartMode::Generate),
            "legacy" => Ok(ChartMode::Legacy),
            other => other
                .parse::<Period>()
                .map(ChartMode::Refresh)
                .map_err(|_| FeedError::Config(format!("未知模式: {}", other))),
        }
    }
}

pub struct ChartService<T: Transport> {
    http: HttpClient<T>,
    store: JsonStore,
    settings: ChartSettings,
    exchange_rate: Decimal,
}

impl<T: Transport> ChartService<T> {
    pub fn new(
        http: HttpClient<T>,
        store: JsonStore,
        settings: ChartSettings,
        exchange_rate: Decimal,
    ) -> Self {
        Self {
            http,
            store,
            settings,
            exchange_rate,
        }
    }

    pub fn http(&self) -> &HttpClient<T> {
        &self.http
    }

    pub fn chart_url(&self, coin: &Coin, config: &PeriodConfig) -> String {
        let mut url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}",
            self.settings.api_base, coin.id, config.lookback_days
        );
        if let Some(interval) = config.api_interval {
            url.push_str(&format!("&interval={}", interval));
        }
        url
    }

    /// 获取原始图表数据，prices 缺失或为空视为数据格式错误
    pub async fn fetch_chart_data(
        &self,
        coin: &Coin,
        config: &PeriodConfig,
    ) -> Result<MarketChartResponse> {
        info!("🔄 正在获取 {} {} 的图表数据...", coin.id, config.period);

        let url = self.chart_url(coin, config);
        let data: MarketChartResponse = self.http.fetch_json(&url, &self.settings.policy).await?;

        if data.prices.is_empty() {
            return Err(FeedError::DataShape(format!(
                "{} {} 的 prices 为空",
                coin.id, config.period
            )));
        }

        info!(
            "✅ {} {} 图表数据获取成功，包含 {} 个数据点",
            coin.id,
            config.period,
            data.prices.len()
        );
        Ok(data)
    }

    /// 采样并计算汇总
    pub fn process_chart_data(
        &self,
        raw: &MarketChartResponse,
        config: &PeriodConfig,
    ) -> Result<CoinSeries> {
        let points = PriceCalculator::raw_points(raw);
        let sampled = sample(&points, config.target_point_count, config.sample_mode);
        let data = PriceCalculator::build_series(&sampled, self.exchange_rate)?;
        let summary = PriceCalculator::summarize(&data, self.exchange_rate)?;

        Ok(CoinSeries { data, summary })
    }

    async fn fetch_coin_series(&self, coin: &Coin, config: &PeriodConfig) -> Result<CoinSeries> {
        let raw = self.fetch_chart_data(coin, config).await?;
        self.process_chart_data(&raw, config)
    }

    /// 依次抓取一个时间段下的所有币种，返回成功的部分
    async fn collect_period(
        &self,
        config: &PeriodConfig,
        pacing: Pacing,
        calls: &mut usize,
        report: &mut BatchReport,
    ) -> BTreeMap<String, CoinSeries> {
        let mut collected = BTreeMap::new();

        for coin in &self.settings.coins {
            if *calls > 0 {
                pacing.pause(*calls).await;
            }
            *calls += 1;

            let label = format!("{}_{}", coin.symbol, config.period);
            info!("🚀 开始处理 {} {} 图表数据...", coin.symbol.to_uppercase(), config.period);

            match self.fetch_coin_series(coin, config).await {
                Ok(series) => {
                    info!(
                        "✅ 已生成 {} {} 图表数据 ({} 个数据点)",
                        coin.symbol.to_uppercase(),
                        config.period,
                        series.data.len()
                    );
                    collected.insert(coin.symbol.clone(), series);
                    report.record_success(label);
                }
                Err(e) => {
                    error!("❌ 生成 {} {} 数据失败: {}", coin.symbol, config.period, e);
                    report.record_failure(label, &e);
                }
            }
        }

        collected
    }

    /// 生成所有时间段，每个时间段至少有一个币种成功才写入文件
    pub async fn generate_all(&self) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut calls = 0usize;

        for config in self.settings.periods.iter() {
            let collected = self
                .collect_period(config, self.settings.generate_pacing, &mut calls, &mut report)
                .await;

            if collected.is_empty() {
                error!("❌ {} 时间段所有币种失败，跳过写入", config.period);
                continue;
            }

            let mut document = MergedChartDocument::empty(config);
            for (symbol, series) in collected {
                document.upsert(&symbol, series);
            }
            self.store
                .write_pretty(&MergedChartDocument::file_name(config.period), &document)?;
        }

        info!("📊 成功生成 {}/{} 个图表数据集", report.succeeded.len(), report.total());
        report.into_result()
    }

    /// 只刷新一个时间段，并合并进已有文件（按币种覆盖）
    pub async fn refresh_period(&self, period: Period) -> Result<BatchReport> {
        let config = self
            .settings
            .periods
            .get(period)
            .ok_or_else(|| FeedError::Config(format!("未配置的时间段: {}", period)))?;

        info!("🔄 更新 {} 时间段的图表数据...", period);

        let mut report = BatchReport::default();
        let mut calls = 0usize;
        let collected = self
            .collect_period(config, self.settings.refresh_pacing, &mut calls, &mut report)
            .await;

        let report = report.into_result()?;

        let file_name = MergedChartDocument::file_name(period);
        let existing = self.store.read_or(&file_name, MergedChartDocument::empty(config));
        if existing.is_fallback() {
            info!("创建新的缓存文件 {}", file_name);
        }

        let mut document = existing.into_value();
        if document.period != period {
            warn!("⚠️  {} 中的时间段不匹配，重新创建", file_name);
            document = MergedChartDocument::empty(config);
        }

        for (symbol, series) in collected {
            document.upsert(&symbol, series);
            info!("✅ {} {} 数据已更新", symbol.to_uppercase(), period);
        }
        self.store.write_pretty(&file_name, &document)?;

        Ok(report)
    }

    pub async fn run(&self, mode: ChartMode) -> Result<BatchReport> {
        match mode {
            ChartMode::Generate => self.generate_all().await,
            ChartMode::Refresh(period) => self.refresh_period(period).await,
            ChartMode::Legacy => self.generate_legacy().await,
        }
    }

    /// 旧版布局：单币种单时间段文件、扁平缓存和带说明的合集
    pub async fn generate_legacy(&self) -> Result<BatchReport> {
        let mut report = BatchReport::default();
        let mut calls = 0usize;
        let mut cache: BTreeMap<String, CoinChart> = BTreeMap::new();
        let mut queries = Vec::new();

        for config in self.settings.periods.iter() {
            for coin in &self.settings.coins {
                queries.push(ChartQuery {
                    coin: coin.symbol.clone(),
                    period: config.period,
                });
            }

            let collected = self
                .collect_period(config, self.settings.generate_pacing, &mut calls, &mut report)
                .await;

            for (symbol, series) in collected {
                let chart = CoinChart {
                    coin: symbol,
                    period: config.period,
                    interval: config.interval_label.to_string(),
                    data: series.data,
                    summary: series.summary,
                    last_updated: chrono::Utc::now(),
                };
                self.store.write_pretty(&chart.file_name(), &chart)?;
                cache.insert(chart.cache_key(), chart);
            }
        }

        let report = report.into_result()?;

        self.store.write_pretty(ChartDataBundle::CACHE_FILE, &cache)?;
        let bundle = ChartDataBundle::new(queries, cache);
        self.store.write_pretty(ChartDataBundle::BUNDLE_FILE, &bundle)?;

        info!("📊 图表数据API缓存已生成，共 {} 个数据集", bundle.data.len());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::http_client::testing::{ScriptedTransport, Step};
    use std::sync::Arc;
    use tempfile::tempdir;

    const BASE: &str = "https://api.test/v3";

    fn chart_body(points: usize, start_price: f64) -> String {
        let prices: Vec<String> = (0..points)
            .map(|i| format!("[{}, {}]", 1_700_000_000_000u64 + i as u64 * 300_000, start_price + i as f64))
            .collect();
        let volumes: Vec<String> = (0..points)
            .map(|i| format!("[{}, 1000]", 1_700_000_000_000u64 + i as u64 * 300_000))
            .collect();
        format!(
            r#"{{"prices": [{}], "total_volumes": [{}]}}"#,
            prices.join(","),
            volumes.join(",")
        )
    }

    fn settings(coins: Vec<Coin>) -> ChartSettings {
        ChartSettings {
            api_base: BASE.to_string(),
            coins,
            periods: PeriodTable::standard(),
            policy: BackoffPolicy::market_data(),
            generate_pacing: Pacing::Disabled,
            refresh_pacing: Pacing::Disabled,
        }
    }

    fn service(
        transport: ScriptedTransport,
        coins: Vec<Coin>,
        store: JsonStore,
    ) -> ChartService<Arc<ScriptedTransport>> {
        ChartService::new(
            HttpClient::new(Arc::new(transport)),
            store,
            settings(coins),
            Decimal::from(7),
        )
    }

    fn three_coins() -> Vec<Coin> {
        vec![
            Coin::new("ethereum", "eth"),
            Coin::new("bitcoin", "btc"),
            Coin::new("dogecoin", "doge"),
        ]
    }

    #[test]
    fn test_chart_mode_parsing() {
        assert_eq!("generate".parse::<ChartMode>().unwrap(), ChartMode::Generate);
        assert_eq!("legacy".parse::<ChartMode>().unwrap(), ChartMode::Legacy);
        assert_eq!("7d".parse::<ChartMode>().unwrap(), ChartMode::Refresh(Period::Day7));
        assert_eq!(ChartMode::default(), ChartMode::Generate);
        assert!(matches!("weekly".parse::<ChartMode>(), Err(FeedError::Config(_))));
        assert!("".parse::<ChartMode>().is_err());
    }

    #[test]
    fn test_chart_url_includes_interval_only_when_configured() {
        let dir = tempdir().unwrap();
        let svc = service(ScriptedTransport::new(), vec![], JsonStore::new(dir.path()));
        let table = PeriodTable::standard();
        let coin = Coin::new("bitcoin", "btc");

        assert_eq!(
            svc.chart_url(&coin, table.get(Period::Hour24).unwrap()),
            "https://api.test/v3/coins/bitcoin/market_chart?vs_currency=usd&days=1"
        );
        assert_eq!(
            svc.chart_url(&coin, table.get(Period::Year1).unwrap()),
            "https://api.test/v3/coins/bitcoin/market_chart?vs_currency=usd&days=365&interval=daily"
        );
    }

    #[test]
    fn test_process_chart_data_tail_window_for_hour() {
        let dir = tempdir().unwrap();
        let svc = service(ScriptedTransport::new(), vec![], JsonStore::new(dir.path()));
        let table = PeriodTable::standard();
        let raw: MarketChartResponse = serde_json::from_str(&chart_body(288, 100.0)).unwrap();

        let series = svc
            .process_chart_data(&raw, table.get(Period::Hour1).unwrap())
            .unwrap();

        assert_eq!(series.data.len(), 12);
        assert_eq!(series.summary.start_price.usd, Decimal::from(376));
        assert_eq!(series.summary.end_price.usd, Decimal::from(387));
        assert_eq!(series.summary.end_price.cny, Decimal::from(2709));
        assert_eq!(series.summary.total_volume, 12_000);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_batch_writes_successful_coins() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .route("coins/ethereum/", vec![Step::Json(chart_body(168, 2000.0))])
            .route("coins/bitcoin/", vec![Step::Json(chart_body(168, 60000.0))])
            .route("coins/dogecoin/", vec![Step::Json(r#"{"prices": []}"#.to_string())]);
        let store = JsonStore::new(dir.path());
        let svc = service(transport, three_coins(), store.clone());

        let report = svc.refresh_period(Period::Day7).await.unwrap();

        assert_eq!(report.succeeded, vec!["eth_7d", "btc_7d"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "doge_7d");
        // 数据格式错误不重试
        assert_eq!(svc.http().transport().call_count("coins/dogecoin/"), 1);

        let document: MergedChartDocument = store.read("chart-7d.json").unwrap();
        assert_eq!(document.period, Period::Day7);
        assert_eq!(document.interval, "4h");
        assert_eq!(document.coins.keys().collect::<Vec<_>>(), vec!["btc", "eth"]);
        assert_eq!(document.coins["eth"].data.len(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overflowing_price_skips_only_that_coin() {
        let dir = tempdir().unwrap();
        let transport = ScriptedTransport::new()
            .route(
                "coins/ethereum/",
                vec![Step::Json(r#"{"prices": [[1700000000000, 5e28]]}"#.to_string())],
            )
            .route("coins/bitcoin/", vec![Step::Json(chart_body(31, 60000.0))]);
        let store = JsonStore::new(dir.path());
        let svc = service(
            transport,
            vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")],
            store.clone(),
        );

        let report = svc.refresh_period(Period::Day30).await.unwrap();

        assert_eq!(report.succeeded, vec!["btc_30d"]);
        assert_eq!(report.failed[0].0, "eth_30d");
        assert_eq!(svc.http().transport().call_count("coins/ethereum/"), 1);

        let document: MergedChartDocument = store.read("chart-30d.json").unwrap();
        assert_eq!(document.coins.keys().collect::<Vec<_>>(), vec!["btc"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_merges_into_existing_document() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let table = PeriodTable::standard();
        let config = table.get(Period::Day30).unwrap();

        let mut previous = MergedChartDocument::empty(config);
        let stale = CoinSeries { data: vec![], summary: Default::default() };
        previous.upsert("eth", stale.clone());
        previous.upsert("sol", stale.clone());
        store.write_pretty("chart-30d.json", &previous).unwrap();

        let transport = ScriptedTransport::new()
            .route("coins/ethereum/", vec![Step::Json(chart_body(31, 2500.0))])
            .route("coins/bitcoin/", vec![Step::Status(500)]);
        let svc = service(
            transport,
            vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")],
            store.clone(),
        );

        let report = svc.refresh_period(Period::Day30).await.unwrap();
        assert_eq!(report.succeeded, vec!["eth_30d"]);
        assert_eq!(svc.http().transport().call_count("coins/bitcoin/"), 3);

        let document: MergedChartDocument = store.read("chart-30d.json").unwrap();
        assert_eq!(document.coins.len(), 2);
        assert_eq!(document.coins["sol"], stale);
        assert_eq!(document.coins["eth"].data.len(), 30);
        assert!(!document.coins.contains_key("btc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_total_failure_leaves_file_untouched() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new().route("market_chart", vec![Step::Status(503)]);
        let svc = service(transport, three_coins(), store.clone());

        let result = svc.refresh_period(Period::Hour24).await;

        assert!(matches!(result, Err(FeedError::BatchFailed(_))));
        assert!(!store.path_of("chart-24h.json").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_writes_each_period() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new()
            .route("coins/ethereum/", vec![Step::Json(chart_body(400, 1500.0))])
            .route("coins/bitcoin/", vec![Step::TransportError]);
        let svc = service(
            transport,
            vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")],
            store.clone(),
        );

        let report = svc.generate_all().await.unwrap();
        assert_eq!(report.succeeded.len(), 5);
        assert_eq!(report.failed.len(), 5);

        for period in Period::all() {
            let document: MergedChartDocument =
                store.read(&MergedChartDocument::file_name(period)).unwrap();
            assert_eq!(document.coins.len(), 1);
            assert!(document.coins.contains_key("eth"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_all_fails_when_nothing_succeeds() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new().route("market_chart", vec![Step::Json("{}".to_string())]);
        let svc = service(transport, vec![Coin::new("ethereum", "eth")], store.clone());

        let result = svc.generate_all().await;

        assert!(matches!(result, Err(FeedError::BatchFailed(_))));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_legacy_layout() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new().route("coins/bitcoin/", vec![Step::Json(chart_body(60, 30000.0))]);
        let svc = service(transport, vec![Coin::new("bitcoin", "btc")], store.clone());

        let report = svc.generate_legacy().await.unwrap();
        assert_eq!(report.succeeded.len(), 5);

        let chart: CoinChart = store.read("charts/btc-24h.json").unwrap();
        assert_eq!(chart.interval, "1h");
        assert_eq!(chart.data.len(), 24);

        let cache: BTreeMap<String, CoinChart> = store.read(ChartDataBundle::CACHE_FILE).unwrap();
        assert_eq!(cache.len(), 5);
        assert!(cache.contains_key("btc_1y"));

        let bundle: ChartDataBundle = store.read(ChartDataBundle::BUNDLE_FILE).unwrap();
        assert_eq!(bundle.available_queries.len(), 5);
        assert_eq!(bundle.data.len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_pacing_between_calls() {
        let dir = tempdir().unwrap();
        let store = JsonStore::new(dir.path());
        let transport = ScriptedTransport::new().route("market_chart", vec![Step::Json(chart_body(10, 1.0))]);
        let mut settings = settings(vec![Coin::new("ethereum", "eth"), Coin::new("bitcoin", "btc")]);
        settings.generate_pacing = Pacing::from_millis(2000);
        let svc = ChartService::new(
            HttpClient::new(Arc::new(transport)),
            store,
            settings,
            Decimal::from(7),
        );

        let started = tokio::time::Instant::now();
        svc.generate_all().await.unwrap();

        // 10 次请求之间 9 次间隔
        assert_eq!(started.elapsed(), std::time::Duration::from_secs(18));
    }
}
