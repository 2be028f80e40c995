use clap::Parser;
use coin_price_feed::{
    services::{load_exchange_rate, ChartMode, ChartService, ChartSettings, HttpClient, ReqwestTransport},
    CacheRead, Config, JsonStore,
};
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "\
用法: update-chart-data [模式]

模式:
  generate   生成所有时间段的图表数据 (默认)
  1h|24h|7d|30d|1y
             只刷新指定时间段，合并进已有的 chart-<时间段>.json
  legacy     生成旧版布局 (charts/<币种>-<时间段>.json、chart-data-cache.json、chart-data.json)";

/// 生成图表数据 JSON
#[derive(Parser, Debug)]
#[command(name = "update-chart-data", about = "生成图表数据 JSON")]
struct Args {
    /// generate | 1h | 24h | 7d | 30d | 1y | legacy
    mode: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mode = match args.mode.as_deref().map(str::parse::<ChartMode>) {
        None => ChartMode::default(),
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            eprintln!("{}\n\n{}", e, USAGE);
            std::process::exit(2);
        }
    };

    let config = Config::from_env()?;
    info!("🔧 配置加载成功，输出目录: {}", config.output.dir.display());

    let store = JsonStore::new(config.output.dir.clone());
    let exchange_rate = match load_exchange_rate(&store, config.backup_rate) {
        CacheRead::Loaded(rate) => {
            info!("💱 使用缓存汇率: 1 USD = {} CNY", rate);
            rate
        }
        CacheRead::Fallback { value, reason } => {
            warn!("⚠️  无法读取汇率缓存，使用备用汇率 {}: {}", value, reason);
            value
        }
    };

    let transport = ReqwestTransport::new(
        Duration::from_secs(config.http.chart_timeout_secs),
        &config.upstream.user_agent,
    )?;
    let service = ChartService::new(
        HttpClient::new(transport),
        store,
        ChartSettings::from_config(&config),
        exchange_rate,
    );

    info!("🚀 开始生成图表数据 ({:?})...", mode);
    match service.run(mode).await {
        Ok(report) => {
            info!("🎉 图表数据更新完成，成功 {}/{}", report.succeeded.len(), report.total());
            Ok(())
        }
        Err(e) => {
            error!("❌ 图表数据更新失败: {}", e);
            std::process::exit(1);
        }
    }
}
