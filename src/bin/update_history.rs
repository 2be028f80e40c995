use coin_price_feed::{
    services::{HistoryService, HttpClient, ReqwestTransport},
    Config, JsonStore,
};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    info!("🚀 开始更新历史价格，共 {} 个币种", config.coins.len());

    let transport = ReqwestTransport::new(
        Duration::from_secs(config.http.chart_timeout_secs),
        &config.upstream.user_agent,
    )?;
    let service = HistoryService::new(
        HttpClient::new(transport),
        JsonStore::new(config.output.dir.clone()),
        &config,
    );

    match service.update().await {
        Ok(report) => {
            info!("🎉 历史价格更新完成，成功 {}/{}", report.succeeded.len(), report.total());
            Ok(())
        }
        Err(e) => {
            error!("❌ 历史价格更新失败: {}", e);
            std::process::exit(1);
        }
    }
}
