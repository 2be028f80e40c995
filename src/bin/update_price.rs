use coin_price_feed::{
    services::{HttpClient, PriceService, ReqwestTransport},
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

    let transport = ReqwestTransport::new(
        Duration::from_secs(config.http.chart_timeout_secs),
        &config.upstream.user_agent,
    )?;
    let service = PriceService::new(
        HttpClient::new(transport),
        JsonStore::new(config.output.dir.clone()),
        &config,
    );

    if let Err(e) = service.update().await {
        error!("❌ 实时价格更新失败: {}", e);
        std::process::exit(1);
    }

    info!("🎉 实时价格更新完成");
    Ok(())
}
