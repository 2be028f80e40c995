use coin_price_feed::{
    services::{ExchangeRateService, HttpClient, ReqwestTransport},
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
        Duration::from_secs(config.http.rate_timeout_secs),
        &config.upstream.user_agent,
    )?;
    let service = ExchangeRateService::new(
        HttpClient::new(transport),
        JsonStore::new(config.output.dir.clone()),
        &config,
    );

    // 获取失败时仍会写入备用汇率，只有写入失败才以非零状态退出
    match service.update().await {
        Ok(record) => {
            info!("🎉 汇率更新完成: 1 USD = {} CNY ({:?})", record.usd_to_cny, record.source);
            Ok(())
        }
        Err(e) => {
            error!("❌ 汇率文件写入失败: {}", e);
            std::process::exit(1);
        }
    }
}
