use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::Coin;

pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_EXCHANGE_RATE_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";
pub const DEFAULT_USER_AGENT: &str = "ETH-BTC-Chart-Tracker/1.0";
pub const DEFAULT_BACKUP_RATE: &str = "7.18";
pub const DEFAULT_COINS: &str = "ethereum:eth,bitcoin:btc";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub output: OutputConfig,
    pub upstream: UpstreamConfig,
    pub http: HttpConfig,
    pub pacing: PacingConfig,
    pub coins: Vec<Coin>,
    pub backup_rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    pub coingecko_url: String,
    pub exchange_rate_url: String,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    pub chart_timeout_secs: u64,
    pub rate_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PacingConfig {
    /// 全量生成时每次请求后的等待
    pub generate_delay_ms: u64,
    /// 单时间段刷新、实时价格等任务的等待
    pub refresh_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv().ok();

        let coins = parse_coins(&env_var_or_default("COINS", DEFAULT_COINS.to_string())?)
            .map_err(|e| {
                Self::print_config_help();
                e
            })?;

        let backup_rate: Decimal =
            env_var_or_default("BACKUP_USD_CNY_RATE", Decimal::from_str(DEFAULT_BACKUP_RATE)?)?;
        if backup_rate <= Decimal::ZERO {
            Self::print_config_help();
            return Err(anyhow::anyhow!("BACKUP_USD_CNY_RATE 必须为正数: {}", backup_rate));
        }

        Ok(Config {
            output: OutputConfig {
                dir: PathBuf::from(env_var_or_default("PUBLIC_DIR", "public".to_string())?),
            },
            upstream: UpstreamConfig {
                coingecko_url: env_var_or_default("COINGECKO_API_URL", DEFAULT_COINGECKO_URL.to_string())?
                    .trim_end_matches('/')
                    .to_string(),
                exchange_rate_url: env_var_or_default(
                    "EXCHANGE_RATE_API_URL",
                    DEFAULT_EXCHANGE_RATE_URL.to_string(),
                )?,
                user_agent: env_var_or_default("HTTP_USER_AGENT", DEFAULT_USER_AGENT.to_string())?,
            },
            http: HttpConfig {
                chart_timeout_secs: env_var_or_default("CHART_HTTP_TIMEOUT_SECS", 15)?,
                rate_timeout_secs: env_var_or_default("RATE_HTTP_TIMEOUT_SECS", 10)?,
            },
            pacing: PacingConfig {
                generate_delay_ms: env_var_or_default("GENERATE_DELAY_MS", 2000)?,
                refresh_delay_ms: env_var_or_default("REFRESH_DELAY_MS", 1000)?,
            },
            coins,
            backup_rate,
        })
    }

    pub fn print_config_help() {
        println!("\n🔧 配置指南");
        println!("{}", "=".repeat(50));
        println!("以下环境变量均为可选:\n");

        println!("[输出]");
        println!("PUBLIC_DIR=public\n");

        println!("[上游接口]");
        println!("COINGECKO_API_URL={}", DEFAULT_COINGECKO_URL);
        println!("EXCHANGE_RATE_API_URL={}", DEFAULT_EXCHANGE_RATE_URL);
        println!("HTTP_USER_AGENT={}", DEFAULT_USER_AGENT);
        println!("CHART_HTTP_TIMEOUT_SECS=15");
        println!("RATE_HTTP_TIMEOUT_SECS=10\n");

        println!("[任务]");
        println!("COINS={}   (CoinGecko ID:输出符号，逗号分隔)", DEFAULT_COINS);
        println!("BACKUP_USD_CNY_RATE={}", DEFAULT_BACKUP_RATE);
        println!("GENERATE_DELAY_MS=2000");
        println!("REFRESH_DELAY_MS=1000\n");

        println!("{}", "=".repeat(50));
    }
}

/// 解析 "ethereum:eth,bitcoin:btc" 形式的币种列表
pub fn parse_coins(raw: &str) -> anyhow::Result<Vec<Coin>> {
    let coins = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.split_once(':') {
            Some((id, symbol)) if !id.trim().is_empty() && !symbol.trim().is_empty() => {
                Ok(Coin::new(id.trim(), &symbol.trim().to_lowercase()))
            }
            _ => Err(anyhow::anyhow!("币种配置格式错误: {}", entry)),
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if coins.is_empty() {
        return Err(anyhow::anyhow!("没有配置任何币种"));
    }

    Ok(coins)
}

fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(val) => val.parse().map_err(|e| anyhow::anyhow!("配置 {} 解析失败: {}", key, e)),
        Err(_) => Ok(default),
    }
}
