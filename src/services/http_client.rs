//! 带重试与退避的 HTTP 请求
//!
//! 退避参数由调用方按调用点传入，底层传输通过 [`Transport`] 抽象，生产环境使用 reqwest

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::error::{FeedError, Result};

/// 一次请求的原始结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 非 2xx 状态映射为错误，429 / 401 单独区分
    pub fn status_error(&self) -> FeedError {
        match self.status {
            429 => FeedError::RateLimited,
            401 => FeedError::Unauthorized,
            status => FeedError::Http {
                status,
                reason: self.reason.clone(),
            },
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<RawResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        (**self).get(url).await
    }
}

/// reqwest 实现，每个实例携带自己的超时
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedError::Network(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FeedError::Network(e.to_string()))?;

        let status = response.status();
        let reason = status.canonical_reason().unwrap_or("").to_string();
        let body = response
            .text()
            .await
            .map_err(|e| FeedError::Network(format!("读取响应体失败: {}", e)))?;

        Ok(RawResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// 重试与退避参数
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// 总尝试次数，包含第一次
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// 普通失败后的等待倍数
    pub growth_factor: f64,
    pub max_delay: Duration,
    /// 429 等待上限
    pub rate_limit_cap: Duration,
}

impl BackoffPolicy {
    /// 图表、实时价格、历史数据：2s 起步，每次 ×1.5，最多 30s
    pub fn market_data() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2000),
            growth_factor: 1.5,
            max_delay: Duration::from_secs(30),
            rate_limit_cap: Duration::from_secs(60),
        }
    }

    /// 汇率：1s、2s、4s 指数退避，最多 60s
    pub fn exchange_rate() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            growth_factor: 2.0,
            max_delay: Duration::from_secs(60),
            rate_limit_cap: Duration::from_secs(60),
        }
    }

    /// 第 failures 次普通失败之后的等待 (从0开始)
    pub fn retry_delay(&self, failures: u32) -> Duration {
        let secs = self.base_delay.as_secs_f64() * self.growth_factor.powi(failures as i32);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    /// 429 后的等待：min(上限, base * 2^attempt)
    pub fn rate_limit_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.rate_limit_cap)
    }

    /// 401 后的等待
    pub fn unauthorized_delay(&self) -> Duration {
        self.base_delay.saturating_mul(2)
    }
}

/// 带重试的 HTTP 客户端
pub struct HttpClient<T: Transport> {
    transport: T,
}

impl<T: Transport> HttpClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 按策略请求 url，最后一次失败的错误原样返回
    pub async fn fetch(&self, url: &str, policy: &BackoffPolicy) -> Result<RawResponse> {
        let max_attempts = policy.max_attempts.max(1);
        let mut failures = 0u32;
        let mut attempt = 0u32;

        loop {
            info!("🌐 API请求 (尝试 {}/{}): {}", attempt + 1, max_attempts, url);

            let error = match self.transport.get(url).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) => response.status_error(),
                Err(e) => e,
            };

            warn!("⚠️  第 {} 次请求失败: {}", attempt + 1, error);

            if !error.is_retryable() || attempt + 1 >= max_attempts {
                return Err(error);
            }

            let wait = match error {
                // 限流等待不推进普通退避
                FeedError::RateLimited => policy.rate_limit_delay(attempt),
                FeedError::Unauthorized => {
                    failures += 1;
                    policy.unauthorized_delay()
                }
                _ => {
                    let wait = policy.retry_delay(failures);
                    failures += 1;
                    wait
                }
            };

            info!("⏳ {:.1} 秒后重试...", wait.as_secs_f64());
            sleep(wait).await;
            attempt += 1;
        }
    }

    /// 请求并解析 JSON；解析失败是数据格式错误，不再重试
    pub async fn fetch_json<D: DeserializeOwned>(
        &self,
        url: &str,
        policy: &BackoffPolicy,
    ) -> Result<D> {
        let response = self.fetch(url, policy).await?;
        debug!("响应 {} 字节: {}", response.body.len(), url);

        serde_json::from_str(&response.body)
            .map_err(|e| FeedError::DataShape(format!("无法解析响应 JSON: {}", e)))
    }
}

/// 请求之间的固定间隔，用于遵守上游限流
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    Fixed(Duration),
    Disabled,
}

impl Pacing {
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Pacing::Disabled
        } else {
            Pacing::Fixed(Duration::from_millis(ms))
        }
    }

    /// 第 call_index 次调用之后应等待的时间
    pub fn delay_after(&self, _call_index: usize) -> Duration {
        match self {
            Pacing::Fixed(delay) => *delay,
            Pacing::Disabled => Duration::ZERO,
        }
    }

    pub async fn pause(&self, call_index: usize) {
        let delay = self.delay_after(call_index);
        if !delay.is_zero() {
            debug!("⏸️  等待 {:?} 避免API限制", delay);
            sleep(delay).await;
        }
    }
}
