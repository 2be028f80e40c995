//! 错误类型
//!
//! 网络与 HTTP 状态错误在本地按退避策略重试；数据结构错误视为永久失败；
//! 缓存读取错误总是被调用方吸收为降级默认值。

use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum FeedError {
    #[error("网络错误: {0}")]
    Network(String),

    #[error("HTTP {status}: {reason}")]
    Http { status: u16, reason: String },

    #[error("HTTP 429: 触发速率限制")]
    RateLimited,

    #[error("HTTP 401: 未授权")]
    Unauthorized,

    #[error("数据格式错误: {0}")]
    DataShape(String),

    #[error("缓存读取失败: {0}")]
    CacheRead(String),

    #[error("IO错误: {0}")]
    Io(String),

    #[error("序列化错误: {0}")]
    Serialization(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("批处理全部失败: {0}")]
    BatchFailed(String),
}

impl FeedError {
    /// 是否应由重试循环再次尝试
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FeedError::Network(_)
                | FeedError::Http { .. }
                | FeedError::RateLimited
                | FeedError::Unauthorized
        )
    }
}

impl From<std::io::Error> for FeedError {
    fn from(err: std::io::Error) -> Self {
        FeedError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FeedError>;
