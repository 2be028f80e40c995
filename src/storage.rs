//! JSON 产物读写
//!
//! 所有产物都是整文件覆盖写入的格式化 JSON；读取本地缓存失败时返回带原因的降级默认值

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::error::{FeedError, Result};

/// 本地缓存读取结果
#[derive(Debug)]
pub enum CacheRead<T> {
    Loaded(T),
    Fallback { value: T, reason: FeedError },
}

impl<T> CacheRead<T> {
    pub fn into_value(self) -> T {
        match self {
            CacheRead::Loaded(value) => value,
            CacheRead::Fallback { value, .. } => value,
        }
    }

    pub fn value(&self) -> &T {
        match self {
            CacheRead::Loaded(value) => value,
            CacheRead::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, CacheRead::Fallback { .. })
    }

    /// 对读取到的值做校验，不通过则降级
    pub fn validate<F>(self, default: T, check: F) -> Self
    where
        F: FnOnce(&T) -> std::result::Result<(), String>,
    {
        match self {
            CacheRead::Loaded(value) => match check(&value) {
                Ok(()) => CacheRead::Loaded(value),
                Err(reason) => CacheRead::Fallback {
                    value: default,
                    reason: FeedError::CacheRead(reason),
                },
            },
            fallback => fallback,
        }
    }
}

/// 输出目录下的 JSON 文件存储
#[derive(Debug, Clone)]
pub struct JsonStore {
    root: PathBuf,
}

impl JsonStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// 整文件覆盖写入格式化 JSON，必要时创建父目录
    pub fn write_pretty<T: Serialize>(&self, name: &str, value: &T) -> Result<PathBuf> {
        let path = self.path_of(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)?;

        info!("💾 已写入 {}", path.display());
        Ok(path)
    }

    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.path_of(name);
        let content = std::fs::read_to_string(&path)
            .map_err(|e| FeedError::CacheRead(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| FeedError::CacheRead(format!("{}: {}", path.display(), e)))
    }

    /// 读取缓存文件，缺失或无法解析时返回 default
    pub fn read_or<T: DeserializeOwned>(&self, name: &str, default: T) -> CacheRead<T> {
        match self.read(name) {
            Ok(value) => {
                debug!("读取缓存 {}", name);
                CacheRead::Loaded(value)
            }
            Err(reason) => CacheRead::Fallback {
                value: default,
                reason,
            },
        }
    }
}
