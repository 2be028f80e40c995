pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod types;
pub mod utils;

pub use config::Config;
pub use error::FeedError;
pub use storage::{CacheRead, JsonStore};
pub use types::*;
