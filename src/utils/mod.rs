//! 数据处理工具函数模块
//!
//! 包含时间序列采样与价格汇总计算

pub mod sampler;
pub mod price_calculator;

// 重新导出常用的工具函数和结构体
pub use sampler::{sample, DataProcessor};
pub use price_calculator::{summarize, PriceCalculator};
