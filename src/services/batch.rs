//! 批处理结果汇总：单项失败只记录，全部失败才算任务失败

use tracing::{error, warn};

use crate::error::{FeedError, Result};

/// 一次批处理的成功/失败记录
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn record_success(&mut self, label: String) {
        self.succeeded.push(label);
    }

    pub fn record_failure(&mut self, label: String, error: &FeedError) {
        self.failed.push((label, error.to_string()));
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn is_total_failure(&self) -> bool {
        self.succeeded.is_empty()
    }

    /// 没有任何成功项时转换为 BatchFailed
    pub fn into_result(self) -> Result<Self> {
        if self.is_total_failure() {
            error!("❌ 全部 {} 项均失败，请检查网络连接和API状态", self.total());
            return Err(FeedError::BatchFailed(format!("成功 0/{}", self.total())));
        }
        if !self.failed.is_empty() {
            let skipped: Vec<&str> = self.failed.iter().map(|(label, _)| label.as_str()).collect();
            warn!("⚠️  以下项目已跳过: {}", skipped.join(", "));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_report_is_ok() {
        let mut report = BatchReport::default();
        report.record_success("eth_24h".to_string());
        report.record_failure("btc_24h".to_string(), &FeedError::RateLimited);

        let report = report.into_result().unwrap();
        assert_eq!(report.total(), 2);
        assert_eq!(report.failed[0].1, "HTTP 429: 触发速率限制");
    }

    #[test]
    fn test_empty_or_all_failed_report_is_batch_failed() {
        assert!(matches!(
            BatchReport::default().into_result(),
            Err(FeedError::BatchFailed(_))
        ));

        let mut report = BatchReport::default();
        report.record_failure("eth".to_string(), &FeedError::DataShape("x".to_string()));
        let err = report.into_result().unwrap_err();
        assert_eq!(err.to_string(), "批处理全部失败: 成功 0/1");
    }
}
