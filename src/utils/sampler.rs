//! 时间序列采样
//!
//! 把上游返回的密集价格序列缩减为图表需要的固定点数

use crate::types::SampleMode;

/// 数据处理器
pub struct DataProcessor;

impl DataProcessor {
    /// 按采样方式缩减序列，输出顺序与输入一致
    ///
    /// # 参数
    /// * `series` - 按时间排列的原始序列
    /// * `target_points` - 目标点数
    /// * `mode` - 均匀采样或末尾窗口
    pub fn sample<T: Clone>(series: &[T], target_points: usize, mode: SampleMode) -> Vec<T> {
        if target_points == 0 || series.is_empty() {
            return vec![];
        }

        match mode {
            SampleMode::TailWindow => Self::tail_window(series, target_points),
            SampleMode::Uniform => Self::uniform(series, target_points),
        }
    }

    /// 均匀采样使用的步长
    pub fn uniform_step(len: usize, target_points: usize) -> usize {
        if target_points == 0 {
            return 1;
        }
        std::cmp::max(1, len / target_points)
    }

    /// 取最后 target_points 个元素，不足时全部返回
    fn tail_window<T: Clone>(series: &[T], target_points: usize) -> Vec<T> {
        let start = series.len().saturating_sub(target_points);
        series[start..].to_vec()
    }

    /// 固定步长遍历，收集满 target_points 个或输入耗尽即停止
    fn uniform<T: Clone>(series: &[T], target_points: usize) -> Vec<T> {
        let step = Self::uniform_step(series.len(), target_points);

        series
            .iter()
            .step_by(step)
            .take(target_points)
            .cloned()
            .collect()
    }
}

pub fn sample<T: Clone>(series: &[T], target_points: usize, mode: SampleMode) -> Vec<T> {
    DataProcessor::sample(series, target_points, mode)
}
