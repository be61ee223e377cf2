//! # 批处理汇总
//!
//! 聚合各作业结果的计数器，运行结束时写入一次汇总报告。
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs`, `batch/report.rs` 使用
//! - 使用 `models/job.rs`

use super::job::{JobOutcome, JobStatus};
use std::time::Duration;

/// 批处理结果统计
#[derive(Debug, Default)]
pub struct BatchSummary {
    /// 成功处理数量
    pub processed: usize,
    /// 跳过数量（输出已存在）
    pub skipped: usize,
    /// 失败数量
    pub failed: usize,
    /// 被中断的作业数量
    pub interrupted: usize,
    /// 本次运行前剩余的作业总数
    pub planned: usize,
    /// 运行结束后账本中仍未完成的作业数
    pub remaining: usize,
    /// 是否因用户中断而提前结束
    pub cancelled: bool,
    /// 总耗时
    pub elapsed: Duration,
    /// 失败详情 (输入路径, 原因)
    pub failures: Vec<(String, String)>,
    /// 所有作业结果，按发现顺序
    pub outcomes: Vec<JobOutcome>,
}

impl BatchSummary {
    /// 合并单个作业结果
    pub fn merge(&mut self, outcome: JobOutcome) {
        match outcome.status() {
            JobStatus::Done => self.processed += 1,
            JobStatus::Skipped => self.skipped += 1,
            JobStatus::Failed => {
                self.failed += 1;
                self.failures.push((
                    outcome.job.input.display().to_string(),
                    outcome.message.clone().unwrap_or_default(),
                ));
            }
            JobStatus::Interrupted => self.interrupted += 1,
            JobStatus::Pending | JobStatus::Running => {}
        }
        self.outcomes.push(outcome);
    }

    /// 已到达终态的作业数
    pub fn total(&self) -> usize {
        self.processed + self.skipped + self.failed + self.interrupted
    }

    /// 未被分派的作业数（中断后剩余）
    pub fn not_started(&self) -> usize {
        self.planned.saturating_sub(self.total())
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && !self.cancelled
    }

    /// 单行计数，用于进度提示和报告
    pub fn tally(&self) -> String {
        format!(
            "processed={}, skipped={}, failed={}",
            self.processed, self.skipped, self.failed
        )
    }
}
