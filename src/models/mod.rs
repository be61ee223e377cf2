//! # 数据模型模块
//!
//! 定义作业、预设和批处理汇总数据模型。
//!
//! ## 依赖关系
//! - 被 `resolver/`, `batch/` 和 `commands/` 使用
//! - 子模块: job, preset, summary

pub mod job;
pub mod preset;
pub mod summary;

pub use job::{Job, JobOutcome, JobStatus};
pub use preset::PresetName;
pub use summary::BatchSummary;
