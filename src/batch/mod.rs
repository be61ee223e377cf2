//! # 批量处理模块
//!
//! 批处理协调器及其组成部分。
//!
//! ## 功能
//! - 扫描输入目录，收集媒体文件列表
//! - 有界并行分派作业
//! - 调用外部处理命令，临时输出成功后再改名
//! - 进度反馈与汇总报告
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 使用
//! - 使用 `rayon` 进行并行调度
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod coordinator;
pub mod invoker;
pub mod report;
pub mod runner;

pub use collector::FileCollector;
pub use coordinator::{Coordinator, PlannedJob};
pub use runner::BatchRunner;
