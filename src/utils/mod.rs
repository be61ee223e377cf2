//! # 工具函数模块
//!
//! 提供美化输出、进度条、日志初始化、中断处理和外部进程控制。
//!
//! ## 依赖关系
//! - 被 `commands/` 和 `batch/` 模块使用
//! - 子模块: interrupt, logging, output, process, progress, which

pub mod interrupt;
pub mod logging;
pub mod output;
pub mod process;
pub mod progress;
pub mod which;
