//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `run`: 批量放大（主流程）
//! - `status`: 查看输出目录的进度账本
//! - `presets`: 列出预设与规则表，可选对文件试分类
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: run, status, presets

pub mod presets;
pub mod run;
pub mod status;

use crate::utils::logging::LogLevel;
use clap::{Parser, Subcommand};

/// upbatch - 可续传的视频 AI 放大批处理协调器
#[derive(Parser, Debug)]
#[command(name = "upbatch")]
#[command(version)]
#[command(
    about = "Resumable batch coordinator for AI upscaling of animated video to 4K",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Diagnostic log verbosity (RUST_LOG overrides)
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "warn",
        env = "UPBATCH_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upscale every media file of INPUT_DIR into OUTPUT_DIR
    Run(run::RunArgs),

    /// Show ledger progress of an output directory
    Status(status::StatusArgs),

    /// List presets and classification rules
    Presets(presets::PresetsArgs),
}
