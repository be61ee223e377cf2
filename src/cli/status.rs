//! # status 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/status.rs`

use clap::Args;
use std::path::PathBuf;

/// status 子命令参数
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output directory of a previous or running batch
    pub output_dir: PathBuf,

    /// List every remaining file
    #[arg(short, long, default_value_t = false)]
    pub list: bool,
}
