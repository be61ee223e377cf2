//! # presets 子命令 CLI 定义
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/presets.rs`

use clap::Args;
use std::path::PathBuf;

/// presets 子命令参数
#[derive(Args, Debug)]
pub struct PresetsArgs {
    /// TOML rules file to show instead of the built-in table
    #[arg(long, env = "UPBATCH_RULES")]
    pub rules: Option<PathBuf>,

    /// Files to classify with the active rules
    #[arg(long, num_args = 1..)]
    pub classify: Vec<PathBuf>,

    /// Do not probe files passed to --classify
    #[arg(long, default_value_t = false)]
    pub no_probe: bool,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe", env = "UPBATCH_FFPROBE")]
    pub ffprobe: PathBuf,
}
