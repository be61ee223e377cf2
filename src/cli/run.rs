//! # run 子命令 CLI 定义
//!
//! 批量放大的全部参数；大部分参数也可以通过 `UPBATCH_*` 环境变量提供。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 由 `config.rs` 转换为 `RunConfig`

use clap::Args;
use std::path::PathBuf;

/// 默认识别的容器扩展名
pub const DEFAULT_EXTENSIONS: &str = "mkv,mp4,avi,m4v,mov,ts,m2ts,wmv,webm,mpg,mpeg,vob";

/// run 子命令参数
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory containing source videos
    pub input_dir: PathBuf,

    /// Directory receiving upscaled videos, logs and progress files
    pub output_dir: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // Scheduling
    // ─────────────────────────────────────────────────────────────
    /// Number of files processed in parallel (0 = number of CPUs)
    #[arg(short, long, default_value_t = 1, env = "UPBATCH_JOBS")]
    pub jobs: usize,

    /// Reuse the existing todo list instead of rescanning the input directory
    #[arg(long, default_value_t = false)]
    pub resume: bool,

    /// Show what would be processed without running anything
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Reprocess files even if their output exists or they are marked done
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Skip files whose output already exists (default)
    #[arg(long, overrides_with = "no_skip_existing")]
    pub skip_existing: bool,

    /// Process files even if their output already exists
    #[arg(long, overrides_with = "skip_existing")]
    pub no_skip_existing: bool,

    /// Per-file timeout in seconds (default: none)
    #[arg(long, value_name = "SECONDS", env = "UPBATCH_TIMEOUT")]
    pub timeout: Option<u64>,

    /// On Ctrl-C, let running files finish instead of killing them
    #[arg(long, default_value_t = false)]
    pub wait_on_interrupt: bool,

    // ─────────────────────────────────────────────────────────────
    // Discovery and naming
    // ─────────────────────────────────────────────────────────────
    /// Recurse into subdirectories (output mirrors the relative layout)
    #[arg(short, long, default_value_t = false)]
    pub recursive: bool,

    /// Comma-separated list of media extensions to pick up
    #[arg(long = "ext", value_delimiter = ',', default_value = DEFAULT_EXTENSIONS)]
    pub extensions: Vec<String>,

    /// Glob on file names to ignore (repeatable, e.g. '*sample*')
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Suffix appended to the output file stem
    #[arg(long, default_value = "_4K", env = "UPBATCH_SUFFIX")]
    pub suffix: String,

    // ─────────────────────────────────────────────────────────────
    // Preset selection
    // ─────────────────────────────────────────────────────────────
    /// Force one preset for every file
    #[arg(long, env = "UPBATCH_PRESET")]
    pub preset: Option<String>,

    /// TOML file replacing the built-in filename rules and probe thresholds
    #[arg(long, env = "UPBATCH_RULES")]
    pub rules: Option<PathBuf>,

    /// Never probe media height with ffprobe
    #[arg(long, default_value_t = false)]
    pub no_probe: bool,

    /// ffprobe executable
    #[arg(long, default_value = "ffprobe", env = "UPBATCH_FFPROBE")]
    pub ffprobe: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // External processor
    // ─────────────────────────────────────────────────────────────
    /// Per-file command, invoked as `<processor> [args..] <input> <output>`
    #[arg(long, default_value = "upscale-file", env = "UPBATCH_PROCESSOR")]
    pub processor: PathBuf,

    /// Extra argument passed to the processor before the paths (repeatable)
    #[arg(long = "processor-arg", allow_hyphen_values = true)]
    pub processor_args: Vec<String>,

    /// Extra KEY=VALUE exported to the processor (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Override the preset's encoder CRF
    #[arg(long)]
    pub crf: Option<u8>,

    /// Override the preset's encoder speed preset
    #[arg(long)]
    pub encoder_preset: Option<String>,

    /// GPU device index exported as UPSCALE_GPU_DEVICE
    #[arg(long, env = "UPBATCH_GPU")]
    pub gpu: Option<u32>,
}
