//! # upbatch - 视频 AI 放大批处理协调器
//!
//! 把一个目录中的动画视频逐个交给外部放大命令（ffmpeg + VapourSynth +
//! RealESRGAN / BasicVSR++ / Real-CUGAN）处理到 4K，并跨多次运行记录进度。
//!
//! ## 子命令
//! - `run`     - 批量放大，可续传、可并行
//! - `status`  - 查看输出目录的进度
//! - `presets` - 列出预设与分类规则
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── config.rs  (运行配置)
//!   │     ├── batch/     (协调器、worker 池、外部命令调用、报告)
//!   │     ├── ledger/    (进度账本)
//!   │     ├── resolver/  (预设解析)
//!   │     └── models/    (数据模型)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod config;
mod error;
mod ledger;
mod models;
mod resolver;
mod utils;

use clap::Parser;
use cli::Cli;
use error::UpbatchError;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();
    utils::logging::init(cli.log_level);

    if let Err(e) = commands::run(cli.command) {
        match &e {
            UpbatchError::Interrupted => utils::output::print_warning(&format!("{}", e)),
            _ => utils::output::print_error(&format!("{}", e)),
        }
        std::process::exit(e.exit_code());
    }
}
