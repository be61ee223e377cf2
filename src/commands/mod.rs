//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `config.rs`, `batch/`, `ledger/`, `resolver/`, `utils/`
//! - 子模块: run, status, presets

pub mod presets;
pub mod run;
pub mod status;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run(args) => run::execute(args),
        Commands::Status(args) => status::execute(args),
        Commands::Presets(args) => presets::execute(args),
    }
}
