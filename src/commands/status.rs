//! # status 命令实现
//!
//! 只读查看输出目录的进度账本。
//!
//! ## 依赖关系
//! - 使用 `cli/status.rs` 定义的参数
//! - 使用 `ledger/`, `utils/output.rs`

use crate::batch::report;
use crate::cli::status::StatusArgs;
use crate::error::{Result, UpbatchError};
use crate::ledger::Ledger;
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct CountRow {
    #[tabled(rename = "Todo")]
    todo: usize,
    #[tabled(rename = "Done")]
    done: usize,
    #[tabled(rename = "Remaining")]
    remaining: usize,
    #[tabled(rename = "Recorded (all runs)")]
    recorded: usize,
}

/// 执行 status 命令
pub fn execute(args: StatusArgs) -> Result<()> {
    output::print_header("Batch Status");

    if !args.output_dir.is_dir() {
        return Err(UpbatchError::DirectoryNotFound {
            path: args.output_dir.display().to_string(),
        });
    }
    if !Ledger::exists(&args.output_dir) {
        output::print_warning(&format!(
            "No ledger in '{}', nothing has been run there yet",
            args.output_dir.display()
        ));
        return Ok(());
    }

    let ledger = Ledger::open(&args.output_dir)?;
    let remaining = ledger.remaining();
    let done_in_todo = ledger.todo().iter().filter(|p| ledger.is_done(p)).count();

    let rows = [CountRow {
        todo: ledger.todo().len(),
        done: done_in_todo,
        remaining: remaining.len(),
        recorded: ledger.done().len(),
    }];
    println!("{}", Table::new(rows));

    if args.list {
        for path in &remaining {
            println!("  {}", path.display());
        }
    }

    let summary = args.output_dir.join(report::SUMMARY_FILE);
    if summary.is_file() {
        output::print_info(&format!("Last summary: {}", summary.display()));
    }

    if remaining.is_empty() {
        output::print_done("All files done");
    } else {
        output::print_info(&format!(
            "{} file(s) left, continue with `upbatch run --resume`",
            remaining.len()
        ));
    }
    Ok(())
}
