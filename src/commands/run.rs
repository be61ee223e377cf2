//! # run 命令实现
//!
//! 批量放大主流程。
//!
//! ## 功能
//! - 构造并校验运行配置（配置错误在任何作业运行前报告）
//! - 安装 Ctrl-C 处理器
//! - 运行协调器，打印汇总
//! - dry-run 时只打印计划表
//!
//! ## 依赖关系
//! - 使用 `cli/run.rs` 定义的参数
//! - 使用 `config.rs`, `batch/`
//! - 使用 `utils/output.rs`, `utils/interrupt.rs`

use crate::batch::{report, Coordinator, PlannedJob};
use crate::cli::run::RunArgs;
use crate::config::RunConfig;
use crate::error::{Result, UpbatchError};
use crate::models::BatchSummary;
use crate::utils::interrupt::{self, CancelFlag};
use crate::utils::output;

/// 执行 run 命令
pub fn execute(args: RunArgs) -> Result<()> {
    let config = RunConfig::from_args(args)?;
    let resolver = config.build_resolver()?;

    output::print_header(if config.dry_run {
        "Upscale Batch (dry run)"
    } else {
        "Upscale Batch"
    });
    output::print_info(&format!("Input:  {}", config.input_dir.display()));
    output::print_info(&format!("Output: {}", config.output_dir.display()));
    if let Some(preset) = config.preset_override {
        output::print_info(&format!("Preset override: {}", preset));
    }

    let cancel = CancelFlag::new();
    let coordinator = Coordinator::new(&config, &resolver, cancel.clone());

    if config.dry_run {
        let plan = coordinator.plan()?;
        print_plan(&plan);
        return Ok(());
    }

    interrupt::install_handler(&cancel)?;
    let summary = coordinator.show_progress(true).run()?;
    print_summary(&summary);

    let report_path = config.output_dir.join(report::SUMMARY_FILE);
    if summary.is_success() {
        output::print_success(&format!("Summary written to {}", report_path.display()));
        return Ok(());
    }
    if summary.cancelled {
        output::print_warning(&format!(
            "Batch interrupted; rerun with --resume to continue ({} remaining)",
            summary.remaining
        ));
        return Err(UpbatchError::Interrupted);
    }
    Err(UpbatchError::JobsFailed {
        failed: summary.failed,
        report: report_path.display().to_string(),
    })
}

fn print_plan(plan: &[PlannedJob]) {
    if plan.is_empty() {
        output::print_done("Nothing to do, every file is already done");
        return;
    }

    let mut skipped = 0;
    for p in plan {
        let name = p.job.display_name();
        match &p.resolution {
            Some(r) => output::print_plan(&name, r.preset.as_str(), &r.source.to_string()),
            None => {
                skipped += 1;
                output::print_skip(&format!("{} (output exists)", name));
            }
        }
    }

    output::print_separator();
    output::print_done(&format!(
        "Dry run: {} file(s) would be processed, {} skipped",
        plan.len() - skipped,
        skipped
    ));
}

fn print_summary(summary: &BatchSummary) {
    output::print_separator();
    output::print_done(&format!(
        "{} in {:.0}s (interrupted={}, remaining={})",
        summary.tally(),
        summary.elapsed.as_secs_f64(),
        summary.interrupted,
        summary.remaining
    ));
    for (path, reason) in &summary.failures {
        output::print_error(&format!("{}: {}", path, reason));
    }
}
