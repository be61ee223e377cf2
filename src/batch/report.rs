//! # 汇总报告
//!
//! 运行结束时写入两个文件：
//! - `batch_summary.txt`: 计数、配置快照、失败列表
//! - `batch_results.csv`: 每个作业一行
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs` 调用
//! - 使用 `csv`, `chrono`

use crate::config::RunConfig;
use crate::error::{Result, UpbatchError};
use crate::models::BatchSummary;

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const SUMMARY_FILE: &str = "batch_summary.txt";
pub const RESULTS_FILE: &str = "batch_results.csv";

/// 渲染纯文本汇总
pub fn render_summary(config: &RunConfig, summary: &BatchSummary) -> String {
    let mut out = String::new();
    let status = if summary.cancelled {
        "interrupted"
    } else if summary.failed > 0 {
        "completed with failures"
    } else {
        "completed"
    };

    let _ = writeln!(out, "upbatch summary");
    let _ = writeln!(out, "===============");
    let _ = writeln!(out, "finished={}", chrono::Local::now().to_rfc3339());
    let _ = writeln!(out, "status={}", status);
    let _ = writeln!(out, "elapsed_secs={:.1}", summary.elapsed.as_secs_f64());
    let _ = writeln!(out);
    let _ = writeln!(out, "planned={}", summary.planned);
    let _ = writeln!(out, "processed={}", summary.processed);
    let _ = writeln!(out, "skipped={}", summary.skipped);
    let _ = writeln!(out, "failed={}", summary.failed);
    let _ = writeln!(out, "interrupted={}", summary.interrupted);
    let _ = writeln!(out, "not_started={}", summary.not_started());
    let _ = writeln!(out, "remaining={}", summary.remaining);

    let _ = writeln!(out);
    let _ = writeln!(out, "[settings]");
    for (key, value) in config.settings() {
        let _ = writeln!(out, "{}={}", key, value);
    }

    if !summary.failures.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "[failures]");
        for (path, reason) in &summary.failures {
            let _ = writeln!(out, "{}: {}", path, reason);
        }
    }

    out
}

/// 写入汇总报告
pub fn write_summary(path: &Path, config: &RunConfig, summary: &BatchSummary) -> Result<()> {
    fs::write(path, render_summary(config, summary)).map_err(|e| UpbatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 写入逐作业 CSV
pub fn write_results_csv(path: &Path, summary: &BatchSummary) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record(["input", "output", "preset", "status", "seconds", "message"])?;

    for outcome in &summary.outcomes {
        let job = &outcome.job;
        wtr.write_record([
            job.input.display().to_string(),
            job.output.display().to_string(),
            job.preset.map(|p| p.to_string()).unwrap_or_default(),
            job.status.to_string(),
            format!("{:.1}", outcome.duration.as_secs_f64()),
            outcome.message.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush().map_err(|e| UpbatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}
