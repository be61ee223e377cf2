//! # 统一错误处理模块
//!
//! 定义 upbatch 的所有错误类型，使用 `thiserror` 派生。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// 用户中断时的进程退出码 (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

/// upbatch 统一错误类型
#[derive(Error, Debug)]
pub enum UpbatchError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("Not a directory: {path}")]
    NotADirectory { path: String },

    // ─────────────────────────────────────────────────────────────
    // 配置错误
    // ─────────────────────────────────────────────────────────────
    #[error("Unknown preset '{name}' (available: {available})")]
    UnknownPreset { name: String, available: String },

    #[error("Invalid rule pattern '{pattern}': {reason}")]
    InvalidRule { pattern: String, reason: String },

    #[error("Failed to parse rules file {path}\nReason: {reason}")]
    RulesParseError { path: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // 外部命令错误
    // ─────────────────────────────────────────────────────────────
    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("Could not parse probe output for {path}: {output:?}")]
    ProbeOutput { path: String, output: String },

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 批处理终止状态
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("{failed} job(s) failed, see {report}")]
    JobsFailed { failed: usize, report: String },

    #[error("Interrupted by user")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl UpbatchError {
    /// 进程退出码：中断为 130，其余为 1
    pub fn exit_code(&self) -> i32 {
        match self {
            UpbatchError::Interrupted => EXIT_INTERRUPTED,
            _ => 1,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, UpbatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(UpbatchError::Interrupted.exit_code(), 130);
        let failed = UpbatchError::JobsFailed {
            failed: 2,
            report: "out/batch_summary.txt".to_string(),
        };
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(
            failed.to_string(),
            "2 job(s) failed, see out/batch_summary.txt"
        );
    }
}
