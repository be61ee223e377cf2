//! # 外部处理命令调用
//!
//! 每个作业调用一次外部命令：
//! ```text
//! <processor> [processor-args...] <input> <temporary-output>
//! ```
//! 预设以 `UPSCALE_*` 环境变量导出。命令的 stdout/stderr 合并写入作业日志。
//!
//! 默认不设超时；配置了超时或收到中断时，终止子进程所在的整个进程组并返回对应结果。
//! 子进程运行在独立进程组中，终端 Ctrl-C 不会直接送达，`kill_on_cancel` 为 false 时
//! 正在运行的命令可以正常结束。
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs` 调用
//! - 使用 `config.rs` 中的 `ProcessorConfig`
//! - 使用 `utils/process.rs` 启动和终止进程组

use crate::config::ProcessorConfig;
use crate::error::{Result, UpbatchError};
use crate::utils::interrupt::CancelFlag;
use crate::utils::process::{self, WaitOutcome};

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

/// 单次调用的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    /// 退出码为 0
    Success,
    /// 非零退出码；None 表示被信号终止
    Exited(Option<i32>),
    TimedOut(Duration),
    /// 因用户中断被终止
    Cancelled,
    SpawnFailed(String),
}

/// 一次调用的参数
pub struct Invocation<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub log: &'a Path,
    pub env: Vec<(String, String)>,
}

/// 外部命令调用器
pub struct Invoker<'a> {
    config: &'a ProcessorConfig,
    cancel: CancelFlag,
    /// 中断时是否终止正在运行的命令
    kill_on_cancel: bool,
}

impl<'a> Invoker<'a> {
    pub fn new(config: &'a ProcessorConfig, cancel: CancelFlag, kill_on_cancel: bool) -> Self {
        Self {
            config,
            cancel,
            kill_on_cancel,
        }
    }

    /// 运行命令直到退出、超时或被中断
    pub fn run(&self, inv: &Invocation<'_>) -> Result<InvokeOutcome> {
        let log_err = |e| UpbatchError::FileWriteError {
            path: inv.log.display().to_string(),
            source: e,
        };

        if let Some(parent) = inv.log.parent() {
            fs::create_dir_all(parent).map_err(log_err)?;
        }
        let mut log = File::create(inv.log).map_err(log_err)?;

        writeln!(log, "# upbatch {}", chrono::Local::now().to_rfc3339()).map_err(log_err)?;
        writeln!(
            log,
            "# command: {} {} {} {}",
            self.config.program.display(),
            self.config.args.join(" "),
            inv.input.display(),
            inv.output.display()
        )
        .map_err(log_err)?;
        for (key, value) in &inv.env {
            writeln!(log, "# {}={}", key, value).map_err(log_err)?;
        }
        log.flush().map_err(log_err)?;

        let stdout = log.try_clone().map_err(log_err)?;
        let stderr = log.try_clone().map_err(log_err)?;

        tracing::debug!(
            program = %self.config.program.display(),
            input = %inv.input.display(),
            "spawning processor"
        );

        let spawned = process::isolate(&mut Command::new(&self.config.program))
            .args(&self.config.args)
            .arg(inv.input)
            .arg(inv.output)
            .envs(inv.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .spawn();

        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let reason = format!(
                    "failed to start '{}': {}",
                    self.config.program.display(),
                    e
                );
                writeln!(log, "# {}", reason).map_err(log_err)?;
                return Ok(InvokeOutcome::SpawnFailed(reason));
            }
        };

        let cancel = self.kill_on_cancel.then_some(&self.cancel);
        let waited = process::wait_bounded(&mut child, self.config.timeout, cancel).map_err(|e| {
            UpbatchError::CommandFailed {
                command: self.config.program.display().to_string(),
                stderr: e.to_string(),
            }
        })?;

        let outcome = match waited {
            WaitOutcome::Exited(status) if status.success() => InvokeOutcome::Success,
            WaitOutcome::Exited(status) => InvokeOutcome::Exited(status.code()),
            WaitOutcome::TimedOut => {
                InvokeOutcome::TimedOut(self.config.timeout.unwrap_or_default())
            }
            WaitOutcome::Cancelled => InvokeOutcome::Cancelled,
        };

        write_result(&mut log, inv.log, &outcome);
        Ok(outcome)
    }
}

/// 写入日志尾行；结果已确定，写入失败只记录警告
fn write_result(log: &mut impl Write, path: &Path, outcome: &InvokeOutcome) {
    if let Err(e) = writeln!(log, "# result: {:?}", outcome) {
        tracing::warn!(log = %path.display(), error = %e, "could not finish job log");
    }
}
