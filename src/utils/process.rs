//! # 外部进程控制
//!
//! 外部命令（处理命令、ffprobe）都在独立的进程组中启动：
//! - 终端 Ctrl-C 只送达 upbatch 自身，是否终止子进程由调用方决定
//! - 超时或取消时终止整个进程组，包括包装脚本启动的孙进程
//!
//! ## 依赖关系
//! - 被 `batch/invoker.rs`, `resolver/probe.rs` 使用
//! - 使用 `libc` (unix) 发送进程组信号

use crate::utils::interrupt::CancelFlag;

use std::io;
use std::process::{Child, Command, ExitStatus, Output};
use std::thread;
use std::time::{Duration, Instant};

/// 轮询子进程状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 有界等待的结果
#[derive(Debug)]
pub enum WaitOutcome {
    Exited(ExitStatus),
    TimedOut,
    Cancelled,
}

/// 让命令在新的进程组中启动
pub fn isolate(command: &mut Command) -> &mut Command {
    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        command.process_group(0);
    }
    command
}

/// 终止子进程所在的整个进程组并回收子进程
pub fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        // isolate() 之后进程组 id 等于子进程 pid
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg 只向给定进程组发送信号，不涉及内存
        let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
        if rc != 0 {
            tracing::debug!(
                pgid,
                error = %io::Error::last_os_error(),
                "killpg failed, process group probably gone"
            );
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = child.kill() {
            tracing::debug!(error = %e, "kill failed, process probably exited");
        }
    }

    let _ = child.wait();
}

/// 等待子进程退出，超时或取消时终止进程组
///
/// `cancel` 为 None 时不响应取消。`try_wait` 出错时同样先终止进程组再返回错误。
pub fn wait_bounded(
    child: &mut Child,
    timeout: Option<Duration>,
    cancel: Option<&CancelFlag>,
) -> io::Result<WaitOutcome> {
    let started = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(WaitOutcome::Exited(status)),
            Ok(None) => {}
            Err(e) => {
                kill_tree(child);
                return Err(e);
            }
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                kill_tree(child);
                return Ok(WaitOutcome::TimedOut);
            }
        }

        if cancel.is_some_and(CancelFlag::is_cancelled) {
            kill_tree(child);
            return Ok(WaitOutcome::Cancelled);
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// 运行带管道输出的命令，限时收集 stdout/stderr
///
/// 只适用于输出很少的命令：输出超过管道缓冲区时子进程会阻塞直到超时。
/// 超时返回 `ErrorKind::TimedOut`。
pub fn output_bounded(command: &mut Command, timeout: Duration) -> io::Result<Output> {
    let mut child = isolate(command)
        .stdout(std::process::Stdio::piped())
        .stderr(std::process::Stdio::piped())
        .spawn()?;

    match wait_bounded(&mut child, Some(timeout), None)? {
        WaitOutcome::Exited(_) => child.wait_with_output(),
        WaitOutcome::TimedOut | WaitOutcome::Cancelled => Err(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("no result after {}s", timeout.as_secs_f64()),
        )),
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_timeout_kills_grandchildren() {
        let dir = TempDir::new().unwrap();
        let marker = dir.path().join("late.txt");
        // 外层 sh 不是最后一条命令，不会被 exec 替换，内层 sh 是孙进程
        let mut child = isolate(Command::new("sh").args([
            "-c",
            "sh -c 'sleep 1; echo late > \"$1\"' inner \"$1\"; exit 0",
            "outer",
        ]))
        .arg(&marker)
        .spawn()
        .unwrap();

        let outcome = wait_bounded(&mut child, Some(Duration::from_millis(200)), None).unwrap();
        assert!(matches!(outcome, WaitOutcome::TimedOut));

        thread::sleep(Duration::from_millis(1800));
        assert!(!marker.exists());
    }

    #[test]
    fn test_cancel_kills_group() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let mut child = isolate(Command::new("sh").args(["-c", "sleep 30; exit 0"]))
            .spawn()
            .unwrap();
        let started = Instant::now();
        let outcome = wait_bounded(&mut child, None, Some(&cancel)).unwrap();
        assert!(matches!(outcome, WaitOutcome::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_exit_status_passes_through() {
        let mut child = isolate(Command::new("sh").args(["-c", "exit 4"]))
            .spawn()
            .unwrap();
        let outcome = wait_bounded(&mut child, Some(Duration::from_secs(10)), None).unwrap();
        match outcome {
            WaitOutcome::Exited(status) => assert_eq!(status.code(), Some(4)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_output_bounded_collects_and_times_out() {
        let out = output_bounded(
            Command::new("sh").args(["-c", "echo height=480; echo oops >&2"]),
            Duration::from_secs(10),
        )
        .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "height=480");
        assert_eq!(String::from_utf8_lossy(&out.stderr).trim(), "oops");

        let err = output_bounded(
            Command::new("sh").args(["-c", "sleep 30; exit 0"]),
            Duration::from_millis(200),
        )
        .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
