//! # 媒体属性探测
//!
//! 通过外部 `ffprobe` 读取首个视频流的高度和场序，供预设阈值分类使用。
//! 探测限时执行，超时按探测失败处理。
//!
//! ## 依赖关系
//! - 被 `resolver/mod.rs` 使用
//! - 使用 `utils/process.rs` 限时运行
//! - 外部命令: `ffprobe`

use crate::error::{Result, UpbatchError};
use crate::utils::process;

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

/// 单次探测的默认时限
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// 探测结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaInfo {
    /// 帧高度（像素）
    pub height: u32,
    /// 场序为 tt/bb/tb/bt 时视为隔行
    pub interlaced: bool,
}

/// 媒体探测接口
pub trait MediaProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<MediaInfo>;
}

/// 基于 ffprobe 的探测器
pub struct FfprobeProbe {
    program: PathBuf,
    timeout: Duration,
}

impl FfprobeProbe {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl MediaProbe for FfprobeProbe {
    fn probe(&self, path: &Path) -> Result<MediaInfo> {
        let command = self.program.display().to_string();
        let mut cmd = Command::new(&self.program);
        cmd.args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=height,field_order",
            "-of",
            "default=noprint_wrappers=1",
        ])
        .arg(path)
        .stdin(Stdio::null());

        let output = process::output_bounded(&mut cmd, self.timeout).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                UpbatchError::CommandNotFound {
                    command: command.clone(),
                }
            } else {
                UpbatchError::CommandFailed {
                    command: command.clone(),
                    stderr: e.to_string(),
                }
            }
        })?;

        if !output.status.success() {
            return Err(UpbatchError::CommandFailed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_probe_output(&stdout).ok_or_else(|| UpbatchError::ProbeOutput {
            path: path.display().to_string(),
            output: stdout.trim().to_string(),
        })
    }
}

/// 解析 `key=value` 形式的 ffprobe 输出
pub fn parse_probe_output(output: &str) -> Option<MediaInfo> {
    let mut height = None;
    let mut interlaced = false;

    for line in output.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        match key {
            "height" => height = value.trim().parse::<u32>().ok().filter(|h| *h > 0),
            "field_order" => {
                interlaced = matches!(value.trim(), "tt" | "bb" | "tb" | "bt");
            }
            _ => {}
        }
    }

    height.map(|height| MediaInfo { height, interlaced })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_interlaced_dvd() {
        let info = parse_probe_output("height=480\nfield_order=tt\n").unwrap();
        assert_eq!(
            info,
            MediaInfo {
                height: 480,
                interlaced: true
            }
        );
    }

    #[test]
    fn test_parse_progressive_and_missing_field_order() {
        let info = parse_probe_output("field_order=progressive\nheight=1080\n").unwrap();
        assert!(!info.interlaced);
        assert_eq!(info.height, 1080);

        let info = parse_probe_output("height=720").unwrap();
        assert!(!info.interlaced);
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_probe_output("").is_none());
        assert!(parse_probe_output("height=N/A\nfield_order=unknown").is_none());
        assert!(parse_probe_output("height=0").is_none());
    }

    #[test]
    fn test_missing_ffprobe_is_an_error() {
        let probe = FfprobeProbe::new("/nonexistent/ffprobe-upbatch");
        let err = probe.probe(Path::new("/tmp/x.mkv")).unwrap_err();
        assert!(matches!(err, UpbatchError::CommandNotFound { .. }));
    }

    #[cfg(unix)]
    fn fake_ffprobe(dir: &Path, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("ffprobe");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    /// 刚写入的脚本可能因其他测试线程 fork 而短暂处于 ETXTBSY
    #[cfg(unix)]
    fn probe_retrying(probe: &FfprobeProbe, path: &Path) -> Result<MediaInfo> {
        for _ in 0..20 {
            match probe.probe(path) {
                Err(UpbatchError::CommandFailed { stderr, .. }) if stderr.contains("busy") => {
                    std::thread::sleep(Duration::from_millis(50));
                }
                other => return other,
            }
        }
        probe.probe(path)
    }

    #[cfg(unix)]
    #[test]
    fn test_fake_ffprobe_output_is_parsed() {
        let dir = tempfile::TempDir::new().unwrap();
        let program = fake_ffprobe(dir.path(), "echo height=576; echo field_order=bb");
        let info = probe_retrying(&FfprobeProbe::new(program), Path::new("x.mkv")).unwrap();
        assert_eq!(
            info,
            MediaInfo {
                height: 576,
                interlaced: true
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_hung_ffprobe_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let program = fake_ffprobe(dir.path(), "sleep 30");
        let probe = FfprobeProbe::new(program).with_timeout(Duration::from_millis(300));

        let started = std::time::Instant::now();
        let err = probe_retrying(&probe, Path::new("x.mkv")).unwrap_err();
        assert!(matches!(err, UpbatchError::CommandFailed { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
