//! # 作业数据模型
//!
//! 一个作业对应一个输入视频文件，只在一次处理尝试期间存在。
//!
//! ## 输出命名规则
//! ```text
//! <input_dir>/sub/Show S01E01.mkv
//!   -> <output_dir>/sub/Show S01E01_4K.mkv            (最终输出)
//!   -> <output_dir>/sub/.Show S01E01_4K.partial.mkv   (处理中的临时输出)
//!   -> <output_dir>/logs/sub__Show S01E01_4K.mkv.log  (作业日志)
//! ```
//!
//! ## 依赖关系
//! - 被 `batch/` 使用
//! - 使用 `models/preset.rs`

use super::preset::PresetName;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 作业日志子目录名
pub const LOGS_DIR: &str = "logs";

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
    /// 用户中断时被终止的作业
    Interrupted,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
            JobStatus::Interrupted => "interrupted",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 单个作业
#[derive(Debug, Clone)]
pub struct Job {
    /// 输入文件绝对路径
    pub input: PathBuf,
    /// 最终输出路径
    pub output: PathBuf,
    /// 外部命令写入的临时输出路径
    pub temp_output: PathBuf,
    /// 作业日志路径
    pub log: PathBuf,
    pub preset: Option<PresetName>,
    pub status: JobStatus,
}

impl Job {
    /// 根据输入路径推导输出、临时输出和日志路径
    ///
    /// `input_root` 为扫描根目录；`mirror_subdirs` 为 true 时保留输入的相对子目录。
    pub fn new(
        input: PathBuf,
        input_root: &Path,
        output_dir: &Path,
        suffix: &str,
        mirror_subdirs: bool,
    ) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "video".to_string());
        let ext = input.extension().map(|e| e.to_string_lossy().to_string());

        let rel_parent = if mirror_subdirs {
            input
                .parent()
                .and_then(|p| p.strip_prefix(input_root).ok())
                .map(Path::to_path_buf)
                .unwrap_or_default()
        } else {
            PathBuf::new()
        };

        let out_dir = output_dir.join(&rel_parent);
        let output_name = match &ext {
            Some(ext) => format!("{}{}.{}", stem, suffix, ext),
            None => format!("{}{}", stem, suffix),
        };
        let temp_name = match &ext {
            Some(ext) => format!(".{}{}.partial.{}", stem, suffix, ext),
            None => format!(".{}{}.partial", stem, suffix),
        };

        // 镜像子目录时把相对路径压平进日志文件名，避免重名
        let mut log_prefix = String::new();
        for part in rel_parent.components() {
            log_prefix.push_str(&part.as_os_str().to_string_lossy());
            log_prefix.push_str("__");
        }
        let log = output_dir
            .join(LOGS_DIR)
            .join(format!("{}{}.log", log_prefix, output_name));

        Job {
            input,
            output: out_dir.join(output_name),
            temp_output: out_dir.join(temp_name),
            log,
            preset: None,
            status: JobStatus::Pending,
        }
    }

    /// 用于提示信息的短名称
    pub fn display_name(&self) -> String {
        self.input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.input.display().to_string())
    }
}

/// 单个作业的处理结果
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job: Job,
    pub duration: Duration,
    /// 失败或中断原因
    pub message: Option<String>,
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        self.job.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_output_naming() {
        let job = Job::new(
            PathBuf::from("/in/Show S01E01.mkv"),
            Path::new("/in"),
            Path::new("/out"),
            "_4K",
            false,
        );
        assert_eq!(job.output, PathBuf::from("/out/Show S01E01_4K.mkv"));
        assert_eq!(
            job.temp_output,
            PathBuf::from("/out/.Show S01E01_4K.partial.mkv")
        );
        assert_eq!(job.log, PathBuf::from("/out/logs/Show S01E01_4K.mkv.log"));
        assert_eq!(job.status, JobStatus::Pending);
    }

    #[test]
    fn test_mirrored_output_naming() {
        let job = Job::new(
            PathBuf::from("/in/season1/ep01.mp4"),
            Path::new("/in"),
            Path::new("/out"),
            "_UHD",
            true,
        );
        assert_eq!(job.output, PathBuf::from("/out/season1/ep01_UHD.mp4"));
        assert_eq!(
            job.temp_output,
            PathBuf::from("/out/season1/.ep01_UHD.partial.mp4")
        );
        assert_eq!(job.log, PathBuf::from("/out/logs/season1__ep01_UHD.mp4.log"));
    }
}
