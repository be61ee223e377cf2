//! # 运行配置
//!
//! 启动时由命令行参数（及 `UPBATCH_*` 环境变量）一次性构造并校验 `RunConfig`，
//! 之后以引用方式传给协调器和预设解析器。所有配置错误都在任何作业运行、
//! 任何账本写入之前报告。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs`, `batch/` 使用
//! - 使用 `cli/run.rs`, `models/preset.rs`, `resolver/`, `utils/which.rs`

use crate::cli::run::RunArgs;
use crate::error::{Result, UpbatchError};
use crate::models::PresetName;
use crate::resolver::{FfprobeProbe, MediaProbe, PresetResolver, RuleTable};
use crate::utils::which;

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 外部处理命令配置
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// 在预设变量之后导出，可覆盖预设值
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

/// run 命令的完整配置
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub recursive: bool,
    /// 小写、不带点
    pub extensions: Vec<String>,
    pub exclude: Vec<glob::Pattern>,
    pub suffix: String,
    pub jobs: usize,
    pub resume: bool,
    pub dry_run: bool,
    pub skip_existing: bool,
    pub force: bool,
    pub wait_on_interrupt: bool,
    pub preset_override: Option<PresetName>,
    pub rules_file: Option<PathBuf>,
    /// ffprobe 程序，None 表示禁用探测
    pub ffprobe: Option<PathBuf>,
    pub processor: ProcessorConfig,
}

impl RunConfig {
    /// 由命令行参数构造并校验
    pub fn from_args(args: RunArgs) -> Result<Self> {
        let input_dir = existing_dir(&args.input_dir)?;
        let output_dir = absolute(&args.output_dir)?;
        if output_dir.exists() && !output_dir.is_dir() {
            return Err(UpbatchError::NotADirectory {
                path: output_dir.display().to_string(),
            });
        }

        let preset_override = args
            .preset
            .as_deref()
            .map(str::parse::<PresetName>)
            .transpose()?;

        if args.suffix.contains('/') || args.suffix.contains('\\') {
            return Err(UpbatchError::InvalidArgument(format!(
                "--suffix must not contain path separators: '{}'",
                args.suffix
            )));
        }
        if args.suffix.is_empty() && output_dir == input_dir {
            return Err(UpbatchError::InvalidArgument(
                "an empty --suffix requires an output directory different from the input"
                    .to_string(),
            ));
        }

        let extensions: Vec<String> = args
            .extensions
            .iter()
            .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if extensions.is_empty() {
            return Err(UpbatchError::InvalidArgument(
                "--ext needs at least one extension".to_string(),
            ));
        }

        let exclude = args
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p).map_err(|e| {
                    UpbatchError::InvalidArgument(format!("Invalid pattern '{}': {}", p, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let jobs = if args.jobs == 0 {
            num_cpus::get()
        } else {
            args.jobs
        };

        let mut env_vars = Vec::new();
        for pair in &args.set {
            env_vars.push(parse_env_pair(pair)?);
        }
        if let Some(crf) = args.crf {
            env_vars.push(("UPSCALE_CRF".to_string(), crf.to_string()));
        }
        if let Some(preset) = &args.encoder_preset {
            env_vars.push(("UPSCALE_ENCODER_PRESET".to_string(), preset.clone()));
        }
        if let Some(gpu) = args.gpu {
            env_vars.push(("UPSCALE_GPU_DEVICE".to_string(), gpu.to_string()));
        }

        // dry-run 不调用处理命令，不要求其存在
        let program = if args.dry_run {
            args.processor.clone()
        } else {
            which::find_executable(&args.processor).ok_or_else(|| {
                UpbatchError::CommandNotFound {
                    command: args.processor.display().to_string(),
                }
            })?
        };

        let ffprobe = if args.no_probe || preset_override.is_some() {
            None
        } else {
            Some(args.ffprobe.clone())
        };

        Ok(RunConfig {
            input_dir,
            output_dir,
            recursive: args.recursive,
            extensions,
            exclude,
            suffix: args.suffix,
            jobs,
            resume: args.resume,
            dry_run: args.dry_run,
            skip_existing: !args.no_skip_existing && !args.force,
            force: args.force,
            wait_on_interrupt: args.wait_on_interrupt,
            preset_override,
            rules_file: args.rules,
            ffprobe,
            processor: ProcessorConfig {
                program,
                args: args.processor_args,
                env: env_vars,
                timeout: args.timeout.filter(|t| *t > 0).map(Duration::from_secs),
            },
        })
    }

    /// 按配置构造预设解析器（规则文件错误属于配置错误）
    pub fn build_resolver(&self) -> Result<PresetResolver> {
        let table = match &self.rules_file {
            Some(path) => RuleTable::from_file(path)?,
            None => RuleTable::builtin()?,
        };
        let probe = self
            .ffprobe
            .as_ref()
            .map(|p| Box::new(FfprobeProbe::new(p.clone())) as Box<dyn MediaProbe>);

        Ok(PresetResolver::new(table)
            .with_override(self.preset_override)
            .with_probe(probe))
    }

    /// 写入汇总报告的配置快照
    pub fn settings(&self) -> Vec<(&'static str, String)> {
        let opt = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        vec![
            ("input_dir", self.input_dir.display().to_string()),
            ("output_dir", self.output_dir.display().to_string()),
            ("recursive", self.recursive.to_string()),
            ("extensions", self.extensions.join(",")),
            ("suffix", self.suffix.clone()),
            ("jobs", self.jobs.to_string()),
            ("resume", self.resume.to_string()),
            ("skip_existing", self.skip_existing.to_string()),
            ("force", self.force.to_string()),
            (
                "preset_override",
                opt(self.preset_override.map(|p| p.to_string())),
            ),
            (
                "rules",
                opt(self.rules_file.as_ref().map(|p| p.display().to_string())),
            ),
            (
                "probe",
                opt(self.ffprobe.as_ref().map(|p| p.display().to_string())),
            ),
            ("processor", self.processor.program.display().to_string()),
            ("processor_args", self.processor.args.join(" ")),
            (
                "timeout_secs",
                opt(self.processor.timeout.map(|t| t.as_secs().to_string())),
            ),
        ]
    }
}

fn existing_dir(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Err(UpbatchError::DirectoryNotFound {
            path: path.display().to_string(),
        });
    }
    if !path.is_dir() {
        return Err(UpbatchError::NotADirectory {
            path: path.display().to_string(),
        });
    }
    path.canonicalize().map_err(|e| UpbatchError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 绝对路径；已存在时规范化，保证与输入目录比较时一致
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return path.canonicalize().map_err(|e| UpbatchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        });
    }
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|e| UpbatchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })
}

fn parse_env_pair(pair: &str) -> Result<(String, String)> {
    match pair.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(UpbatchError::InvalidArgument(format!(
            "--set expects KEY=VALUE, got '{}'",
            pair
        ))),
    }
}
