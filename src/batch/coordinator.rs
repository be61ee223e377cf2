//! # 批处理协调器
//!
//! 作业状态机：
//! ```text
//! PENDING ─┬─> SKIPPED                      (输出已存在且启用 skip-existing)
//!          └─> RUNNING ─┬─> DONE            (退出码 0，临时输出改名为最终输出)
//!                       ├─> FAILED          (非零退出/超时/启动失败/无输出)
//!                       └─> INTERRUPTED     (用户中断时被终止)
//! ```
//!
//! 只有 DONE 和 SKIPPED 会写入账本的 done 集合；FAILED/INTERRUPTED 留待下次续传重试。
//! 单个作业失败不会中止批处理。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs` 调用
//! - 使用 `batch/{collector, runner, invoker, report}`, `ledger/`, `resolver/`

use super::collector::FileCollector;
use super::invoker::{Invocation, InvokeOutcome, Invoker};
use super::report;
use super::runner::BatchRunner;
use crate::config::RunConfig;
use crate::error::{Result, UpbatchError};
use crate::ledger::Ledger;
use crate::models::{BatchSummary, Job, JobOutcome, JobStatus};
use crate::resolver::{PresetResolver, Resolution};
use crate::utils::interrupt::CancelFlag;
use crate::utils::{output, progress};

use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

/// dry-run 计划中的一项
#[derive(Debug, Clone)]
pub struct PlannedJob {
    pub job: Job,
    /// None 表示输出已存在、会被跳过
    pub resolution: Option<Resolution>,
}

/// 进度计数（用于逐作业提示）
#[derive(Default)]
struct Tally {
    processed: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    fn record(&self, status: JobStatus) -> String {
        match status {
            JobStatus::Done => self.processed.fetch_add(1, Ordering::SeqCst),
            JobStatus::Skipped => self.skipped.fetch_add(1, Ordering::SeqCst),
            JobStatus::Failed => self.failed.fetch_add(1, Ordering::SeqCst),
            _ => 0,
        };
        format!(
            "processed={} skipped={} failed={}",
            self.processed.load(Ordering::SeqCst),
            self.skipped.load(Ordering::SeqCst),
            self.failed.load(Ordering::SeqCst)
        )
    }
}

/// 批处理协调器
pub struct Coordinator<'a> {
    config: &'a RunConfig,
    resolver: &'a PresetResolver,
    cancel: CancelFlag,
    show_progress: bool,
}

impl<'a> Coordinator<'a> {
    pub fn new(config: &'a RunConfig, resolver: &'a PresetResolver, cancel: CancelFlag) -> Self {
        Self {
            config,
            resolver,
            cancel,
            show_progress: false,
        }
    }

    /// 是否显示进度条
    pub fn show_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// 扫描输入目录
    pub fn discover(&self) -> Vec<PathBuf> {
        let files = FileCollector::new(self.config.input_dir.clone())
            .with_extensions(&self.config.extensions)
            .with_exclude(&self.config.exclude)
            .skip_dir(&self.config.output_dir)
            .recursive(self.config.recursive)
            .collect();

        // 输出目录与输入目录相同时，不把已有输出当作新输入
        if self.config.output_dir != self.config.input_dir || self.config.suffix.is_empty() {
            return files;
        }
        files
            .into_iter()
            .filter(|f| {
                !f.file_stem()
                    .map(|s| s.to_string_lossy().ends_with(&self.config.suffix))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn job_for(&self, input: &Path) -> Job {
        Job::new(
            input.to_path_buf(),
            &self.config.input_dir,
            &self.config.output_dir,
            &self.config.suffix,
            self.config.recursive,
        )
    }

    fn pending(&self, ledger: &Ledger) -> Vec<PathBuf> {
        // --force 重新处理 todo 中的全部条目，done 集合保持不变
        if self.config.force {
            ledger.todo().to_vec()
        } else {
            ledger.remaining()
        }
    }

    /// dry-run：只计算计划，不写任何文件、不调用外部命令
    pub fn plan(&self) -> Result<Vec<PlannedJob>> {
        let ledger = Ledger::preview(&self.config.output_dir, self.config.resume, || {
            Ok(self.discover())
        })?;

        Ok(self
            .pending(&ledger)
            .iter()
            .map(|input| {
                let job = self.job_for(input);
                let resolution = if self.config.skip_existing && job.output.exists() {
                    None
                } else {
                    Some(self.resolver.resolve(input))
                };
                PlannedJob { job, resolution }
            })
            .collect())
    }

    /// 执行批处理并写入汇总报告
    pub fn run(&self) -> Result<BatchSummary> {
        let out_dir = &self.config.output_dir;
        fs::create_dir_all(out_dir).map_err(|e| UpbatchError::FileWriteError {
            path: out_dir.display().to_string(),
            source: e,
        })?;

        let ledger = Ledger::initialize(out_dir, self.config.resume, || Ok(self.discover()))?;
        let pending = self.pending(&ledger);

        let runner = BatchRunner::new(self.config.jobs);
        output::print_info(&format!(
            "{} file(s) in ledger, {} to process with {} worker(s)",
            ledger.todo().len(),
            pending.len(),
            runner.jobs().min(pending.len()).max(1)
        ));

        let pb = if self.show_progress {
            progress::create_progress_bar(pending.len() as u64, "")
        } else {
            progress::hidden()
        };

        let tally = Tally::default();
        let invoker = Invoker::new(
            &self.config.processor,
            self.cancel.clone(),
            !self.config.wait_on_interrupt,
        );
        let started = Instant::now();

        let outcomes = runner.run(&pending, &self.cancel, |input| {
            let outcome = self.process(input, &ledger, &invoker);
            let counts = tally.record(outcome.status());
            report_outcome(&pb, &outcome, &counts);
            pb.set_message(counts);
            pb.inc(1);
            outcome
        })?;

        pb.finish_and_clear();

        let mut summary = BatchSummary {
            planned: pending.len(),
            cancelled: self.cancel.is_cancelled(),
            elapsed: started.elapsed(),
            ..Default::default()
        };
        for outcome in outcomes {
            summary.merge(outcome);
        }
        summary.remaining = ledger.remaining().len();

        report::write_summary(&out_dir.join(report::SUMMARY_FILE), self.config, &summary)?;
        report::write_results_csv(&out_dir.join(report::RESULTS_FILE), &summary)?;

        Ok(summary)
    }

    /// 处理单个作业
    fn process(&self, input: &Path, ledger: &Ledger, invoker: &Invoker<'_>) -> JobOutcome {
        let started = Instant::now();
        let mut job = self.job_for(input);

        let finish = |mut job: Job, status: JobStatus, message: Option<String>| {
            job.status = status;
            JobOutcome {
                job,
                duration: started.elapsed(),
                message,
            }
        };

        if self.config.skip_existing && job.output.exists() {
            return match ledger.mark_done(input) {
                Ok(()) => finish(job, JobStatus::Skipped, None),
                Err(e) => finish(job, JobStatus::Failed, Some(e.to_string())),
            };
        }

        if !input.is_file() {
            return finish(
                job,
                JobStatus::Failed,
                Some("input file no longer exists".to_string()),
            );
        }

        let resolution = self.resolver.resolve(input);
        job.preset = Some(resolution.preset);
        job.status = JobStatus::Running;
        tracing::info!(
            input = %input.display(),
            preset = %resolution.preset,
            source = %resolution.source,
            "starting job"
        );

        if let Err(e) = prepare_output_dir(&job) {
            return finish(job, JobStatus::Failed, Some(e.to_string()));
        }

        let mut env: Vec<(String, String)> = resolution
            .preset
            .preset()
            .env_vars()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        env.push(("UPSCALE_INPUT".to_string(), input.display().to_string()));
        env.push((
            "UPSCALE_OUTPUT".to_string(),
            job.temp_output.display().to_string(),
        ));
        env.extend(self.config.processor.env.iter().cloned());

        let invoked = invoker.run(&Invocation {
            input,
            output: &job.temp_output,
            log: &job.log,
            env,
        });

        let (status, message) = match invoked {
            Ok(InvokeOutcome::Success) => match self.commit(&job, ledger) {
                Ok(()) => (JobStatus::Done, None),
                Err(reason) => (JobStatus::Failed, Some(reason)),
            },
            Ok(InvokeOutcome::Cancelled) => (
                JobStatus::Interrupted,
                Some("killed by user interrupt".to_string()),
            ),
            Ok(InvokeOutcome::Exited(Some(code))) => (
                JobStatus::Failed,
                Some(format!("processor exited with status {}", code)),
            ),
            Ok(InvokeOutcome::Exited(None)) => (
                JobStatus::Failed,
                Some("processor terminated by signal".to_string()),
            ),
            Ok(InvokeOutcome::TimedOut(limit)) => (
                JobStatus::Failed,
                Some(format!("timed out after {}s", limit.as_secs())),
            ),
            Ok(InvokeOutcome::SpawnFailed(reason)) => (JobStatus::Failed, Some(reason)),
            Err(e) => (JobStatus::Failed, Some(e.to_string())),
        };

        if status != JobStatus::Done {
            discard_partial(&job.temp_output);
        }
        finish(job, status, message)
    }

    /// 临时输出改名为最终输出并记入账本
    fn commit(&self, job: &Job, ledger: &Ledger) -> std::result::Result<(), String> {
        if !job.temp_output.is_file() {
            return Err("processor exited 0 but produced no output".to_string());
        }
        fs::rename(&job.temp_output, &job.output).map_err(|e| {
            format!(
                "failed to move {} to {}: {}",
                job.temp_output.display(),
                job.output.display(),
                e
            )
        })?;
        ledger.mark_done(&job.input).map_err(|e| e.to_string())
    }
}

fn prepare_output_dir(job: &Job) -> Result<()> {
    if let Some(parent) = job.output.parent() {
        fs::create_dir_all(parent).map_err(|e| UpbatchError::FileWriteError {
            path: parent.display().to_string(),
            source: e,
        })?;
    }
    discard_partial(&job.temp_output);
    Ok(())
}

fn discard_partial(path: &Path) {
    if path.exists() {
        if let Err(e) = fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %e, "could not remove partial output");
        }
    }
}

/// 逐作业提示
fn report_outcome(pb: &ProgressBar, outcome: &JobOutcome, counts: &str) {
    let name = outcome.job.display_name();
    let preset = outcome
        .job
        .preset
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());

    pb.suspend(|| match outcome.status() {
        JobStatus::Done => output::print_success(&format!(
            "{} [{}] {:.0}s ({})",
            name,
            preset,
            outcome.duration.as_secs_f64(),
            counts
        )),
        JobStatus::Skipped => {
            output::print_skip(&format!("{} (output exists) ({})", name, counts))
        }
        JobStatus::Failed => {
            let reason = outcome.message.as_deref().unwrap_or("unknown error");
            output::print_error(&format!(
                "{} [{}] {}; log: {} ({})",
                name,
                preset,
                reason,
                outcome.job.log.display(),
                counts
            ));
            tracing::error!(input = %outcome.job.input.display(), reason, "job failed");
        }
        JobStatus::Interrupted => output::print_interrupted(&format!("{} [{}]", name, preset)),
        JobStatus::Pending | JobStatus::Running => {}
    });
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::ledger::{DONE_FILE, TODO_FILE};
    use crate::models::PresetName;
    use clap::Parser;
    use tempfile::TempDir;

    /// 复制输入到输出，并在 $COUNT_FILE 中记录调用次数
    const COPY_SCRIPT: &str =
        "echo \"$UPSCALE_PRESET $1\" >> \"$COUNT_FILE\"; cp \"$1\" \"$2\"";

    struct Fixture {
        input: TempDir,
        output: TempDir,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let input = TempDir::new().unwrap();
            for f in files {
                fs::write(input.path().join(f), format!("content of {}", f)).unwrap();
            }
            Fixture {
                input,
                output: TempDir::new().unwrap(),
            }
        }

        fn count_file(&self) -> PathBuf {
            self.output.path().join("invocations.txt")
        }

        fn config(&self, script: &str, extra: &[&str]) -> RunConfig {
            let count = format!("COUNT_FILE={}", self.count_file().display());
            let mut argv = vec![
                "upbatch".to_string(),
                "run".to_string(),
                self.input.path().display().to_string(),
                self.output.path().display().to_string(),
                "--no-probe".to_string(),
                "--processor".to_string(),
                "sh".to_string(),
                "--processor-arg=-c".to_string(),
                format!("--processor-arg={}", script),
                "--processor-arg=stub".to_string(),
                "--set".to_string(),
                count,
            ];
            argv.extend(extra.iter().map(|s| s.to_string()));
            match Cli::try_parse_from(argv).unwrap().command {
                Commands::Run(args) => RunConfig::from_args(args).unwrap(),
                _ => unreachable!(),
            }
        }

        fn run(&self, script: &str, extra: &[&str]) -> BatchSummary {
            let config = self.config(script, extra);
            let resolver = config.build_resolver().unwrap();
            Coordinator::new(&config, &resolver, CancelFlag::new())
                .run()
                .unwrap()
        }

        fn invocations(&self) -> Vec<String> {
            fs::read_to_string(self.count_file())
                .unwrap_or_default()
                .lines()
                .map(str::to_string)
                .collect()
        }

        fn done(&self) -> String {
            fs::read_to_string(Ledger::dir(self.output.path()).join(DONE_FILE))
                .unwrap_or_default()
        }

        fn out(&self, name: &str) -> PathBuf {
            self.output.path().join(name)
        }
    }

    #[test]
    fn test_existing_output_is_skipped() {
        let fx = Fixture::new(&["ep1.mkv", "ep2.mkv", "ep3.mkv"]);
        fs::write(fx.out("ep2_4K.mkv"), b"already upscaled").unwrap();

        let summary = fx.run(COPY_SCRIPT, &[]);

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert!(summary.is_success());
        assert_eq!(fs::read(fx.out("ep2_4K.mkv")).unwrap(), b"already upscaled");
        assert_eq!(
            fs::read_to_string(fx.out("ep1_4K.mkv")).unwrap(),
            "content of ep1.mkv"
        );
        assert_eq!(fx.invocations().len(), 2);

        // 跳过的作业也记入 done
        let done = fx.done();
        for name in ["ep1.mkv", "ep2.mkv", "ep3.mkv"] {
            assert!(done.contains(name), "{} missing from done", name);
        }

        let report = fs::read_to_string(fx.out(report::SUMMARY_FILE)).unwrap();
        assert!(report.contains("processed=2"));
        assert!(report.contains("skipped=1"));
        assert!(report.contains("failed=0"));
        assert!(fx.out(report::RESULTS_FILE).is_file());
        assert!(fx.out("logs/ep1_4K.mkv.log").is_file());
    }

    #[test]
    fn test_failing_processor() {
        let fx = Fixture::new(&["a.mkv", "b.mkv", "c.mkv"]);
        let summary = fx.run("echo \"$1\" >> \"$COUNT_FILE\"; : > \"$2\"; exit 1", &[]);

        assert_eq!(summary.failed, 3);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.remaining, 3);
        assert!(!summary.is_success());
        assert!(fx.done().is_empty());

        // 部分输出被丢弃，不会被误认为完成
        for name in ["a_4K.mkv", "b_4K.mkv", "c_4K.mkv"] {
            assert!(!fx.out(name).exists());
            assert!(!fx.out(&format!(".{}", name.replace(".mkv", ".partial.mkv"))).exists());
        }

        let report = fs::read_to_string(fx.out(report::SUMMARY_FILE)).unwrap();
        assert!(report.contains("failed=3"));
        assert!(report.contains("[failures]"));
    }

    #[test]
    fn test_failed_jobs_are_retried_on_resume() {
        let fx = Fixture::new(&["a.mkv", "b.mkv"]);
        // 第一次运行 b 失败
        let flaky = "case \"$1\" in *b.mkv) exit 2;; esac; echo \"$1\" >> \"$COUNT_FILE\"; cp \"$1\" \"$2\"";
        let first = fx.run(flaky, &[]);
        assert_eq!((first.processed, first.failed), (1, 1));
        assert!(!fx.done().contains("b.mkv"));

        let second = fx.run(COPY_SCRIPT, &["--resume"]);
        assert_eq!((second.processed, second.failed, second.planned), (1, 0, 1));
        assert!(fx.done().contains("b.mkv"));
    }

    #[test]
    fn test_resume_is_idempotent() {
        let fx = Fixture::new(&["a.mkv", "b.mkv"]);
        fx.run(COPY_SCRIPT, &[]);
        assert_eq!(fx.invocations().len(), 2);

        let again = fx.run(COPY_SCRIPT, &["--resume"]);
        assert_eq!(again.planned, 0);
        assert_eq!(fx.invocations().len(), 2);
    }

    #[test]
    fn test_crash_recovery_resumes_only_pending() {
        let fx = Fixture::new(&["a.mkv", "b.mkv", "c.mkv"]);
        // 模拟上次运行在 a 完成后被杀死：todo 已写、done 只有 a
        let input = fx.input.path().canonicalize().unwrap();
        let ledger_dir = Ledger::dir(fx.output.path());
        fs::create_dir_all(&ledger_dir).unwrap();
        let todo: String = ["a.mkv", "b.mkv", "c.mkv"]
            .iter()
            .map(|n| format!("{}\n", input.join(n).display()))
            .collect();
        fs::write(ledger_dir.join(TODO_FILE), todo).unwrap();
        fs::write(
            ledger_dir.join(DONE_FILE),
            format!("{}\n", input.join("a.mkv").display()),
        )
        .unwrap();
        // 被杀死的作业留下的临时输出
        fs::write(fx.out(".b_4K.partial.mkv"), b"half").unwrap();

        let summary = fx.run(COPY_SCRIPT, &["--resume"]);

        assert_eq!(summary.processed, 2);
        let calls = fx.invocations();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| !c.ends_with("a.mkv")));
        assert_eq!(
            fs::read_to_string(fx.out("b_4K.mkv")).unwrap(),
            "content of b.mkv"
        );
        assert!(!fx.out(".b_4K.partial.mkv").exists());
    }

    #[test]
    fn test_manual_override_applies_to_every_job() {
        let fx = Fixture::new(&["Show S01E01.mkv", "Show S07E01.mkv", "movie night.mkv"]);
        let summary = fx.run(COPY_SCRIPT, &["--preset", "hd-720"]);

        assert_eq!(summary.processed, 3);
        for outcome in &summary.outcomes {
            assert_eq!(outcome.job.preset, Some(PresetName::Hd720));
        }
        assert!(fx.invocations().iter().all(|c| c.starts_with("hd-720 ")));
    }

    #[test]
    fn test_filename_rules_drive_presets() {
        let fx = Fixture::new(&["Show S01E01.mkv", "Show S07E01.mkv"]);
        let summary = fx.run(COPY_SCRIPT, &[]);

        let presets: Vec<_> = summary.outcomes.iter().map(|o| o.job.preset).collect();
        assert_eq!(
            presets,
            vec![Some(PresetName::DvdInterlaced), Some(PresetName::Hd1080)]
        );
    }

    #[test]
    fn test_force_reprocesses_done_and_existing() {
        let fx = Fixture::new(&["a.mkv"]);
        fx.run(COPY_SCRIPT, &[]);
        fs::write(fx.out("a_4K.mkv"), b"stale").unwrap();

        let summary = fx.run(COPY_SCRIPT, &["--force"]);
        assert_eq!(summary.processed, 1);
        assert_eq!(fx.invocations().len(), 2);
        assert_eq!(
            fs::read_to_string(fx.out("a_4K.mkv")).unwrap(),
            "content of a.mkv"
        );
    }

    #[test]
    fn test_parallel_run_marks_everything_done_once() {
        let names: Vec<String> = (0..12).map(|i| format!("ep{:02}.mkv", i)).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        let fx = Fixture::new(&refs);

        let summary = fx.run(COPY_SCRIPT, &["--jobs", "4"]);

        assert_eq!(summary.processed, 12);
        assert_eq!(fx.invocations().len(), 12);
        assert_eq!(fx.done().lines().count(), 12);
        assert_eq!(summary.remaining, 0);
    }

    #[test]
    fn test_zero_exit_without_output_fails() {
        let fx = Fixture::new(&["a.mkv"]);
        let summary = fx.run("exit 0", &[]);
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].1.contains("no output"));
    }

    #[test]
    fn test_timeout_marks_failed() {
        let fx = Fixture::new(&["a.mkv"]);
        let summary = fx.run("sleep 30", &["--timeout", "1"]);
        assert_eq!(summary.failed, 1);
        assert!(summary.failures[0].1.contains("timed out"));
        assert!(fx.done().is_empty());
    }

    #[test]
    fn test_interrupt_leaves_ledger_consistent() {
        let fx = Fixture::new(&["a.mkv", "b.mkv", "c.mkv"]);
        let config = fx.config(COPY_SCRIPT, &[]);
        let resolver = config.build_resolver().unwrap();
        let cancel = CancelFlag::new();

        // 第一个作业完成后取消：后续作业不再领取
        let count_file = fx.count_file();
        let trigger = cancel.clone();
        let watcher = std::thread::spawn(move || {
            for _ in 0..200 {
                if count_file.exists() {
                    trigger.cancel();
                    return;
                }
                std::thread::sleep(std::time::Duration::from_millis(5));
            }
        });

        let summary = Coordinator::new(&config, &resolver, cancel).run().unwrap();
        watcher.join().unwrap();

        assert!(summary.cancelled);
        let done = fx.done();
        // 已完成的作业保持在 done 中，未完成的都不在
        for outcome in &summary.outcomes {
            let name = outcome.job.display_name();
            assert_eq!(
                done.contains(&name),
                outcome.status() == JobStatus::Done,
                "{}",
                name
            );
        }
        assert!(summary.remaining >= 1);
    }

    #[test]
    fn test_wait_on_interrupt_finishes_running_job() {
        let fx = Fixture::new(&["a.mkv", "b.mkv"]);
        let script = format!("sleep 1; {}", COPY_SCRIPT);
        let config = fx.config(&script, &["--wait-on-interrupt"]);
        let resolver = config.build_resolver().unwrap();
        let cancel = CancelFlag::new();

        let trigger = cancel.clone();
        let watcher = std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_millis(300));
            trigger.cancel();
        });

        let summary = Coordinator::new(&config, &resolver, cancel).run().unwrap();
        watcher.join().unwrap();

        assert!(summary.cancelled);
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.interrupted, 0);
        assert_eq!(summary.remaining, 1);
        assert!(fx.out("a_4K.mkv").is_file());
        assert!(!fx.out("b_4K.mkv").exists());
        assert_eq!(fx.invocations().len(), 1);
    }

    #[test]
    fn test_dry_run_plans_without_writing() {
        let fx = Fixture::new(&["Show S02E01.mkv", "b.mkv"]);
        fs::write(fx.out("b_4K.mkv"), b"exists").unwrap();
        let config = fx.config("exit 1", &["--dry-run"]);
        let resolver = config.build_resolver().unwrap();

        let plan = Coordinator::new(&config, &resolver, CancelFlag::new())
            .plan()
            .unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[0].resolution.as_ref().map(|r| r.preset),
            Some(PresetName::DvdInterlaced)
        );
        assert!(plan[1].resolution.is_none());
        assert!(!Ledger::dir(fx.output.path()).exists());
        assert!(fx.invocations().is_empty());
    }
}
