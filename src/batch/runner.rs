//! # 批量执行器
//!
//! 有界并行的 worker 池。
//!
//! ## 功能
//! - 基于 rayon 线程池，线程数即并行度（默认 1，即完全串行）
//! - 每个 worker 从共享原子下标领取下一个未领取的条目，领取互斥，
//!   分派顺序即输入顺序
//! - 取消标志置位后不再领取新条目，已领取的条目由处理函数自行决定如何结束
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs` 调用
//! - 使用 `rayon` 进行并行调度

use crate::error::{Result, UpbatchError};
use crate::utils::interrupt::CancelFlag;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
}

impl BatchRunner {
    /// 创建新的批量执行器（0 = CPU 核数）
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 处理条目列表，返回已领取条目的结果（按输入顺序）
    pub fn run<T, R, F>(&self, items: &[T], cancel: &CancelFlag, processor: F) -> Result<Vec<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let workers = self.jobs.min(items.len()).max(1);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("upbatch-worker-{}", i))
            .build()
            .map_err(|e| UpbatchError::WorkerPool(e.to_string()))?;

        let next = AtomicUsize::new(0);
        let results: Mutex<Vec<(usize, R)>> = Mutex::new(Vec::with_capacity(items.len()));

        pool.scope(|s| {
            for _ in 0..workers {
                s.spawn(|_| loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let idx = next.fetch_add(1, Ordering::SeqCst);
                    let Some(item) = items.get(idx) else {
                        break;
                    };
                    let result = processor(item);
                    results
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .push((idx, result));
                });
            }
        });

        let mut results = results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.sort_by_key(|(idx, _)| *idx);
        Ok(results.into_iter().map(|(_, r)| r).collect())
    }
}
