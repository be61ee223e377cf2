//! # 进度账本
//!
//! 记录某个输出目录下哪些作业待处理、哪些已完成，跨多次运行保持。
//!
//! ## 文件布局
//! ```text
//! <output_dir>/.upbatch/todo.txt   本次（或上次）扫描得到的全部输入，按发现顺序
//! <output_dir>/.upbatch/done.txt   已完成的输入，只追加
//! ```
//!
//! `remaining = todo − done`，保持 `todo` 的原始顺序。`done` 在输出目录的
//! 整个生命周期内单调增长：非续传运行只重写 `todo`，从不截断 `done`。
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs`, `commands/status.rs` 使用
//! - 子模块: store

pub mod store;

pub use store::{FlatFileSet, MemorySet, PathSet};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// 账本状态目录名
pub const LEDGER_DIR: &str = ".upbatch";
pub const TODO_FILE: &str = "todo.txt";
pub const DONE_FILE: &str = "done.txt";

/// 进度账本
pub struct Ledger {
    todo: Vec<PathBuf>,
    done: Box<dyn PathSet>,
}

impl Ledger {
    /// 由现成的 todo 列表和 done 存储构造
    pub fn new(todo: Vec<PathBuf>, done: Box<dyn PathSet>) -> Self {
        Ledger { todo, done }
    }

    /// 账本目录
    pub fn dir(output_dir: &Path) -> PathBuf {
        output_dir.join(LEDGER_DIR)
    }

    /// 输出目录下是否已有账本
    pub fn exists(output_dir: &Path) -> bool {
        Self::dir(output_dir).join(TODO_FILE).is_file()
    }

    /// 初始化账本
    ///
    /// `resume` 为 false 或不存在 todo 文件时调用 `scan` 重新扫描，并原子地重写
    /// todo；否则沿用已有 todo。done 保持不变。
    pub fn initialize<F>(output_dir: &Path, resume: bool, scan: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<PathBuf>>,
    {
        let dir = Self::dir(output_dir);
        let todo_path = dir.join(TODO_FILE);

        let todo = if resume && todo_path.is_file() {
            let todo = store::read_path_list(&todo_path)?;
            tracing::info!(entries = todo.len(), "resuming existing ledger");
            todo
        } else {
            let todo = scan()?;
            store::write_path_list(&todo_path, &todo)?;
            tracing::info!(entries = todo.len(), "wrote fresh todo list");
            todo
        };

        let done = FlatFileSet::open(&dir.join(DONE_FILE))?;
        Ok(Ledger::new(todo, Box::new(done)))
    }

    /// 与 `initialize` 相同的选择逻辑，但不写任何文件（dry-run）
    pub fn preview<F>(output_dir: &Path, resume: bool, scan: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<PathBuf>>,
    {
        let dir = Self::dir(output_dir);
        let todo_path = dir.join(TODO_FILE);
        let done_path = dir.join(DONE_FILE);

        let todo = if resume && todo_path.is_file() {
            store::read_path_list(&todo_path)?
        } else {
            scan()?
        };

        let done = if done_path.is_file() {
            store::read_path_list(&done_path)?
        } else {
            Vec::new()
        };

        Ok(Ledger::new(todo, Box::new(MemorySet::from_paths(done))))
    }

    /// 只读打开已有账本（status 命令）
    pub fn open(output_dir: &Path) -> Result<Self> {
        Self::preview(output_dir, true, || Ok(Vec::new()))
    }

    pub fn todo(&self) -> &[PathBuf] {
        &self.todo
    }

    pub fn done(&self) -> Vec<PathBuf> {
        self.done.snapshot()
    }

    pub fn is_done(&self, path: &Path) -> bool {
        self.done.contains(path)
    }

    /// 剩余作业：todo − done，保持发现顺序
    pub fn remaining(&self) -> Vec<PathBuf> {
        self.todo
            .iter()
            .filter(|p| !self.done.contains(p))
            .cloned()
            .collect()
    }

    /// 标记完成并立即持久化
    pub fn mark_done(&self, path: &Path) -> Result<()> {
        if self.done.add(path)? {
            tracing::debug!(path = %path.display(), "marked done");
        }
        Ok(())
    }
}
