//! # 路径集合存储
//!
//! 进度账本中 `done` 集合的存储抽象。账本只通过 `PathSet` 访问存储，
//! 存储格式（纯文本文件、内存）可以替换而不影响协调器逻辑。
//!
//! ## 纯文本格式
//! 每行一个路径，只追加不删除。进程在写入途中被杀死时可能留下不完整的末行，
//! 下次追加前会先补齐换行。
//!
//! ## 依赖关系
//! - 被 `ledger/mod.rs` 使用
//! - 无外部模块依赖

use crate::error::{Result, UpbatchError};

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 只追加的路径集合
pub trait PathSet: Send + Sync {
    /// 是否包含该路径
    fn contains(&self, path: &Path) -> bool;

    /// 追加路径并持久化；路径已存在时返回 `Ok(false)`
    fn add(&self, path: &Path) -> Result<bool>;

    /// 按追加顺序返回全部路径
    fn snapshot(&self) -> Vec<PathBuf>;
}

#[derive(Default)]
struct Entries {
    set: HashSet<PathBuf>,
    order: Vec<PathBuf>,
}

impl Entries {
    fn insert(&mut self, path: PathBuf) -> bool {
        if self.set.contains(&path) {
            return false;
        }
        self.set.insert(path.clone());
        self.order.push(path);
        true
    }
}

/// 内存路径集合（dry-run 和测试使用）
#[derive(Default)]
pub struct MemorySet {
    entries: Mutex<Entries>,
}

impl MemorySet {
    pub fn from_paths(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut entries = Entries::default();
        for p in paths {
            entries.insert(p);
        }
        MemorySet {
            entries: Mutex::new(entries),
        }
    }
}

impl PathSet for MemorySet {
    fn contains(&self, path: &Path) -> bool {
        lock(&self.entries).set.contains(path)
    }

    fn add(&self, path: &Path) -> Result<bool> {
        Ok(lock(&self.entries).insert(path.to_path_buf()))
    }

    fn snapshot(&self) -> Vec<PathBuf> {
        lock(&self.entries).order.clone()
    }
}

struct FlatFileInner {
    entries: Entries,
    /// 文件末尾缺少换行（上次写入被打断）
    needs_newline: bool,
}

/// 纯文本文件路径集合，每行一个路径
pub struct FlatFileSet {
    path: PathBuf,
    inner: Mutex<FlatFileInner>,
}

impl FlatFileSet {
    /// 打开（不存在时视为空集合，首次追加时创建文件）
    pub fn open(path: &Path) -> Result<Self> {
        let mut entries = Entries::default();
        let mut needs_newline = false;

        if path.exists() {
            let content = read_text(path)?;
            for p in parse_lines(&content) {
                entries.insert(p);
            }
            needs_newline = !content.is_empty() && !content.ends_with('\n');
        }

        Ok(FlatFileSet {
            path: path.to_path_buf(),
            inner: Mutex::new(FlatFileInner {
                entries,
                needs_newline,
            }),
        })
    }
}

impl PathSet for FlatFileSet {
    fn contains(&self, path: &Path) -> bool {
        lock(&self.inner).entries.set.contains(path)
    }

    fn add(&self, path: &Path) -> Result<bool> {
        // 追加与持久化在同一把锁内完成，并发 worker 之间不会丢失更新
        let mut inner = lock(&self.inner);
        if inner.entries.set.contains(path) {
            return Ok(false);
        }

        let write_err = |e| UpbatchError::FileWriteError {
            path: self.path.display().to_string(),
            source: e,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(write_err)?;

        let mut line = String::new();
        if inner.needs_newline {
            line.push('\n');
        }
        line.push_str(&path.to_string_lossy());
        line.push('\n');

        file.write_all(line.as_bytes()).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;

        inner.needs_newline = false;
        inner.entries.insert(path.to_path_buf());
        Ok(true)
    }

    fn snapshot(&self) -> Vec<PathBuf> {
        lock(&self.inner).entries.order.clone()
    }
}

/// 读取一行一个路径的列表文件
pub fn read_path_list(path: &Path) -> Result<Vec<PathBuf>> {
    Ok(parse_lines(&read_text(path)?))
}

/// 原子地重写列表文件（写临时文件后 rename）
pub fn write_path_list(path: &Path, paths: &[PathBuf]) -> Result<()> {
    let write_err = |e| UpbatchError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp).map_err(write_err)?;
        for p in paths {
            writeln!(file, "{}", p.to_string_lossy()).map_err(write_err)?;
        }
        file.sync_all().map_err(write_err)?;
    }
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
}

fn read_text(path: &Path) -> Result<String> {
    let mut content = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut content))
        .map_err(|e| UpbatchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(content)
}

fn parse_lines(content: &str) -> Vec<PathBuf> {
    content
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.is_empty())
        .map(PathBuf::from)
        .collect()
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    // 持锁线程 panic 后数据仍然一致（写入要么完成要么未记录）
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
