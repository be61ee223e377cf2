//! # 文件收集器
//!
//! 扫描输入目录，按扩展名过滤出待处理的媒体文件。
//!
//! ## 功能
//! - 扩展名过滤（不区分大小写）
//! - 文件名 glob 排除模式
//! - 可选递归目录搜索
//! - 结果按路径排序，作为账本的发现顺序
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs` 调用
//! - 使用 `walkdir` 遍历目录

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// 文件收集器
pub struct FileCollector {
    /// 输入目录
    input: PathBuf,
    /// 小写扩展名列表
    extensions: Vec<String>,
    /// 排除模式
    exclude: Vec<glob::Pattern>,
    /// 不进入的目录（输出目录位于输入目录内部时）
    skip_dir: Option<PathBuf>,
    /// 是否递归
    recursive: bool,
}

impl FileCollector {
    /// 创建新的文件收集器
    pub fn new(input: PathBuf) -> Self {
        Self {
            input,
            extensions: Vec::new(),
            exclude: Vec::new(),
            skip_dir: None,
            recursive: false,
        }
    }

    /// 设置扩展名过滤
    pub fn with_extensions(mut self, extensions: &[String]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_ascii_lowercase()).collect();
        self
    }

    /// 设置排除模式
    pub fn with_exclude(mut self, exclude: &[glob::Pattern]) -> Self {
        self.exclude = exclude.to_vec();
        self
    }

    /// 跳过某个目录及其内容
    pub fn skip_dir(mut self, dir: &Path) -> Self {
        self.skip_dir = Some(dir.to_path_buf());
        self
    }

    /// 设置是否递归搜索
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// 收集所有匹配的文件
    pub fn collect(&self) -> Vec<PathBuf> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        let walker = WalkDir::new(&self.input)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.is_skipped_dir(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file());

        let mut files: Vec<PathBuf> = walker
            .filter(|entry| self.accepts(entry.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        files.sort();
        files
    }

    fn is_skipped_dir(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return false;
        }
        if is_hidden(entry.path()) {
            return true;
        }
        matches!(&self.skip_dir, Some(dir) if entry.path() == dir.as_path())
    }

    /// 检查文件是否需要处理
    fn accepts(&self, path: &Path) -> bool {
        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => {
                tracing::warn!(path = %path.display(), "skipping file with non UTF-8 name");
                return false;
            }
        };

        // 隐藏文件，包括本工具的临时输出
        if filename.starts_with('.') {
            return false;
        }

        // 账本一行一个路径
        if path.to_str().map_or(true, |p| p.contains('\n') || p.contains('\r')) {
            tracing::warn!(path = %path.display(), "skipping path that cannot be stored in the ledger");
            return false;
        }

        let ext_ok = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|want| want.eq_ignore_ascii_case(e)))
            .unwrap_or(false);
        if !ext_ok {
            return false;
        }

        !self.exclude.iter().any(|p| p.matches(filename))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, rel: &str) {
        let path = dir.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"x").unwrap();
    }

    fn names(files: &[PathBuf], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().display().to_string())
            .collect()
    }

    fn exts() -> Vec<String> {
        vec!["mkv".to_string(), "mp4".to_string()]
    }

    #[test]
    fn test_extension_filter_and_order() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "b.MKV");
        touch(dir.path(), "a.mp4");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), ".hidden.mkv");
        touch(dir.path(), "sub/c.mkv");

        let files = FileCollector::new(dir.path().to_path_buf())
            .with_extensions(&exts())
            .collect();
        assert_eq!(names(&files, dir.path()), vec!["a.mp4", "b.MKV"]);
    }

    #[test]
    fn test_recursive_skips_output_and_hidden_dirs() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "s1/e1.mkv");
        touch(dir.path(), "s2/e2.mkv");
        touch(dir.path(), "out/e1_4K.mkv");
        touch(dir.path(), ".upbatch/x.mkv");

        let files = FileCollector::new(dir.path().to_path_buf())
            .with_extensions(&exts())
            .skip_dir(&dir.path().join("out"))
            .recursive(true)
            .collect();
        assert_eq!(names(&files, dir.path()), vec!["s1/e1.mkv", "s2/e2.mkv"]);
    }

    #[test]
    fn test_exclude_patterns() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "episode.mkv");
        touch(dir.path(), "episode-sample.mkv");

        let files = FileCollector::new(dir.path().to_path_buf())
            .with_extensions(&exts())
            .with_exclude(&[glob::Pattern::new("*sample*").unwrap()])
            .collect();
        assert_eq!(names(&files, dir.path()), vec!["episode.mkv"]);
    }
}
