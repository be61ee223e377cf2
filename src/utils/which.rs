//! # 可执行文件查找
//!
//! 在运行前确认外部处理命令存在，作为配置错误提前失败。
//!
//! ## 依赖关系
//! - 被 `config.rs` 使用

use std::env;
use std::path::{Path, PathBuf};

/// 查找可执行文件
///
/// 含路径分隔符的名称按路径检查，否则在 `PATH` 中搜索。
pub fn find_executable(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return program.is_file().then(|| program.to_path_buf());
    }

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_find_sh() {
        assert!(find_executable(Path::new("sh")).is_some());
        assert!(find_executable(Path::new("/bin/sh")).is_some());
    }

    #[test]
    fn test_missing_program() {
        assert!(find_executable(Path::new("upbatch-no-such-tool")).is_none());
        assert!(find_executable(Path::new("/nonexistent/dir/tool")).is_none());
    }
}
