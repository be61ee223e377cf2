//! # 用户中断处理
//!
//! Ctrl-C 只设置共享的取消标志；worker 在领取作业和等待外部进程时轮询该标志。
//!
//! ## 依赖关系
//! - 被 `commands/run.rs`, `batch/` 使用
//! - 使用 `ctrlc` crate

use crate::error::{Result, UpbatchError};
use crate::utils::output;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 可克隆的取消标志
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 安装 Ctrl-C 处理器
pub fn install_handler(flag: &CancelFlag) -> Result<()> {
    let flag = flag.clone();
    ctrlc::set_handler(move || {
        if !flag.is_cancelled() {
            output::print_warning("Interrupt received, stopping batch...");
        }
        flag.cancel();
    })
    .map_err(|e| UpbatchError::Other(format!("Failed to install interrupt handler: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        assert!(!other.is_cancelled());
        flag.cancel();
        assert!(other.is_cancelled());
    }
}
