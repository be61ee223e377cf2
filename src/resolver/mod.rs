//! # 预设解析器
//!
//! 为每个输入文件从静态预设集合中选出唯一的预设。
//!
//! ## 解析顺序
//! 1. 手动指定的预设（无条件优先）
//! 2. 文件名正则规则（季数范围、电影关键词）
//! 3. ffprobe 高度/场序探测 + 阈值表
//! 4. 保守默认预设
//!
//! 探测失败不是错误：记录警告后使用默认预设。
//!
//! ## 依赖关系
//! - 被 `batch/coordinator.rs`, `commands/presets.rs` 使用
//! - 子模块: rules, probe

pub mod probe;
pub mod rules;

pub use probe::{FfprobeProbe, MediaInfo, MediaProbe};
pub use rules::RuleTable;

use crate::models::PresetName;
use std::path::Path;

/// 预设的来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionSource {
    Override,
    /// 命中的文件名规则名称
    Rule(String),
    Probe(MediaInfo),
    Fallback,
}

impl std::fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionSource::Override => write!(f, "manual override"),
            ResolutionSource::Rule(name) => write!(f, "rule '{}'", name),
            ResolutionSource::Probe(info) => write!(
                f,
                "probe {}{}",
                info.height,
                if info.interlaced { "i" } else { "p" }
            ),
            ResolutionSource::Fallback => write!(f, "default"),
        }
    }
}

/// 解析结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub preset: PresetName,
    pub source: ResolutionSource,
}

/// 预设解析器
pub struct PresetResolver {
    override_preset: Option<PresetName>,
    table: RuleTable,
    probe: Option<Box<dyn MediaProbe>>,
}

impl PresetResolver {
    pub fn new(table: RuleTable) -> Self {
        Self {
            override_preset: None,
            table,
            probe: None,
        }
    }

    /// 设置手动预设
    pub fn with_override(mut self, preset: Option<PresetName>) -> Self {
        self.override_preset = preset;
        self
    }

    /// 设置媒体探测器（None 表示禁用探测）
    pub fn with_probe(mut self, probe: Option<Box<dyn MediaProbe>>) -> Self {
        self.probe = probe;
        self
    }

    /// 解析单个文件的预设
    pub fn resolve(&self, path: &Path) -> Resolution {
        if let Some(preset) = self.override_preset {
            return Resolution {
                preset,
                source: ResolutionSource::Override,
            };
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if let Some(rule) = self.table.match_name(&file_name) {
            return Resolution {
                preset: rule.preset,
                source: ResolutionSource::Rule(rule.name.clone()),
            };
        }

        if let Some(probe) = &self.probe {
            match probe.probe(path) {
                Ok(info) => {
                    if let Some(threshold) = self.table.match_media(&info) {
                        return Resolution {
                            preset: threshold.preset,
                            source: ResolutionSource::Probe(info),
                        };
                    }
                    tracing::debug!(
                        path = %path.display(),
                        height = info.height,
                        "no threshold matched probe result"
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "media probe failed, using default preset"
                    );
                }
            }
        }

        Resolution {
            preset: PresetName::DEFAULT,
            source: ResolutionSource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Result, UpbatchError};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedProbe {
        info: Option<MediaInfo>,
        calls: Arc<AtomicUsize>,
    }

    impl MediaProbe for FixedProbe {
        fn probe(&self, _path: &Path) -> Result<MediaInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.info.ok_or_else(|| UpbatchError::CommandFailed {
                command: "ffprobe".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            })
        }
    }

    fn resolver_with_probe(info: Option<MediaInfo>) -> (PresetResolver, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let probe = FixedProbe {
            info,
            calls: Arc::clone(&calls),
        };
        let resolver =
            PresetResolver::new(RuleTable::builtin().unwrap()).with_probe(Some(Box::new(probe)));
        (resolver, calls)
    }

    #[test]
    fn test_override_wins_for_every_file() {
        let (resolver, calls) = resolver_with_probe(Some(MediaInfo {
            height: 480,
            interlaced: true,
        }));
        let resolver = resolver.with_override(Some(PresetName::Movie));

        for name in ["Show S01E01.mkv", "Show S07E01.mkv", "random.mp4"] {
            let r = resolver.resolve(Path::new(name));
            assert_eq!(r.preset, PresetName::Movie);
            assert_eq!(r.source, ResolutionSource::Override);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rule_before_probe() {
        let (resolver, calls) = resolver_with_probe(Some(MediaInfo {
            height: 1080,
            interlaced: false,
        }));
        let r = resolver.resolve(Path::new("/in/Show S02E03.mkv"));
        assert_eq!(r.preset, PresetName::DvdInterlaced);
        assert!(matches!(r.source, ResolutionSource::Rule(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_probe_bucket() {
        let (resolver, calls) = resolver_with_probe(Some(MediaInfo {
            height: 720,
            interlaced: false,
        }));
        let r = resolver.resolve(Path::new("/in/clip.mkv"));
        assert_eq!(r.preset, PresetName::Hd720);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_failure_falls_back() {
        let (resolver, _) = resolver_with_probe(None);
        let r = resolver.resolve(Path::new("/in/clip.mkv"));
        assert_eq!(r.preset, PresetName::Conservative);
        assert_eq!(r.source, ResolutionSource::Fallback);
    }

    #[test]
    fn test_probe_above_all_thresholds_falls_back() {
        let (resolver, _) = resolver_with_probe(Some(MediaInfo {
            height: 2160,
            interlaced: false,
        }));
        assert_eq!(
            resolver.resolve(Path::new("/in/clip.mkv")).preset,
            PresetName::DEFAULT
        );
    }

    #[test]
    fn test_no_probe_configured() {
        let resolver = PresetResolver::new(RuleTable::builtin().unwrap());
        let r = resolver.resolve(Path::new("/in/clip.mkv"));
        assert_eq!(r.source, ResolutionSource::Fallback);
    }
}
