//! # 预设规则表
//!
//! 文件名正则规则和探测高度阈值都是数据而非代码：内置表以 TOML 形式编译进
//! 程序，也可以用 `--rules <file.toml>` 整体替换。
//!
//! ## 规则文件格式
//! ```toml
//! [[rule]]
//! name = "season 1-4"
//! pattern = '(?i)s0?[1-4]e\d+'
//! preset = "dvd-interlaced"
//!
//! [[threshold]]
//! max_height = 576
//! interlaced = true      # 可选，省略时不区分
//! preset = "dvd-interlaced"
//! ```
//!
//! 两张表都按声明顺序匹配，第一个命中的条目生效。
//!
//! ## 依赖关系
//! - 被 `resolver/mod.rs`, `commands/presets.rs` 使用
//! - 使用 `models/preset.rs`, `resolver/probe.rs`

use super::probe::MediaInfo;
use crate::error::{Result, UpbatchError};
use crate::models::PresetName;

use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// 内置规则表
pub const BUILTIN_RULES: &str = r#"
[[rule]]
name = "seasons 1-4 (DVD, interlaced)"
pattern = '(?i)(?:^|[^a-z0-9])(?:s0?[1-4]e\d{1,3}|[1-4]x\d{2})(?:[^0-9]|$)'
preset = "dvd-interlaced"

[[rule]]
name = "season 5 (DVD, progressive)"
pattern = '(?i)(?:^|[^a-z0-9])(?:s0?5e\d{1,3}|5x\d{2})(?:[^0-9]|$)'
preset = "dvd-progressive"

[[rule]]
name = "seasons 6+ (HD)"
pattern = '(?i)(?:^|[^a-z0-9])(?:s(?:0?[6-9]|[1-9]\d)e\d{1,3}|(?:[6-9]|1\d)x\d{2})(?:[^0-9]|$)'
preset = "hd-1080"

[[rule]]
name = "movie keywords"
pattern = '(?i)(?:^|[^a-z0-9])(?:movie|film|ova|big[ ._-]score|beast[ ._-]with[ ._-]a[ ._-]billion[ ._-]backs|bender.?s[ ._-]game|wild[ ._-]green[ ._-]yonder)(?:[^a-z0-9]|$)'
preset = "movie"

[[threshold]]
max_height = 576
interlaced = true
preset = "dvd-interlaced"

[[threshold]]
max_height = 576
preset = "dvd-progressive"

[[threshold]]
max_height = 720
preset = "hd-720"

[[threshold]]
max_height = 1080
preset = "hd-1080"
"#;

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default, rename = "rule")]
    rules: Vec<RuleSpec>,
    #[serde(default, rename = "threshold")]
    thresholds: Vec<Threshold>,
}

#[derive(Debug, Deserialize)]
struct RuleSpec {
    name: Option<String>,
    pattern: String,
    preset: PresetName,
}

/// 文件名规则
#[derive(Debug, Clone)]
pub struct FilenameRule {
    pub name: String,
    pub pattern: Regex,
    pub preset: PresetName,
}

/// 探测高度阈值
#[derive(Debug, Clone, Deserialize)]
pub struct Threshold {
    pub max_height: u32,
    #[serde(default)]
    pub interlaced: Option<bool>,
    pub preset: PresetName,
}

impl Threshold {
    pub fn matches(&self, info: &MediaInfo) -> bool {
        info.height <= self.max_height && self.interlaced.map_or(true, |i| i == info.interlaced)
    }
}

/// 规则表
#[derive(Debug, Clone)]
pub struct RuleTable {
    pub rules: Vec<FilenameRule>,
    pub thresholds: Vec<Threshold>,
}

impl RuleTable {
    /// 内置规则表
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_RULES, "<builtin>")
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| UpbatchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    /// 解析 TOML 内容，`origin` 只用于错误信息
    pub fn from_toml_str(content: &str, origin: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(content).map_err(|e| UpbatchError::RulesParseError {
            path: origin.to_string(),
            reason: e.to_string(),
        })?;

        let mut rules = Vec::with_capacity(file.rules.len());
        for spec in file.rules {
            let pattern = Regex::new(&spec.pattern).map_err(|e| UpbatchError::InvalidRule {
                pattern: spec.pattern.clone(),
                reason: e.to_string(),
            })?;
            rules.push(FilenameRule {
                name: spec.name.unwrap_or_else(|| spec.pattern.clone()),
                pattern,
                preset: spec.preset,
            });
        }

        Ok(RuleTable {
            rules,
            thresholds: file.thresholds,
        })
    }

    /// 第一个匹配文件名的规则
    pub fn match_name(&self, file_name: &str) -> Option<&FilenameRule> {
        self.rules.iter().find(|r| r.pattern.is_match(file_name))
    }

    /// 第一个匹配探测结果的阈值
    pub fn match_media(&self, info: &MediaInfo) -> Option<&Threshold> {
        self.thresholds.iter().find(|t| t.matches(info))
    }
}
