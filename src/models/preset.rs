//! # 预设数据模型
//!
//! 静态枚举的处理预设集合。每个预设是一组导出给外部处理命令的配置值
//! （分辨率类别、内容类型、放大算法、去隔行设置、编码参数）。
//!
//! ## 依赖关系
//! - 被 `resolver/`, `batch/`, `commands/presets.rs` 使用
//! - 无外部模块依赖

use crate::error::{Result, UpbatchError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 预设名称（封闭集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PresetName {
    DvdInterlaced,
    DvdProgressive,
    #[serde(rename = "hd-720")]
    Hd720,
    #[serde(rename = "hd-1080")]
    Hd1080,
    Movie,
    Conservative,
}

impl PresetName {
    /// 所有预设，按表格展示顺序
    pub const ALL: [PresetName; 6] = [
        PresetName::DvdInterlaced,
        PresetName::DvdProgressive,
        PresetName::Hd720,
        PresetName::Hd1080,
        PresetName::Movie,
        PresetName::Conservative,
    ];

    /// 无规则命中时使用的保守默认预设
    pub const DEFAULT: PresetName = PresetName::Conservative;

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetName::DvdInterlaced => "dvd-interlaced",
            PresetName::DvdProgressive => "dvd-progressive",
            PresetName::Hd720 => "hd-720",
            PresetName::Hd1080 => "hd-1080",
            PresetName::Movie => "movie",
            PresetName::Conservative => "conservative",
        }
    }

    /// 对应的预设参数
    pub fn preset(&self) -> &'static Preset {
        // PRESETS 与 ALL 顺序一致
        &PRESETS[*self as usize]
    }

    fn available() -> String {
        PresetName::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for PresetName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresetName {
    type Err = UpbatchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        PresetName::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| UpbatchError::UnknownPreset {
                name: s.to_string(),
                available: PresetName::available(),
            })
    }
}

/// 放大算法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    RealEsrgan,
    BasicVsrPp,
    RealCugan,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::RealEsrgan => "realesrgan",
            Algorithm::BasicVsrPp => "basicvsrpp",
            Algorithm::RealCugan => "realcugan",
        }
    }
}

/// 源分辨率类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionClass {
    Sd,
    Hd720,
    Hd1080,
    Unknown,
}

impl ResolutionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionClass::Sd => "sd",
            ResolutionClass::Hd720 => "720p",
            ResolutionClass::Hd1080 => "1080p",
            ResolutionClass::Unknown => "unknown",
        }
    }
}

/// 内容类型提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Episode,
    Movie,
    Unknown,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Episode => "episode",
            ContentType::Movie => "movie",
            ContentType::Unknown => "unknown",
        }
    }
}

/// 处理预设
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: PresetName,
    pub description: &'static str,
    pub resolution: ResolutionClass,
    pub content: ContentType,
    pub algorithm: Algorithm,
    /// 放大倍数
    pub scale: u8,
    /// 降噪等级 (-1 = 不降噪，仅 Real-CUGAN 使用)
    pub denoise: i8,
    /// 分块大小 (0 = 不分块)
    pub tile: u32,
    /// 测试时增强
    pub tta: bool,
    /// 去隔行滤镜 (None = 逐行源)
    pub deinterlace: Option<&'static str>,
    pub model: &'static str,
    pub target_height: u32,
    pub crf: u8,
    pub encoder_preset: &'static str,
}

impl Preset {
    /// 导出给外部处理命令的环境变量
    pub fn env_vars(&self) -> Vec<(&'static str, String)> {
        vec![
            ("UPSCALE_PRESET", self.name.to_string()),
            ("UPSCALE_ALGORITHM", self.algorithm.as_str().to_string()),
            ("UPSCALE_SCALE", self.scale.to_string()),
            ("UPSCALE_DENOISE", self.denoise.to_string()),
            ("UPSCALE_TILE", self.tile.to_string()),
            ("UPSCALE_TTA", bool_flag(self.tta)),
            ("UPSCALE_MODEL", self.model.to_string()),
            ("UPSCALE_DEINTERLACE", bool_flag(self.deinterlace.is_some())),
            (
                "UPSCALE_DEINTERLACE_FILTER",
                self.deinterlace.unwrap_or("").to_string(),
            ),
            ("UPSCALE_RESOLUTION_CLASS", self.resolution.as_str().to_string()),
            ("UPSCALE_CONTENT_TYPE", self.content.as_str().to_string()),
            ("UPSCALE_TARGET_HEIGHT", self.target_height.to_string()),
            ("UPSCALE_CRF", self.crf.to_string()),
            ("UPSCALE_ENCODER_PRESET", self.encoder_preset.to_string()),
        ]
    }
}

fn bool_flag(v: bool) -> String {
    if v { "1" } else { "0" }.to_string()
}

/// 内置预设表，顺序与 `PresetName` 声明一致
static PRESETS: [Preset; 6] = [
    Preset {
        name: PresetName::DvdInterlaced,
        description: "480i/576i DVD episodes, deinterlaced before upscaling",
        resolution: ResolutionClass::Sd,
        content: ContentType::Episode,
        algorithm: Algorithm::RealCugan,
        scale: 4,
        denoise: 1,
        tile: 256,
        tta: false,
        deinterlace: Some("bwdif=mode=send_frame:parity=auto"),
        model: "/models/realcugan/Real-CUGAN_up4x-latest-denoise1x.pth",
        target_height: 2160,
        crf: 18,
        encoder_preset: "slow",
    },
    Preset {
        name: PresetName::DvdProgressive,
        description: "Progressive SD sources (480p/576p)",
        resolution: ResolutionClass::Sd,
        content: ContentType::Episode,
        algorithm: Algorithm::RealCugan,
        scale: 4,
        denoise: -1,
        tile: 256,
        tta: false,
        deinterlace: None,
        model: "/models/realcugan/Real-CUGAN_up4x-latest-conservative.pth",
        target_height: 2160,
        crf: 18,
        encoder_preset: "slow",
    },
    Preset {
        name: PresetName::Hd720,
        description: "720p HD sources",
        resolution: ResolutionClass::Hd720,
        content: ContentType::Episode,
        algorithm: Algorithm::RealEsrgan,
        scale: 4,
        denoise: -1,
        tile: 512,
        tta: false,
        deinterlace: None,
        model: "/models/realesrgan/realesr-animevideov3.pth",
        target_height: 2160,
        crf: 18,
        encoder_preset: "slow",
    },
    Preset {
        name: PresetName::Hd1080,
        description: "1080p HD sources, 2x upscale",
        resolution: ResolutionClass::Hd1080,
        content: ContentType::Episode,
        algorithm: Algorithm::RealCugan,
        scale: 2,
        denoise: 3,
        tile: 512,
        tta: false,
        deinterlace: None,
        model: "/models/realcugan/Real-CUGAN_up2x-latest-denoise3x.pth",
        target_height: 2160,
        crf: 18,
        encoder_preset: "slow",
    },
    Preset {
        name: PresetName::Movie,
        description: "Feature-length movies, temporal upscaling",
        resolution: ResolutionClass::Unknown,
        content: ContentType::Movie,
        algorithm: Algorithm::BasicVsrPp,
        scale: 4,
        denoise: -1,
        tile: 0,
        tta: false,
        deinterlace: None,
        model: "/models/basicvsrpp/basicvsr_plusplus_reds4.pth",
        target_height: 2160,
        crf: 16,
        encoder_preset: "slower",
    },
    Preset {
        name: PresetName::Conservative,
        description: "Fallback for unclassified sources",
        resolution: ResolutionClass::Unknown,
        content: ContentType::Unknown,
        algorithm: Algorithm::RealCugan,
        scale: 4,
        denoise: -1,
        tile: 256,
        tta: false,
        deinterlace: None,
        model: "/models/realcugan/Real-CUGAN_up4x-latest-conservative.pth",
        target_height: 2160,
        crf: 18,
        encoder_preset: "slow",
    },
];
