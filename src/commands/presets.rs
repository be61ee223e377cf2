//! # presets 命令实现
//!
//! 打印静态预设表和当前生效的规则表；`--classify` 时对给定文件执行预设解析。
//!
//! ## 依赖关系
//! - 使用 `cli/presets.rs` 定义的参数
//! - 使用 `models/preset.rs`, `resolver/`

use crate::cli::presets::PresetsArgs;
use crate::error::Result;
use crate::models::PresetName;
use crate::resolver::{FfprobeProbe, MediaProbe, PresetResolver, RuleTable};
use crate::utils::output;

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct PresetRow {
    #[tabled(rename = "Preset")]
    name: String,
    #[tabled(rename = "Algorithm")]
    algorithm: String,
    #[tabled(rename = "Scale")]
    scale: String,
    #[tabled(rename = "Deinterlace")]
    deinterlace: String,
    #[tabled(rename = "CRF")]
    crf: u8,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct RuleRow {
    #[tabled(rename = "Rule")]
    rule: String,
    #[tabled(rename = "Preset")]
    preset: String,
}

#[derive(Tabled)]
struct ClassifyRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Preset")]
    preset: String,
    #[tabled(rename = "Source")]
    source: String,
}

/// 执行 presets 命令
pub fn execute(args: PresetsArgs) -> Result<()> {
    let table = match &args.rules {
        Some(path) => RuleTable::from_file(path)?,
        None => RuleTable::builtin()?,
    };

    output::print_header("Presets");
    let presets: Vec<PresetRow> = PresetName::ALL
        .iter()
        .map(|name| {
            let p = name.preset();
            PresetRow {
                name: name.to_string(),
                algorithm: p.algorithm.as_str().to_string(),
                scale: format!("{}x", p.scale),
                deinterlace: p.deinterlace.unwrap_or("-").to_string(),
                crf: p.crf,
                description: p.description.to_string(),
            }
        })
        .collect();
    println!("{}", Table::new(presets));

    output::print_header("Rules (first match wins)");
    let mut rules: Vec<RuleRow> = table
        .rules
        .iter()
        .map(|r| RuleRow {
            rule: r.name.clone(),
            preset: r.preset.to_string(),
        })
        .collect();
    rules.extend(table.thresholds.iter().map(|t| RuleRow {
        rule: match t.interlaced {
            Some(true) => format!("probe height <= {} (interlaced)", t.max_height),
            Some(false) => format!("probe height <= {} (progressive)", t.max_height),
            None => format!("probe height <= {}", t.max_height),
        },
        preset: t.preset.to_string(),
    }));
    rules.push(RuleRow {
        rule: "fallback".to_string(),
        preset: PresetName::DEFAULT.to_string(),
    });
    println!("{}", Table::new(rules));

    if args.classify.is_empty() {
        return Ok(());
    }

    let probe = if args.no_probe {
        None
    } else {
        Some(Box::new(FfprobeProbe::new(args.ffprobe.clone())) as Box<dyn MediaProbe>)
    };
    let resolver = PresetResolver::new(table).with_probe(probe);

    output::print_header("Classification");
    let rows: Vec<ClassifyRow> = args
        .classify
        .iter()
        .map(|path| {
            let r = resolver.resolve(path);
            ClassifyRow {
                file: path.display().to_string(),
                preset: r.preset.to_string(),
                source: r.source.to_string(),
            }
        })
        .collect();
    println!("{}", Table::new(rows));

    Ok(())
}
