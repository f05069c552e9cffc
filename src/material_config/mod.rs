//! Reader for the material persistence file written next to a converted
//! reference model.
//!
//! The format is section based:
//!
//! ```text
//! [MATERIAL_0]
//! NAME=Paint
//! SHADER=ksPerPixelMultiMap
//! ALPHABLEND=0
//! ALPHATEST=0
//! RESCOUNT=4
//! RES_0_TEXTURE=paint_d.dds
//! VAR_0_NAME=useDetail
//! VAR_0_FLOAT1=1
//! ```

pub mod apply;

use std::collections::BTreeMap;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::shader::dispatch::MaterialParams;
use crate::validation::report::DiagnosticItem;
use crate::validation::rules;

pub const MATERIAL_SECTION_PREFIX: &str = "MATERIAL_";

/// A line the parser could not use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigIssue {
    pub section: String,
    pub line_number: usize,
    pub line: String,
}

impl ConfigIssue {
    pub fn to_diagnostic(&self) -> DiagnosticItem {
        rules::config_line_ignored(&self.section, self.line_number, &self.line)
    }
}

/// One `VAR_<i>_*` group.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShaderVariable {
    pub name: Option<String>,
    pub float1: Option<f32>,
    /// Every other field, keyed by its suffix (`FLOAT2`, `FLOAT3`, ...).
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialSection {
    pub section: String,
    pub name: Option<String>,
    pub shader: Option<String>,
    pub alpha_blend: bool,
    pub alpha_test: bool,
    pub texture_count: Option<usize>,
    pub textures: BTreeMap<u32, String>,
    pub variables: BTreeMap<u32, ShaderVariable>,
    /// Keys with no dedicated field.
    pub extra: BTreeMap<String, String>,
}

impl MaterialSection {
    /// Texture names in resource-index order.
    pub fn texture_names(&self) -> Vec<&str> {
        self.textures.values().map(String::as_str).collect()
    }

    /// Number of textures to wire: `RESCOUNT`, or the number of texture
    /// entries when it is missing.
    pub fn slot_count(&self) -> usize {
        self.texture_count.unwrap_or(self.textures.len())
    }

    pub fn variable(&self, name: &str) -> Option<&ShaderVariable> {
        self.variables
            .values()
            .find(|v| v.name.as_deref() == Some(name))
    }

    fn float(&self, name: &str) -> Option<f32> {
        self.variable(name).and_then(|v| v.float1)
    }

    pub fn params(&self) -> MaterialParams {
        MaterialParams {
            use_detail: self.float("useDetail").map(|v| v > 0.0).unwrap_or(false),
            detail_multiplier: self.float("detailUVMultiplier"),
            normal_multiplier: self.float("normalUVMultiplier"),
            detail_normal_blend: self.float("detailNormalBlend"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterialConfig {
    pub materials: Vec<MaterialSection>,
    /// Names of sections that are not material sections.
    pub other_sections: Vec<String>,
}

/// Splits `RES_3_TEXTURE` into `(3, "TEXTURE")`.
fn indexed_key<'a>(key: &'a str, prefix: &str) -> Option<(u32, &'a str)> {
    let rest = key.strip_prefix(prefix)?;
    let (index, field) = rest.split_once('_')?;
    Some((index.parse().ok()?, field))
}

fn record_issue(issues: &mut Vec<ConfigIssue>, section: &str, line_number: usize, line: &str) {
    log::debug!("[{}] line {} ignored: {}", section, line_number, line);
    issues.push(ConfigIssue {
        section: section.to_string(),
        line_number,
        line: line.to_string(),
    });
}

/// Store one `KEY=VALUE` pair of a material section.
fn apply_entry(
    material: &mut MaterialSection,
    issues: &mut Vec<ConfigIssue>,
    line_number: usize,
    line: &str,
    key: &str,
    value: &str,
) {
    let mut bad_line = false;
    match key {
        "NAME" => material.name = Some(value.to_string()),
        "SHADER" => material.shader = Some(value.to_string()),
        "ALPHABLEND" | "ALPHATEST" | "APLHATEST" => {
            let flag = match value.parse::<i64>() {
                Ok(v) => v > 0,
                Err(_) => {
                    bad_line = true;
                    false
                }
            };
            if key == "ALPHABLEND" {
                material.alpha_blend = flag;
            } else {
                material.alpha_test = flag;
            }
        }
        "RESCOUNT" => match value.parse::<usize>() {
            Ok(count) => material.texture_count = Some(count),
            Err(_) => bad_line = true,
        },
        _ => {
            if let Some((index, "TEXTURE")) = indexed_key(key, "RES_") {
                material.textures.insert(index, value.to_string());
            } else if let Some((index, field)) = indexed_key(key, "VAR_") {
                let variable = material.variables.entry(index).or_default();
                match field {
                    "NAME" => variable.name = Some(value.to_string()),
                    "FLOAT1" => match value.parse::<f32>() {
                        Ok(v) => variable.float1 = Some(v),
                        Err(_) => bad_line = true,
                    },
                    _ => {
                        variable.fields.insert(field.to_string(), value.to_string());
                    }
                }
            } else {
                material.extra.insert(key.to_string(), value.to_string());
            }
        }
    }
    if bad_line {
        record_issue(issues, &material.section, line_number, line);
    }
}

impl MaterialConfig {
    /// Parse config text. Never fails; unusable lines come back as issues.
    pub fn parse(text: &str) -> (Self, Vec<ConfigIssue>) {
        let mut config = MaterialConfig::default();
        let mut issues = vec![];
        // Section of the line being read; `None` before the first header.
        let mut section: Option<(String, bool)> = None;

        for (i, raw) in text.lines().enumerate() {
            let line_number = i + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                let name = name.trim().to_string();
                let is_material = name.starts_with(MATERIAL_SECTION_PREFIX);
                if is_material {
                    config.materials.push(MaterialSection {
                        section: name.clone(),
                        ..Default::default()
                    });
                } else {
                    config.other_sections.push(name.clone());
                }
                section = Some((name, is_material));
                continue;
            }

            let Some((name, is_material)) = &section else {
                continue;
            };
            let Some((key, value)) = line.split_once('=') else {
                record_issue(&mut issues, name, line_number, line);
                continue;
            };
            if !is_material {
                continue;
            }
            if let Some(material) = config.materials.last_mut() {
                apply_entry(material, &mut issues, line_number, line, key.trim(), value.trim());
            }
        }

        (config, issues)
    }

    pub fn from_file(path: &Path) -> Result<(Self, Vec<ConfigIssue>)> {
        let text = std::fs::read_to_string(path)?;
        Ok(Self::parse(&text))
    }

    pub fn material(&self, name: &str) -> Option<&MaterialSection> {
        self.materials
            .iter()
            .find(|m| m.name.as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
[HEADER]
VERSION=3

[MATERIAL_0]
NAME=Paint
SHADER=ksPerPixelMultiMap
ALPHABLEND=0
APLHATEST=1
RESCOUNT=4
RES_1_TEXTURE=paint_nm.dds
RES_0_TEXTURE=paint_d.dds
RES_2_TEXTURE=paint_map.dds
RES_3_TEXTURE=detail.dds
VAR_0_NAME=useDetail
VAR_0_FLOAT1=1
VAR_1_NAME=detailUVMultiplier
VAR_1_FLOAT1=40
VAR_1_FLOAT2=0,0
this line has no delimiter

[MATERIAL_1]
NAME=Glass
SHADER=ksPerPixel
ALPHABLEND=yes
RES_0_TEXTURE=glass.png
";

    #[test]
    fn parses_material_sections() {
        let (config, issues) = MaterialConfig::parse(SAMPLE);
        assert_eq!(config.materials.len(), 2);
        assert_eq!(config.other_sections, vec!["HEADER".to_string()]);

        let paint = config.material("Paint").unwrap();
        assert_eq!(paint.shader.as_deref(), Some("ksPerPixelMultiMap"));
        assert!(!paint.alpha_blend);
        assert!(paint.alpha_test);
        assert_eq!(paint.slot_count(), 4);
        assert_eq!(
            paint.texture_names(),
            vec!["paint_d.dds", "paint_nm.dds", "paint_map.dds", "detail.dds"]
        );
        assert_eq!(
            paint.variable("detailUVMultiplier").unwrap().fields.get("FLOAT2"),
            Some(&"0,0".to_string())
        );

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].section, "MATERIAL_0");
        assert_eq!(issues[0].line, "this line has no delimiter");
        assert_eq!(issues[1].section, "MATERIAL_1");
        assert_eq!(issues[1].line, "ALPHABLEND=yes");
    }

    #[test]
    fn params_from_variables() {
        let (config, _) = MaterialConfig::parse(SAMPLE);
        let params = config.material("Paint").unwrap().params();
        assert!(params.use_detail);
        assert_eq!(params.detail_multiplier, Some(40.0));
        assert_eq!(params.normal_multiplier, None);

        let glass = config.material("Glass").unwrap().params();
        assert_eq!(glass, MaterialParams::default());
    }

    #[test]
    fn slot_count_falls_back_to_texture_entries() {
        let (config, _) = MaterialConfig::parse(SAMPLE);
        let glass = config.material("Glass").unwrap();
        assert_eq!(glass.texture_count, None);
        assert_eq!(glass.slot_count(), 1);
        assert!(!glass.alpha_blend);
    }

    #[test]
    fn lines_before_a_section_are_ignored() {
        let (config, issues) = MaterialConfig::parse("NAME=floating\nnot a pair\n[MATERIAL_0]\nNAME=A\n");
        assert!(issues.is_empty());
        assert_eq!(config.materials[0].name.as_deref(), Some("A"));
    }

    #[test]
    fn value_keeps_later_equals_signs() {
        let (config, _) = MaterialConfig::parse("[MATERIAL_0]\nNAME = a=b \n");
        assert_eq!(config.materials[0].name.as_deref(), Some("a=b"));
    }

    #[test]
    fn indexed_keys() {
        assert_eq!(indexed_key("RES_12_TEXTURE", "RES_"), Some((12, "TEXTURE")));
        assert_eq!(indexed_key("VAR_x_NAME", "VAR_"), None);
        assert_eq!(indexed_key("RESCOUNT", "RES_"), None);
    }
}
