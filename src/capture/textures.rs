use std::path::PathBuf;

use super::{CaptureOutput, ReplayController, ResourceId, ShaderStage};
use crate::settings::Settings;
use crate::validation::report::RunReport;
use crate::validation::rules;

/// A texture exported (or found already exported) for the current event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTexture {
    pub slot_name: String,
    pub resource: ResourceId,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    /// The file existed and was not saved again.
    pub reused: bool,
}

/// Whether a fragment resource slot holds a texture worth exporting.
pub fn is_exported_slot(slot_name: &str, settings: &Settings) -> bool {
    slot_name.starts_with(&settings.texture_slot_prefix)
        && !slot_name.contains(&settings.cubemap_slot_marker)
}

/// Export the fragment-stage textures bound at the controller's current
/// event, in binding order.
pub fn extract_textures(
    controller: &mut dyn ReplayController,
    output: &CaptureOutput,
    settings: &Settings,
    report: &mut RunReport,
) -> Vec<ExtractedTexture> {
    let mut textures = vec![];
    for bound in controller.read_only_resources(ShaderStage::Fragment) {
        if bound.resource.is_null() {
            continue;
        }
        let Some(slot_name) = bound.slot_name.filter(|s| is_exported_slot(s, settings)) else {
            continue;
        };
        let Some(desc) = controller.texture_desc(bound.resource) else {
            log::error!("Texture {} not found.", bound.resource);
            continue;
        };
        if desc.width == 1 && desc.height == 1 {
            log::info!("Skipping 1x1 texture with {}.", bound.resource);
            continue;
        }

        let path = output.texture_path(bound.resource, &slot_name);
        let reused = path.exists();
        if reused {
            log::info!("Skipping texture save. File already exists: {}", path.display());
        } else {
            if let Err(e) = output.ensure_dir() {
                log::error!("Failed to create {}: {}", output.dir().display(), e);
                report.add(rules::texture_export_failed(&slot_name, &e.to_string()));
                continue;
            }
            if let Err(e) = controller.save_texture(bound.resource, &path) {
                log::error!("Failed to save texture to {}: {:#}", path.display(), e);
                report.add(rules::texture_export_failed(
                    &path.display().to_string(),
                    &format!("{:#}", e),
                ));
                continue;
            }
            log::info!("Successfully saved texture to {}", path.display());
        }

        textures.push(ExtractedTexture {
            slot_name,
            resource: bound.resource,
            path,
            width: desc.width,
            height: desc.height,
            reused,
        });
    }
    textures
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_filter() {
        let settings = Settings::default();
        assert!(is_exported_slot("txDiffuse", &settings));
        assert!(is_exported_slot("txNormal", &settings));
        assert!(!is_exported_slot("txCube", &settings));
        assert!(!is_exported_slot("txCubeReflection", &settings));
        assert!(!is_exported_slot("shadowMap", &settings));
    }
}
