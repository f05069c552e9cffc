use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use super::{MaterialConfig, MaterialSection};
use crate::scene::{BlendMethod, ColorSpace, ImageId, MaterialId, Scene};
use crate::settings::Settings;
use crate::shader::dispatch::{wire_material, DispatchKind};
use crate::shader::{NodeId, ShaderGraph, Socket};
use crate::texture_pipeline::converter::relocate_image;
use crate::texture_pipeline::TEXTURE_DIR;
use crate::validation::limits::IMAGE_TEXTURE_SLOTS;
use crate::validation::report::RunReport;
use crate::validation::rules;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplySummary {
    pub configured: Vec<String>,
    /// Sections naming a material the scene does not have.
    pub missing: Vec<String>,
    pub unused: Vec<String>,
    pub failed: Vec<String>,
}

/// Apply every material section of `config` to the scene's materials.
///
/// Textures named by the config are looked up in a `texture` directory
/// beside `config_path`.
pub fn apply_material_config(
    scene: &mut Scene,
    config: &MaterialConfig,
    config_path: &Path,
    settings: &Settings,
    report: &mut RunReport,
) -> ApplySummary {
    let texture_dir = config_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join(TEXTURE_DIR);
    let mut summary = ApplySummary::default();
    let mut placeholders: HashSet<String> = HashSet::new();

    for section in &config.materials {
        let Some(name) = section.name.as_deref() else {
            log::debug!("[{}] has no NAME, skipping", section.section);
            continue;
        };
        let Some(material) = scene.material_by_name(name) else {
            log::debug!("Material '{}' is not in the scene, skipping", name);
            summary.missing.push(name.to_string());
            continue;
        };
        if scene.material_users(material) == 0 {
            log::info!("Material '{}' not used on any mesh object. Skipping.", name);
            report.add(rules::material_unused(name));
            summary.unused.push(name.to_string());
            continue;
        }

        log::info!(
            "Material: {} (shader {}, {} textures)",
            name,
            section.shader.as_deref().unwrap_or("<none>"),
            section.slot_count()
        );
        let mut ctx = MaterialContext {
            scene: &mut *scene,
            section,
            texture_dir: &texture_dir,
            settings,
            report: &mut *report,
            placeholders: &mut placeholders,
        };
        match ctx.configure(material) {
            Ok(()) => summary.configured.push(name.to_string()),
            Err(e) => {
                log::error!("Error processing material '{}': {:#}", name, e);
                report.add(rules::material_failed(name, &format!("{:#}", e)));
                summary.failed.push(name.to_string());
            }
        }
    }

    summary
}

struct MaterialContext<'a> {
    scene: &'a mut Scene,
    section: &'a MaterialSection,
    texture_dir: &'a Path,
    settings: &'a Settings,
    report: &'a mut RunReport,
    placeholders: &'a mut HashSet<String>,
}

impl MaterialContext<'_> {
    fn configure(&mut self, material: MaterialId) -> anyhow::Result<()> {
        let mut graph = self
            .scene
            .material_mut(material)
            .and_then(|m| m.node_tree.take())
            .unwrap_or_else(ShaderGraph::standard);
        let result = self.configure_graph(material, &mut graph);
        if let Some(m) = self.scene.material_mut(material) {
            m.node_tree = Some(graph);
        }
        result
    }

    fn configure_graph(&mut self, material: MaterialId, graph: &mut ShaderGraph) -> anyhow::Result<()> {
        let section = self.section;
        let name = section.name.clone().unwrap_or_default();
        let added = graph.ensure_topology();
        if added > 0 {
            log::debug!("Added {} missing nodes to '{}'", added, name);
        }

        let params = section.params();
        self.apply_alpha(material, graph, params.use_detail)?;

        let textures = section.texture_names();
        for (slot, texture) in textures.iter().enumerate().take(IMAGE_TEXTURE_SLOTS as usize) {
            self.fill_slot(graph, slot as u8, texture);
        }

        let shader = section.shader.as_deref().unwrap_or_default();
        let slot_count = section.slot_count();
        let outcome = wire_material(graph, slot_count, shader, &params);
        for warning in &outcome.warnings {
            log::warn!("{}: {}", name, warning);
            let item = if outcome.kind == DispatchKind::Unsupported {
                rules::texture_count_unsupported(&name, slot_count)
            } else {
                rules::shader_warning(&name, warning)
            };
            self.report.add(item);
        }

        for slot in &outcome.non_color_slots {
            let image = graph.image(*slot).and_then(|id| self.scene.image_mut(id));
            if let Some(image) = image {
                image.colorspace = ColorSpace::NonColor;
            }
        }

        for (slot, texture) in textures.iter().enumerate().take(IMAGE_TEXTURE_SLOTS as usize) {
            let Some(image) = graph.image(slot as u8) else {
                continue;
            };
            match relocate_image(self.scene, image, texture) {
                Ok(outcome) => log::debug!("{} -> {:?}", texture, outcome),
                Err(e) => {
                    log::warn!("Could not relocate {}: {:#}", texture, e);
                    self.report
                        .add(rules::texture_export_failed(texture, &format!("{:#}", e)));
                }
            }
            self.check_placeholder(image, texture);
        }
        Ok(())
    }

    fn apply_alpha(&mut self, material: MaterialId, graph: &mut ShaderGraph, use_detail: bool) -> anyhow::Result<()> {
        let blend = match (self.section.alpha_blend, self.section.alpha_test) {
            (_, true) => BlendMethod::Hashed,
            (true, false) => BlendMethod::Blend,
            (false, false) => return Ok(()),
        };
        let m = self
            .scene
            .material_mut(material)
            .context("material disappeared while configuring")?;
        m.blend_method = blend;
        m.show_transparent_back = false;

        if use_detail {
            graph.link(NodeId::AlphaMix, Socket::Result, NodeId::PrincipledBsdf, Socket::Alpha);
        } else {
            graph.link(
                NodeId::ImageTexture(0),
                Socket::Alpha,
                NodeId::PrincipledBsdf,
                Socket::Alpha,
            );
        }
        Ok(())
    }

    /// Load `texture` into an empty image node. Nodes that already hold an
    /// image keep it.
    fn fill_slot(&mut self, graph: &mut ShaderGraph, slot: u8, texture: &str) {
        if graph.image(slot).is_some() {
            return;
        }
        if let Some(existing) = self.scene.image_by_name(texture) {
            graph.set_image(slot, existing);
            return;
        }
        let path: PathBuf = self.texture_dir.join(texture);
        match image::image_dimensions(&path) {
            Ok((width, height)) => {
                let image = self.scene.load_image(&path, width, height);
                graph.set_image(slot, image);
            }
            Err(e) => log::warn!("Invalid image file path {}: {}", path.display(), e),
        }
    }

    fn check_placeholder(&mut self, image: ImageId, texture: &str) {
        if self.placeholders.contains(texture) {
            return;
        }
        let Some(img) = self.scene.image(image) else {
            return;
        };
        if let Some(item) = rules::check_texture_placeholder(
            texture,
            img.width,
            img.height,
            self.settings.placeholder_min_dimension,
        ) {
            log::warn!("Image {} is too small: {}x{}", texture, img.width, img.height);
            self.report.add(item);
            self.placeholders.insert(texture.to_string());
        }
    }
}
