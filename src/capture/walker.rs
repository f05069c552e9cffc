use std::fmt;
use std::path::Path;

use serde::Serialize;

use super::textures::{extract_textures, ExtractedTexture};
use super::{Action, CaptureOutput, CaptureSource, EventFilter, ReplayController};
use crate::buffer::{decode_mesh, DecodeError, DecodeLimits, DecodedMesh, VertexLayout};
use crate::error::Result;
use crate::scene::{MaterialId, Mesh, ObjectId, Scene};
use crate::settings::Settings;
use crate::shader::ShaderGraph;
use crate::validation::limits::IMAGE_TEXTURE_SLOTS;
use crate::validation::report::RunReport;
use crate::validation::rules;

/// Why an action produced no mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    NoIndexBuffer,
    UnsupportedIndexStride(u32),
    NoVertexInputs,
    NoPosition,
    PositionSlotOutOfRange(u32),
    NullVertexBuffer,
    ReadFailed(String),
    Decode(DecodeError),
    Empty,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIndexBuffer => write!(f, "no index buffer"),
            SkipReason::UnsupportedIndexStride(stride) => {
                write!(f, "unsupported index byte stride {}", stride)
            }
            SkipReason::NoVertexInputs => write!(f, "no vertex buffers or inputs"),
            SkipReason::NoPosition => write!(f, "no position attribute"),
            SkipReason::PositionSlotOutOfRange(slot) => {
                write!(f, "vertex buffer slot {} out of range", slot)
            }
            SkipReason::NullVertexBuffer => write!(f, "no vertex buffer bound"),
            SkipReason::ReadFailed(reason) => write!(f, "buffer read failed: {}", reason),
            SkipReason::Decode(e) => write!(f, "{}", e),
            SkipReason::Empty => write!(f, "no positions or indices"),
        }
    }
}

impl From<DecodeError> for SkipReason {
    fn from(e: DecodeError) -> Self {
        SkipReason::Decode(e)
    }
}

/// Mesh data read for one action, plus non-fatal oddities.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedMesh {
    pub decoded: DecodedMesh,
    pub layout: VertexLayout,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportSummary {
    pub actions_seen: usize,
    pub actions_processed: usize,
    pub meshes_created: Vec<ObjectId>,
    /// (event id, reason)
    pub skipped: Vec<(u32, String)>,
    pub textures_exported: usize,
    pub textures_reused: usize,
}

/// Read the mesh drawn by the controller's current event.
///
/// The first `position` and the first `texcoord` input win. A texcoord
/// that reads from another vertex buffer than the position is ignored.
pub fn extract_mesh(
    controller: &dyn ReplayController,
    action: &Action,
    limits: &DecodeLimits,
) -> std::result::Result<ExtractedMesh, SkipReason> {
    let state = controller.pipeline_state();
    let index_buffer = state
        .index_buffer
        .filter(|ib| !ib.resource.is_null())
        .ok_or(SkipReason::NoIndexBuffer)?;
    if !matches!(index_buffer.byte_stride, 2 | 4) {
        return Err(SkipReason::UnsupportedIndexStride(index_buffer.byte_stride));
    }
    if state.vertex_buffers.is_empty() || state.vertex_inputs.is_empty() {
        return Err(SkipReason::NoVertexInputs);
    }

    let find = |semantic: &str| {
        state
            .vertex_inputs
            .iter()
            .find(|input| input.semantic.eq_ignore_ascii_case(semantic))
    };
    let position = find("position").ok_or(SkipReason::NoPosition)?;
    let vertex_buffer = state
        .vertex_buffers
        .get(position.input_slot as usize)
        .ok_or(SkipReason::PositionSlotOutOfRange(position.input_slot))?;
    if vertex_buffer.resource.is_null() {
        return Err(SkipReason::NullVertexBuffer);
    }

    let mut warnings = vec![];
    let uv_offset = match find("texcoord") {
        Some(uv) if uv.input_slot == position.input_slot => Some(uv.byte_offset as usize),
        Some(uv) => {
            warnings.push(format!(
                "texcoord reads vertex buffer {} but position reads {}; importing without UVs",
                uv.input_slot, position.input_slot
            ));
            None
        }
        None => None,
    };
    let layout = VertexLayout {
        stride: vertex_buffer.byte_stride as usize,
        position_offset: position.byte_offset as usize,
        uv_offset,
    };

    let vertex_bytes = controller
        .buffer_data(
            vertex_buffer.resource,
            vertex_buffer.byte_offset,
            u64::from(action.num_indices) * u64::from(vertex_buffer.byte_stride),
        )
        .map_err(|e| SkipReason::ReadFailed(format!("{:#}", e)))?;
    let index_bytes = controller
        .buffer_data(
            index_buffer.resource,
            index_buffer.byte_offset,
            u64::from(action.num_indices) * u64::from(index_buffer.byte_stride),
        )
        .map_err(|e| SkipReason::ReadFailed(format!("{:#}", e)))?;

    let decoded = decode_mesh(
        &vertex_bytes,
        &index_bytes,
        &layout,
        index_buffer.byte_stride,
        limits,
    )?;
    if decoded.is_empty() {
        return Err(SkipReason::Empty);
    }
    Ok(ExtractedMesh {
        decoded,
        layout,
        warnings,
    })
}

fn report_skip(report: &mut RunReport, event_id: u32, reason: &SkipReason) {
    let item = match reason {
        SkipReason::Decode(DecodeError::SizeLimitExceeded {
            vertices,
            indices,
            max_vertices,
            max_indices,
        }) => rules::check_mesh_size(event_id, *vertices, *indices, *max_vertices, *max_indices),
        SkipReason::Decode(e) => Some(rules::mesh_malformed(event_id, &e.to_string())),
        other => Some(rules::mesh_skipped(event_id, &other.to_string())),
    };
    if let Some(item) = item {
        report.add(item);
    }
}

/// `Material_<event id>` with the standard shader graph, created on first use.
fn material_for_event(scene: &mut Scene, event_id: u32) -> MaterialId {
    let name = format!("Material_{}", event_id);
    if let Some(existing) = scene.material_by_name(&name) {
        log::info!("Using existing material: {}", name);
        return existing;
    }
    let material = scene.add_material(&name);
    if let Some(m) = scene.material_mut(material) {
        m.node_tree = Some(ShaderGraph::standard());
    }
    log::info!("Created new material: {}", name);
    material
}

/// Bind exported textures to the material's image nodes in slot order.
fn assign_textures(scene: &mut Scene, material: MaterialId, textures: &[ExtractedTexture]) {
    let Some(mut graph) = scene.material_mut(material).and_then(|m| m.node_tree.take()) else {
        return;
    };
    for (slot, texture) in textures.iter().enumerate().take(IMAGE_TEXTURE_SLOTS as usize) {
        if !texture.path.exists() {
            continue;
        }
        let image = scene.load_image(&texture.path, texture.width, texture.height);
        graph.set_image(slot as u8, image);
        log::info!("Assigned texture {} to image slot {}", texture.path.display(), slot);
    }
    if let Some(m) = scene.material_mut(material) {
        m.node_tree = Some(graph);
    }
}

fn process_action(
    controller: &mut dyn ReplayController,
    action: &Action,
    scene: &mut Scene,
    output: &CaptureOutput,
    settings: &Settings,
    summary: &mut ImportSummary,
    report: &mut RunReport,
) {
    log::info!("Extracting mesh data for action {}", action.event_id);
    controller.set_frame_event(action.event_id);

    let textures = extract_textures(controller, output, settings, report);
    for texture in &textures {
        if texture.reused {
            summary.textures_reused += 1;
        } else {
            summary.textures_exported += 1;
        }
    }
    let material = material_for_event(scene, action.event_id);
    assign_textures(scene, material, &textures);

    let extracted = match extract_mesh(&*controller, action, &settings.limits) {
        Ok(extracted) => extracted,
        Err(reason) => {
            log::warn!("Skipping action {}: {}", action.event_id, reason);
            report_skip(report, action.event_id, &reason);
            summary.skipped.push((action.event_id, reason.to_string()));
            return;
        }
    };
    for warning in &extracted.warnings {
        log::warn!("Action {}: {}", action.event_id, warning);
    }

    let decoded = &extracted.decoded;
    log::info!("Number of vertices: {}", decoded.vertex_count());
    log::info!("Number of faces: {}", decoded.triangle_count());

    let mut mesh = Mesh::from_decoded(decoded);
    mesh.set_primary_material(material);
    let object = scene.add_object(&format!("Mesh_{}", action.event_id), Some(mesh));
    scene.link_object(&settings.collections.capture, object);
    log::info!(
        "Mesh {} created{}",
        scene.object_name(object).unwrap_or_default(),
        if decoded.uvs.is_some() { " with UVs" } else { "" }
    );
    summary.meshes_created.push(object);
}

/// Import every action of a capture selected by `filter` into the capture
/// collection of `scene`.
pub fn import_capture(
    source: &dyn CaptureSource,
    capture: &Path,
    scene: &mut Scene,
    filter: &EventFilter,
    settings: &Settings,
    report: &mut RunReport,
) -> Result<ImportSummary> {
    let output = CaptureOutput::new(capture)?;
    let mut controller = source.open(capture)?;
    scene.ensure_collection(&settings.collections.capture);

    let mut summary = ImportSummary::default();
    log::info!("Importing {} from {}", filter, capture.display());
    for action in controller.root_actions() {
        summary.actions_seen += 1;
        if !filter.contains(action.event_id) {
            continue;
        }
        summary.actions_processed += 1;
        process_action(
            controller.as_mut(),
            &action,
            scene,
            &output,
            settings,
            &mut summary,
            report,
        );
    }

    controller.shutdown();
    log::info!(
        "Import completed: {} meshes from {} actions, {} skipped",
        summary.meshes_created.len(),
        summary.actions_processed,
        summary.skipped.len()
    );
    Ok(summary)
}
