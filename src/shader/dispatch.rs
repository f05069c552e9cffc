//! Texture wiring keyed by (texture slot count, shader name).

use super::{NodeId, ShaderGraph, Socket};

/// Per-material values read from the material config.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MaterialParams {
    pub use_detail: bool,
    pub detail_multiplier: Option<f32>,
    pub normal_multiplier: Option<f32>,
    pub detail_normal_blend: Option<f32>,
}

/// Mutable state handed to a wiring function.
pub struct Wiring<'a> {
    pub graph: &'a mut ShaderGraph,
    pub params: &'a MaterialParams,
    /// Slots whose images carry data rather than color.
    pub non_color: Vec<u8>,
    pub warnings: Vec<String>,
}

pub type WireFn = fn(&mut Wiring);

/// Which shader names an entry answers for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKey {
    /// Every shader at this slot count is handled the same way.
    Any,
    /// Exact shader names.
    Named(&'static [&'static str]),
    /// Used when no `Named` entry matches; emits an unsupported-shader warning.
    Fallback,
}

#[derive(Debug)]
pub struct ShaderDispatchEntry {
    pub slot_count: usize,
    pub key: ShaderKey,
    pub description: &'static str,
    pub wire: WireFn,
}

pub static DISPATCH_TABLE: &[ShaderDispatchEntry] = &[
    ShaderDispatchEntry {
        slot_count: 1,
        key: ShaderKey::Any,
        description: "base color",
        wire: wire_base,
    },
    ShaderDispatchEntry {
        slot_count: 2,
        key: ShaderKey::Named(&["ksPerPixelNM_UVMult"]),
        description: "base color, normal map",
        wire: wire_base_normal,
    },
    ShaderDispatchEntry {
        slot_count: 2,
        key: ShaderKey::Named(&["ksGrass", "ksPostFOG_MS"]),
        description: "base color",
        wire: wire_base,
    },
    ShaderDispatchEntry {
        slot_count: 2,
        key: ShaderKey::Fallback,
        description: "base color, normal map",
        wire: wire_base_normal,
    },
    ShaderDispatchEntry {
        slot_count: 3,
        key: ShaderKey::Named(&["ksPerPixelAT_NM_emissive"]),
        description: "base color, normal map, emission",
        wire: wire_emissive_normal,
    },
    ShaderDispatchEntry {
        slot_count: 3,
        key: ShaderKey::Named(&["ksPerPixel_dual_layer"]),
        description: "base color, layers unconfigured",
        wire: wire_dual_layer,
    },
    ShaderDispatchEntry {
        slot_count: 3,
        key: ShaderKey::Fallback,
        description: "base color",
        wire: wire_base,
    },
    ShaderDispatchEntry {
        slot_count: 4,
        key: ShaderKey::Named(&["ksPerPixelMultiMap", "ksPerPixelMultiMap_AT"]),
        description: "multimap",
        wire: wire_multimap,
    },
    ShaderDispatchEntry {
        slot_count: 4,
        key: ShaderKey::Fallback,
        description: "base color, normal map, channel map",
        wire: wire_channels,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["ksDiscBrake", "ksTyres"]),
        description: "base color, normal map",
        wire: wire_five_base_normal,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["ksPerPixelMultiMap_emissive", "ksPerPixelMultiMap_AT_emissive"]),
        description: "multimap, emission",
        wire: wire_five_emissive,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["ksPerPixelMultiMap_NMDetail", "ksSkinnedMesh_NMDetaill"]),
        description: "multimap, detail normal",
        wire: wire_five_nm_detail,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["ksPerPixelMultiMap_AT_NMDetail"]),
        description: "multimap, detail normal (normal multiplier)",
        wire: wire_five_at_nm_detail,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["smSticker"]),
        description: "multimap, sticker mapping",
        wire: wire_five_sticker,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Named(&["ksPerPixelMultiMap_damage"]),
        description: "multimap",
        wire: wire_five_multimap,
    },
    ShaderDispatchEntry {
        slot_count: 5,
        key: ShaderKey::Fallback,
        description: "base color, normal map, channel map",
        wire: wire_channels,
    },
];

#[derive(Debug, Clone, Copy)]
pub enum Resolution {
    Exact(&'static ShaderDispatchEntry),
    Fallback(&'static ShaderDispatchEntry),
    Unsupported,
}

/// Find the entry for a slot count and shader name.
pub fn resolve(slot_count: usize, shader: &str) -> Resolution {
    let mut fallback = None;
    for entry in DISPATCH_TABLE.iter().filter(|e| e.slot_count == slot_count) {
        match entry.key {
            ShaderKey::Any => return Resolution::Exact(entry),
            ShaderKey::Named(names) if names.contains(&shader) => return Resolution::Exact(entry),
            ShaderKey::Named(_) => {}
            ShaderKey::Fallback => {
                fallback.get_or_insert(entry);
            }
        }
    }
    match fallback {
        Some(entry) => Resolution::Fallback(entry),
        None => Resolution::Unsupported,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchKind {
    Exact,
    Fallback,
    Unsupported,
}

#[derive(Debug, Clone)]
pub struct WiringOutcome {
    pub kind: DispatchKind,
    pub description: Option<&'static str>,
    pub non_color_slots: Vec<u8>,
    pub warnings: Vec<String>,
}

/// Wire a material's graph for its shader. Images already bound to slots
/// are left alone; only links and input values change.
pub fn wire_material(
    graph: &mut ShaderGraph,
    slot_count: usize,
    shader: &str,
    params: &MaterialParams,
) -> WiringOutcome {
    let (kind, entry) = match resolve(slot_count, shader) {
        Resolution::Exact(entry) => (DispatchKind::Exact, Some(entry)),
        Resolution::Fallback(entry) => (DispatchKind::Fallback, Some(entry)),
        Resolution::Unsupported => (DispatchKind::Unsupported, None),
    };

    let mut wiring = Wiring {
        graph,
        params,
        non_color: vec![],
        warnings: vec![],
    };
    match kind {
        DispatchKind::Fallback => wiring.warnings.push(format!(
            "shader '{}' is not supported with {} textures; textures are assigned by slot order only",
            shader, slot_count
        )),
        DispatchKind::Unsupported => wiring.warnings.push(format!(
            "unsupported amount of textures ({}), no shader details were set up",
            slot_count
        )),
        DispatchKind::Exact => {}
    }
    if let Some(entry) = entry {
        log::debug!(
            "Wiring {} textures for shader '{}': {}",
            slot_count,
            shader,
            entry.description
        );
        (entry.wire)(&mut wiring);
    }

    let mut non_color = wiring.non_color;
    non_color.sort_unstable();
    non_color.dedup();
    WiringOutcome {
        kind,
        description: entry.map(|e| e.description),
        non_color_slots: non_color,
        warnings: wiring.warnings,
    }
}

// ============================================================================
// Building blocks
// ============================================================================

fn base_color(w: &mut Wiring, slot: u8) {
    w.graph.link(
        NodeId::ImageTexture(slot),
        Socket::Color,
        NodeId::PrincipledBsdf,
        Socket::BaseColor,
    );
}

fn normal_map(w: &mut Wiring, slot: u8) {
    w.graph.link(
        NodeId::ImageTexture(slot),
        Socket::Color,
        NodeId::NormalMap,
        Socket::Color,
    );
    w.graph.link(
        NodeId::NormalMap,
        Socket::Normal,
        NodeId::PrincipledBsdf,
        Socket::Normal,
    );
    w.non_color.push(slot);
}

/// Red drives specular, green roughness (inverted), blue metallic.
fn channel_map(w: &mut Wiring, slot: u8) {
    let g = &mut *w.graph;
    g.link(
        NodeId::ImageTexture(slot),
        Socket::Color,
        NodeId::TextureMapSeparate,
        Socket::Color,
    );
    g.link(
        NodeId::TextureMapSeparate,
        Socket::Red,
        NodeId::PrincipledBsdf,
        Socket::Specular,
    );
    g.link(
        NodeId::TextureMapSeparate,
        Socket::Green,
        NodeId::TextureMapRoughness,
        Socket::A,
    );
    g.link(
        NodeId::TextureMapSeparate,
        Socket::Blue,
        NodeId::TextureMapMetallic,
        Socket::A,
    );
    g.link(
        NodeId::TextureMapRoughness,
        Socket::Value,
        NodeId::PrincipledBsdf,
        Socket::Roughness,
    );
    g.link(
        NodeId::TextureMapMetallic,
        Socket::Value,
        NodeId::PrincipledBsdf,
        Socket::Metallic,
    );
    w.non_color.push(slot);
}

fn detail_mapping(w: &mut Wiring, slot: u8) {
    let multiplier = w.params.detail_multiplier.unwrap_or(1.0);
    let g = &mut *w.graph;
    g.link(
        NodeId::DetailTexCoord,
        Socket::Uv,
        NodeId::DetailMapping,
        Socket::Vector,
    );
    g.link(
        NodeId::DetailMapping,
        Socket::Vector,
        NodeId::ImageTexture(slot),
        Socket::Vector,
    );
    g.link(
        NodeId::DetailMultiplier,
        Socket::Value,
        NodeId::DetailMapping,
        Socket::Scale,
    );
    g.set_default(NodeId::DetailMultiplier, Socket::Value, multiplier);
}

fn pbr_mapping(w: &mut Wiring, slot: u8, multiplier: Option<f32>) {
    let g = &mut *w.graph;
    g.link(NodeId::PbrTexCoord, Socket::Uv, NodeId::PbrMapping, Socket::Vector);
    g.link(
        NodeId::PbrMapping,
        Socket::Vector,
        NodeId::ImageTexture(slot),
        Socket::Vector,
    );
    g.link(
        NodeId::PbrMultiplier,
        Socket::Value,
        NodeId::PbrMapping,
        Socket::Scale,
    );
    g.set_default(NodeId::PbrMultiplier, Socket::Value, multiplier.unwrap_or(1.0));
}

/// Base and detail colors mixed by the combined alpha of both layers.
fn detail_blend(w: &mut Wiring, base: u8, detail: u8) {
    let g = &mut *w.graph;
    g.link(NodeId::ImageTexture(base), Socket::Color, NodeId::DetailMix, Socket::A);
    g.link(NodeId::ImageTexture(base), Socket::Alpha, NodeId::AlphaMix, Socket::A);
    g.link(NodeId::ImageTexture(detail), Socket::Color, NodeId::DetailMix, Socket::B);
    g.link(NodeId::ImageTexture(detail), Socket::Alpha, NodeId::AlphaMix, Socket::B);
    g.set_default(NodeId::AlphaMix, Socket::Factor, 0.95);
    g.link(NodeId::AlphaMix, Socket::Result, NodeId::DetailMix, Socket::Factor);
    g.link(
        NodeId::DetailMix,
        Socket::Result,
        NodeId::PrincipledBsdf,
        Socket::BaseColor,
    );
}

fn detail_normal(w: &mut Wiring, normal: u8, detail: u8) {
    let blend = w.params.detail_normal_blend;
    let g = &mut *w.graph;
    g.link(
        NodeId::ImageTexture(normal),
        Socket::Color,
        NodeId::DetailNormalMix,
        Socket::A,
    );
    g.link(
        NodeId::ImageTexture(detail),
        Socket::Color,
        NodeId::DetailNormalMix,
        Socket::B,
    );
    g.link(
        NodeId::DetailNormalMix,
        Socket::Result,
        NodeId::NormalMap,
        Socket::Color,
    );
    g.link(
        NodeId::NormalMap,
        Socket::Normal,
        NodeId::PrincipledBsdf,
        Socket::Normal,
    );
    if let Some(blend) = blend {
        g.set_default(NodeId::DetailNormalMix, Socket::Factor, blend);
    }
    w.non_color.push(normal);
    w.non_color.push(detail);
}

fn emission(w: &mut Wiring, slot: u8) {
    w.graph.link(
        NodeId::ImageTexture(slot),
        Socket::Color,
        NodeId::PrincipledBsdf,
        Socket::Emission,
    );
}

/// Diffuse (+ detail when enabled), normal, channel map, detail mapping.
fn multimap(w: &mut Wiring) {
    if w.params.use_detail {
        detail_blend(w, 0, 3);
    } else {
        base_color(w, 0);
    }
    normal_map(w, 1);
    channel_map(w, 2);
    detail_mapping(w, 3);
}

// ============================================================================
// Table entries
// ============================================================================

fn wire_base(w: &mut Wiring) {
    base_color(w, 0);
}

fn wire_base_normal(w: &mut Wiring) {
    base_color(w, 0);
    normal_map(w, 1);
}

fn wire_emissive_normal(w: &mut Wiring) {
    base_color(w, 0);
    normal_map(w, 1);
    emission(w, 2);
}

fn wire_dual_layer(w: &mut Wiring) {
    base_color(w, 0);
    w.warnings
        .push("dual layer shader: layers and mask are not configured".to_string());
}

fn wire_multimap(w: &mut Wiring) {
    multimap(w);
}

fn wire_channels(w: &mut Wiring) {
    base_color(w, 0);
    normal_map(w, 1);
    channel_map(w, 2);
}

fn wire_five_base_normal(w: &mut Wiring) {
    if !w.params.use_detail {
        multimap(w);
        return;
    }
    wire_base_normal(w);
}

fn wire_five_emissive(w: &mut Wiring) {
    multimap(w);
    if w.params.use_detail {
        emission(w, 4);
    }
}

fn nm_detail(w: &mut Wiring, pbr_multiplier: Option<f32>) {
    detail_blend(w, 0, 3);
    detail_normal(w, 1, 4);
    channel_map(w, 2);
    detail_mapping(w, 3);
    pbr_mapping(w, 4, pbr_multiplier);
}

fn wire_five_nm_detail(w: &mut Wiring) {
    if !w.params.use_detail {
        multimap(w);
        return;
    }
    let multiplier = w.params.detail_multiplier;
    nm_detail(w, multiplier);
}

fn wire_five_at_nm_detail(w: &mut Wiring) {
    if !w.params.use_detail {
        multimap(w);
        return;
    }
    let multiplier = w.params.normal_multiplier;
    nm_detail(w, multiplier);
}

fn wire_five_sticker(w: &mut Wiring) {
    multimap(w);
    if w.params.use_detail {
        let multiplier = w.params.normal_multiplier;
        pbr_mapping(w, 1, multiplier);
    }
}

fn wire_five_multimap(w: &mut Wiring) {
    multimap(w);
}
