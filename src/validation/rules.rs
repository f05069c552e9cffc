use super::limits::*;
use super::report::*;
use crate::texture_pipeline::is_placeholder;

fn item(
    code: &str,
    severity: DiagnosticSeverity,
    category: DiagnosticCategory,
    message: String,
) -> DiagnosticItem {
    DiagnosticItem {
        code: code.to_string(),
        message,
        severity,
        category,
    }
}

/// Flag a texture whose dimensions mark it as an encrypted placeholder.
pub fn check_texture_placeholder(
    texture_name: &str,
    width: u32,
    height: u32,
    min_dimension: u32,
) -> Option<DiagnosticItem> {
    if is_placeholder(width, height, min_dimension) {
        Some(item(
            "TEXTURE_PLACEHOLDER",
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Texture,
            format!("{} is encrypted.", texture_name),
        ))
    } else {
        None
    }
}

/// Check decoded mesh sizes against the configured caps.
pub fn check_mesh_size(
    event_id: u32,
    vertex_count: usize,
    index_count: usize,
    max_vertices: usize,
    max_indices: usize,
) -> Option<DiagnosticItem> {
    if vertex_count > max_vertices || index_count > max_indices {
        Some(item(
            "MESH_SIZE_LIMIT",
            DiagnosticSeverity::Warning,
            DiagnosticCategory::Mesh,
            format!(
                "Mesh_{} skipped: {} vertices / {} indices exceeds the limit of {} / {}.",
                event_id, vertex_count, index_count, max_vertices, max_indices
            ),
        ))
    } else {
        None
    }
}

pub fn mesh_skipped(event_id: u32, reason: &str) -> DiagnosticItem {
    item(
        "MESH_SKIPPED",
        DiagnosticSeverity::Info,
        DiagnosticCategory::Mesh,
        format!("Action {} skipped: {}.", event_id, reason),
    )
}

pub fn mesh_malformed(event_id: u32, reason: &str) -> DiagnosticItem {
    item(
        "MESH_MALFORMED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Mesh,
        format!("Action {} produced an unusable mesh: {}.", event_id, reason),
    )
}

pub fn texture_export_failed(texture: &str, reason: &str) -> DiagnosticItem {
    item(
        "TEXTURE_EXPORT_FAILED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Texture,
        format!("Could not export {}: {}.", texture, reason),
    )
}

pub fn unmatched_mesh(object_name: &str) -> DiagnosticItem {
    item(
        "MATCH_UNMATCHED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Match,
        format!("No match found for {}", object_name),
    )
}

pub fn duplicate_markers(object_name: &str, marker_count: usize) -> DiagnosticItem {
    item(
        "MARKER_DUPLICATE",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Match,
        format!(
            "{} carries {} copy-transform markers",
            object_name, marker_count
        ),
    )
}

pub fn marker_without_target(object_name: &str) -> DiagnosticItem {
    item(
        "MARKER_NO_TARGET",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Match,
        format!("{} has a copy-transform marker without a live target", object_name),
    )
}

pub fn material_unused(material_name: &str) -> DiagnosticItem {
    item(
        "MATERIAL_UNUSED",
        DiagnosticSeverity::Info,
        DiagnosticCategory::Material,
        format!(
            "Material '{}' is not used on any mesh object. It was skipped.",
            material_name
        ),
    )
}

pub fn material_skipped(object_name: &str, reason: &str) -> DiagnosticItem {
    item(
        "MATERIAL_SKIPPED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Material,
        format!("Material remap for {} skipped: {}", object_name, reason),
    )
}

pub fn material_failed(material_name: &str, reason: &str) -> DiagnosticItem {
    item(
        "MATERIAL_FAILED",
        DiagnosticSeverity::Error,
        DiagnosticCategory::Material,
        format!("Failed to configure material '{}': {}", material_name, reason),
    )
}

pub fn shader_warning(material_name: &str, warning: &str) -> DiagnosticItem {
    item(
        "SHADER_UNSUPPORTED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Material,
        format!("{}: {}", material_name, warning),
    )
}

pub fn texture_count_unsupported(material_name: &str, slot_count: usize) -> DiagnosticItem {
    item(
        "TEXTURE_COUNT_UNSUPPORTED",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Material,
        format!(
            "{}: unsupported amount of textures ({}), no shader details were set up",
            material_name, slot_count
        ),
    )
}

pub fn missing_reference(subject: &str, reason: &str) -> DiagnosticItem {
    item(
        "MISSING_REFERENCE",
        DiagnosticSeverity::Warning,
        DiagnosticCategory::Scene,
        format!("{}: {}", subject, reason),
    )
}

pub fn pair_failed(object_name: &str, stage: &str, reason: &str) -> DiagnosticItem {
    item(
        "PAIR_FAILED",
        DiagnosticSeverity::Error,
        DiagnosticCategory::Scene,
        format!("{} stopped after {}: {}", object_name, stage, reason),
    )
}

pub fn config_line_ignored(section: &str, line_number: usize, line: &str) -> DiagnosticItem {
    item(
        "CONFIG_LINE_IGNORED",
        DiagnosticSeverity::Info,
        DiagnosticCategory::Config,
        format!("[{}] line {} ignored: {}", section, line_number, line),
    )
}

/// Validate a matching threshold coming from the operator surface.
pub fn check_threshold(threshold: f32) -> Option<DiagnosticItem> {
    if !threshold.is_finite() || threshold < 0.0 {
        Some(item(
            "THRESHOLD_INVALID",
            DiagnosticSeverity::Error,
            DiagnosticCategory::Config,
            format!("Matching threshold {} must be a finite value >= 0", threshold),
        ))
    } else if threshold < MIN_MATCH_THRESHOLD {
        Some(item(
            "THRESHOLD_TINY",
            DiagnosticSeverity::Info,
            DiagnosticCategory::Config,
            format!(
                "Matching threshold {} only matches coincident centroids",
                threshold
            ),
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_below_two_pixels() {
        assert!(check_texture_placeholder("a.dds", 1, 1, 2).is_some());
        assert!(check_texture_placeholder("a.dds", 1, 64, 2).is_some());
        assert!(check_texture_placeholder("a.dds", 2, 2, 2).is_none());
    }

    #[test]
    fn placeholder_threshold_is_configurable() {
        assert!(check_texture_placeholder("a.dds", 4, 4, 8).is_some());
        assert!(check_texture_placeholder("a.dds", 4, 4, 4).is_none());
    }

    #[test]
    fn mesh_size_limit() {
        assert!(check_mesh_size(1, MAX_VERTICES, MAX_INDICES, MAX_VERTICES, MAX_INDICES).is_none());
        let item = check_mesh_size(7, MAX_VERTICES + 1, 3, MAX_VERTICES, MAX_INDICES).unwrap();
        assert_eq!(item.code, "MESH_SIZE_LIMIT");
        assert!(item.message.starts_with("Mesh_7"));
    }

    #[test]
    fn threshold_rules() {
        assert_eq!(check_threshold(-1.0).unwrap().severity, DiagnosticSeverity::Error);
        assert_eq!(check_threshold(f32::NAN).unwrap().severity, DiagnosticSeverity::Error);
        assert_eq!(check_threshold(0.0).unwrap().severity, DiagnosticSeverity::Info);
        assert!(check_threshold(DEFAULT_MATCH_THRESHOLD).is_none());
    }
}
