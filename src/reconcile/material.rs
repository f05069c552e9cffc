//! Primary-material identity swap between a capture mesh and the reference
//! mesh it replaces.

use serde::Serialize;

use crate::scene::{MaterialId, ObjectId, Scene};

/// Whether a material name carries the reserved "old" suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MaterialState {
    Original,
    MarkedOld,
}

impl MaterialState {
    pub fn of(name: &str, suffix: &str) -> Self {
        if !suffix.is_empty() && name.ends_with(suffix) {
            MaterialState::MarkedOld
        } else {
            MaterialState::Original
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MaterialRemap {
    /// The reference material now carries the suffix and the capture
    /// material took over its original name (when the capture mesh had one).
    Renamed {
        marked_old: String,
        source_material: Option<String>,
    },
    /// The reference material was already marked; the unsuffixed sibling
    /// was put back on the capture mesh.
    Reassigned { material: String },
    Skipped(String),
}

/// Swap material identity from `target` onto `source`.
///
/// A reference material named `M` becomes `M<suffix>` (unless that name is
/// already taken, in which case the existing one stands in) and the capture
/// mesh's primary material is renamed to `M`. When the reference material
/// is already `M<suffix>`, nothing is renamed and `M` is assigned to the
/// capture mesh instead.
pub fn remap_material(scene: &mut Scene, source: ObjectId, target: ObjectId, suffix: &str) -> MaterialRemap {
    let Some(target_object) = scene.object(target) else {
        return MaterialRemap::Skipped("target object no longer exists".to_string());
    };
    let Some(target_material) = target_object.mesh.as_ref().and_then(|m| m.primary_material()) else {
        return MaterialRemap::Skipped(format!("'{}' has no material", target_object.name));
    };
    let Some(target_name) = scene.material(target_material).map(|m| m.name.clone()) else {
        return MaterialRemap::Skipped("target material no longer exists".to_string());
    };

    match MaterialState::of(&target_name, suffix) {
        MaterialState::Original => mark_old_and_rename(scene, source, target_material, &target_name, suffix),
        MaterialState::MarkedOld => {
            let original = &target_name[..target_name.len() - suffix.len()];
            reassign_original(scene, source, original)
        }
    }
}

fn mark_old_and_rename(
    scene: &mut Scene,
    source: ObjectId,
    target_material: MaterialId,
    original: &str,
    suffix: &str,
) -> MaterialRemap {
    let desired = format!("{}{}", original, suffix);
    let marked_old = match scene.material_by_name(&desired) {
        Some(_) => desired,
        None => scene
            .rename_material(target_material, &desired)
            .unwrap_or(desired),
    };

    let source_material = scene
        .primary_material(source)
        .filter(|m| *m != target_material)
        .and_then(|m| scene.rename_material(m, original));
    log::info!(
        "Reference material marked '{}', capture material now '{}'",
        marked_old,
        source_material.as_deref().unwrap_or("<none>")
    );

    MaterialRemap::Renamed {
        marked_old,
        source_material,
    }
}

fn reassign_original(scene: &mut Scene, source: ObjectId, original: &str) -> MaterialRemap {
    let Some(material) = scene.material_by_name(original) else {
        return MaterialRemap::Skipped(format!("no material named '{}' to reassign", original));
    };
    let Some(mesh) = scene.object_mut(source).and_then(|o| o.mesh.as_mut()) else {
        return MaterialRemap::Skipped("capture object has no mesh".to_string());
    };
    mesh.set_primary_material(material);
    log::info!("Assigned original material '{}' instead of renaming", original);
    MaterialRemap::Reassigned {
        material: original.to_string(),
    }
}
