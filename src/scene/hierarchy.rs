use cgmath::{Matrix4, SquareMatrix};
use ptree::TreeBuilder;
use std::collections::HashSet;
use std::io;

use super::{split_numeric_suffix, ObjectId, Scene};
use crate::error::{ImportError, Result};
use crate::math;

/// Re-parent an object while keeping its world transform.
///
/// With a parent, the parent inverse becomes the inverse of the parent's
/// world matrix and the basis becomes the current world matrix, so
/// `parent_world * parent_inverse * basis` is unchanged.
pub fn reparent_keep_transform(
    scene: &mut Scene,
    id: ObjectId,
    parent: Option<ObjectId>,
) -> Result<()> {
    let world = scene
        .world_matrix(id)
        .ok_or_else(|| ImportError::MissingReference(format!("object {}", id)))?;
    let parent_inverse = match parent {
        Some(p) => {
            let parent_world = scene.world_matrix(p).ok_or_else(|| {
                ImportError::MissingReference(format!("parent object {}", p))
            })?;
            math::try_invert(&parent_world).ok_or_else(|| {
                ImportError::UnsupportedFormat(format!(
                    "world transform of parent {} is not invertible",
                    p
                ))
            })?
        }
        None => Matrix4::identity(),
    };

    scene.set_parent(id, parent)?;
    if let Some(object) = scene.object_mut(id) {
        object.matrix_parent_inverse = parent_inverse;
        object.matrix_basis = world;
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct HierarchySummary {
    /// (old name, new name) for every renamed mesh.
    pub renamed: Vec<(String, String)>,
    /// Parents moved to the holding collection.
    pub moved_parents: Vec<String>,
    /// Objects deleted with the holding collection.
    pub deleted: usize,
}

/// Collapse one level of hierarchy in a collection: every mesh with a
/// parent takes the parent's name and moves up to its grandparent, keeping
/// its world transform. The parents go to `holding`; unless `preserve` is
/// set, they are then deleted together with that collection.
pub fn rename_and_reparent_meshes(
    scene: &mut Scene,
    collection: &str,
    holding: &str,
    preserve: bool,
) -> Result<HierarchySummary> {
    if scene.collection(collection).is_none() {
        return Err(ImportError::MissingReference(format!(
            "collection '{}'",
            collection
        )));
    }

    let mut summary = HierarchySummary::default();
    for id in scene.collection_objects(collection) {
        if !scene.in_collection(collection, id) {
            continue;
        }
        let Some(object) = scene.object(id) else {
            continue;
        };
        if !object.is_mesh() {
            continue;
        }
        let Some(parent) = scene.parent_of(id) else {
            continue;
        };
        let old_name = object.name.clone();
        let parent_name = scene.object_name(parent).unwrap_or_default().to_string();
        let grandparent = scene.parent_of(parent);

        let new_name = scene
            .rename_object(id, &parent_name)
            .unwrap_or_else(|| old_name.clone());
        log::info!("Renamed {} to {}", old_name, new_name);

        if let Err(e) = reparent_keep_transform(scene, id, grandparent) {
            log::error!("Could not reparent {}: {}", new_name, e);
            continue;
        }
        summary.renamed.push((old_name, new_name));

        scene.link_object(holding, parent);
        if scene.unlink_object(collection, parent) {
            summary.moved_parents.push(parent_name);
        }
    }

    if !preserve {
        for id in scene.collection_objects(holding) {
            if scene.remove_object(id).is_some() {
                summary.deleted += 1;
            }
        }
        scene.remove_collection(holding);
        log::info!("Deleted {} unused parents", summary.deleted);
    }

    Ok(summary)
}

/// Strip numeric `.NNN` suffixes from object names whose base name is free.
pub fn resolve_suffixed_names(scene: &mut Scene) -> Vec<(String, String)> {
    let candidates: Vec<(ObjectId, String)> = scene
        .objects()
        .map(|(id, o)| (id, o.name.clone()))
        .collect();

    let mut renamed = vec![];
    for (id, name) in candidates {
        let (base, suffix) = split_numeric_suffix(&name);
        if suffix.is_none() || scene.object_by_name(base).is_some() {
            continue;
        }
        let base = base.to_string();
        if let Some(new_name) = scene.rename_object(id, &base) {
            log::info!("Renamed {} to {}", name, new_name);
            renamed.push((name, new_name));
        }
    }
    renamed
}

fn object_label(scene: &Scene, id: ObjectId) -> String {
    let Some(object) = scene.object(id) else {
        return format!("<stale {}>", id);
    };
    let mut label = object.name.clone();
    if let Some(mesh) = &object.mesh {
        label.push_str(&format!(" ({} verts)", mesh.vertex_count()));
    }
    for marker in object.markers() {
        let target = marker
            .target
            .and_then(|t| scene.object_name(t))
            .unwrap_or("<none>");
        label.push_str(&format!(" -> {}", target));
    }
    if object.hidden {
        label.push_str(" [hidden]");
    }
    label
}

fn add_object_to_tree(
    scene: &Scene,
    id: ObjectId,
    members: &HashSet<ObjectId>,
    tree: &mut TreeBuilder,
    visited: &mut HashSet<ObjectId>,
) {
    if !visited.insert(id) {
        return;
    }
    let children: Vec<ObjectId> = scene
        .children(id)
        .into_iter()
        .filter(|c| members.contains(c))
        .collect();
    if children.is_empty() {
        tree.add_empty_child(object_label(scene, id));
    } else {
        tree.begin_child(object_label(scene, id));
        for child in children {
            add_object_to_tree(scene, child, members, tree, visited);
        }
        tree.end_child();
    }
}

/// Write every collection and its parent trees.
pub fn write_tree<W: io::Write>(scene: &Scene, out: W) -> io::Result<()> {
    let mut tree = TreeBuilder::new("scene".to_string());
    let mut linked = HashSet::new();

    for collection in scene.collections() {
        let members: HashSet<ObjectId> = scene
            .collection_objects(&collection.name)
            .into_iter()
            .collect();
        linked.extend(members.iter().copied());

        tree.begin_child(format!("{} ({})", collection.name, members.len()));
        let mut visited = HashSet::new();
        for id in scene.collection_objects(&collection.name) {
            let is_root = scene
                .parent_of(id)
                .map(|p| !members.contains(&p))
                .unwrap_or(true);
            if is_root {
                add_object_to_tree(scene, id, &members, &mut tree, &mut visited);
            }
        }
        tree.end_child();
    }

    let unlinked: Vec<ObjectId> = scene
        .objects()
        .map(|(id, _)| id)
        .filter(|id| !linked.contains(id))
        .collect();
    if !unlinked.is_empty() {
        tree.begin_child("(unlinked)".to_string());
        for id in unlinked {
            tree.add_empty_child(object_label(scene, id));
        }
        tree.end_child();
    }

    ptree::write_tree(&tree.build(), out)
}
