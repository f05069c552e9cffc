use std::path::Path;

use crate::error::Result;
use crate::scene::Scene;

pub fn save_scene_to_file(scene: &Scene, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(scene)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn load_scene_from_file(path: &Path) -> Result<Scene> {
    let json = std::fs::read_to_string(path)?;
    let scene: Scene = serde_json::from_str(&json)?;
    Ok(scene)
}

/// Load the scene at `path`, or start an empty one when the file does not exist yet.
pub fn load_or_new(path: &Path) -> Result<Scene> {
    if path.exists() {
        load_scene_from_file(path)
    } else {
        Ok(Scene::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ConstraintKind, Mesh};
    use crate::shader::ShaderGraph;
    use cgmath::Vector3;

    #[test]
    fn empty_scene_roundtrip() {
        let scene = Scene::new();
        let json = serde_json::to_string_pretty(&scene).unwrap();
        let loaded: Scene = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.objects().count(), 0);
    }

    #[test]
    fn handles_survive_save_and_load() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("scene.json");

        let mut scene = Scene::new();
        let material = scene.add_material("Material_12");
        scene.material_mut(material).unwrap().node_tree = Some(ShaderGraph::standard());
        let mut mesh = Mesh::new(vec![Vector3::new(1.0, 2.0, 3.0)], vec![]);
        mesh.set_primary_material(material);
        let source = scene.add_object("Mesh_12", Some(mesh));
        let target = scene.add_object("body", None);
        scene.link_object("RDC", source);
        scene
            .add_constraint(source, ConstraintKind::CopyTransforms, Some(target))
            .unwrap();
        // leave a stale slot behind
        let gone = scene.add_object("gone", None);
        scene.remove_object(gone);

        save_scene_to_file(&scene, &path).unwrap();
        let loaded = load_scene_from_file(&path).unwrap();

        assert!(loaded.object(gone).is_none());
        assert_eq!(loaded.object_name(source), Some("Mesh_12"));
        assert_eq!(loaded.collection_objects("RDC"), vec![source]);
        assert_eq!(loaded.primary_material(source), Some(material));
        assert_eq!(
            loaded.object(source).unwrap().constraints[0].target,
            Some(target)
        );
        assert!(loaded
            .material(material)
            .and_then(|m| m.node_tree.as_ref())
            .map(|g| g.missing_nodes().is_empty())
            .unwrap_or(false));
    }

    #[test]
    fn missing_file_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let scene = load_or_new(&dir.path().join("none.json")).unwrap();
        assert_eq!(scene.objects().count(), 0);
    }
}
