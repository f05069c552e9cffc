//! Import of the converted reference model from glTF.

use anyhow::{anyhow, Context};
use cgmath::{Matrix4, Vector3};
use std::path::Path;

use super::{Mesh, ObjectId, Scene, UvLayer};
use crate::math::flip_v;
use crate::scene::mesh::DEFAULT_UV_LAYER;

/// Import every node of the glTF's default scene into `collection`,
/// keeping the node hierarchy and local transforms.
pub fn import_reference_gltf(
    scene: &mut Scene,
    path: &Path,
    collection: &str,
) -> anyhow::Result<Vec<ObjectId>> {
    let (doc, buffers, _images) = ::gltf::import(path)
        .with_context(|| format!("Failed to read glTF {}", path.display()))?;
    let gltf_scene = doc
        .default_scene()
        .or_else(|| doc.scenes().next())
        .ok_or_else(|| anyhow!("{} contains no scene", path.display()))?;

    scene.ensure_collection(collection);
    let mut created = vec![];
    for node in gltf_scene.nodes() {
        import_node(scene, &node, None, &buffers, collection, &mut created)?;
    }
    log::info!(
        "Imported {} reference objects from {}",
        created.len(),
        path.display()
    );
    Ok(created)
}

fn import_node(
    scene: &mut Scene,
    node: &::gltf::Node,
    parent: Option<ObjectId>,
    buffers: &[::gltf::buffer::Data],
    collection: &str,
    created: &mut Vec<ObjectId>,
) -> anyhow::Result<()> {
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("Node_{}", node.index()));
    let mesh = match node.mesh() {
        Some(mesh) => Some(build_mesh(scene, &mesh, buffers)?),
        None => None,
    };

    let id = scene.add_object(&name, mesh);
    if let Some(object) = scene.object_mut(id) {
        let mat_array: [[f32; 4]; 4] = node.transform().matrix();
        object.matrix_basis = Matrix4::from(mat_array);
    }
    if parent.is_some() {
        scene.set_parent(id, parent)?;
    }
    scene.link_object(collection, id);
    created.push(id);

    for child in node.children() {
        import_node(scene, &child, Some(id), buffers, collection, created)?;
    }
    Ok(())
}

/// Merge a glTF mesh's triangle primitives into one mesh. The first
/// primitive's material becomes the primary material.
fn build_mesh(
    scene: &mut Scene,
    mesh: &::gltf::Mesh,
    buffers: &[::gltf::buffer::Data],
) -> anyhow::Result<Mesh> {
    let mut positions: Vec<Vector3<f32>> = vec![];
    let mut faces: Vec<[u32; 3]> = vec![];
    let mut loop_uvs: Vec<[f32; 2]> = vec![];
    let mut has_uvs = true;
    let mut material_name: Option<String> = None;

    for primitive in mesh.primitives() {
        if primitive.mode() != ::gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping non-triangle primitive {} of mesh {:?}",
                primitive.index(),
                mesh.name()
            );
            continue;
        }
        let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()].0[..]));
        let base = positions.len() as u32;

        let prim_positions: Vec<Vector3<f32>> = reader
            .read_positions()
            .ok_or_else(|| anyhow!("primitive {} has no positions", primitive.index()))?
            .map(|p| Vector3::new(p[0], p[1], p[2]))
            .collect();
        let count = prim_positions.len() as u32;
        let indices: Vec<u32> = match reader.read_indices() {
            Some(indices) => indices.into_u32().collect(),
            None => (0..count).collect(),
        };
        let uvs: Option<Vec<[f32; 2]>> = reader
            .read_tex_coords(0)
            .map(|t| t.into_f32().map(flip_v).collect());
        if uvs.is_none() {
            has_uvs = false;
        }

        for tri in indices.chunks_exact(3) {
            if tri.iter().any(|&i| i >= count) {
                return Err(anyhow!(
                    "primitive {} references a vertex out of range",
                    primitive.index()
                ));
            }
            faces.push([base + tri[0], base + tri[1], base + tri[2]]);
            if let Some(uvs) = &uvs {
                for &i in tri {
                    loop_uvs.push(uvs.get(i as usize).copied().unwrap_or([0.0, 0.0]));
                }
            }
        }
        positions.extend(prim_positions);

        if material_name.is_none() {
            material_name = primitive.material().name().map(str::to_string);
        }
    }

    let mut result = Mesh::new(positions, faces);
    if has_uvs && !loop_uvs.is_empty() {
        result.uv_layers.push(UvLayer {
            name: DEFAULT_UV_LAYER.to_string(),
            uvs: loop_uvs,
        });
    }
    if let Some(name) = material_name {
        let material = scene
            .material_by_name(&name)
            .unwrap_or_else(|| scene.add_material(&name));
        result.set_primary_material(material);
    }
    Ok(result)
}
