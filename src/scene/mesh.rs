use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use super::MaterialId;
use crate::buffer::DecodedMesh;
use crate::validation::limits::AUTO_SMOOTH_ANGLE;

pub const DEFAULT_UV_LAYER: &str = "UVMap";

/// Per-loop texture coordinates (three per triangle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UvLayer {
    pub name: String,
    pub uvs: Vec<[f32; 2]>,
}

/// Triangle mesh data owned by an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub positions: Vec<Vector3<f32>>,
    pub faces: Vec<[u32; 3]>,
    pub uv_layers: Vec<UvLayer>,
    pub materials: Vec<Option<MaterialId>>,
    pub smooth: bool,
    pub auto_smooth_angle: Option<f32>,
}

impl Mesh {
    pub fn new(positions: Vec<Vector3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            positions,
            faces,
            uv_layers: vec![],
            materials: vec![],
            smooth: false,
            auto_smooth_angle: None,
        }
    }

    /// Build a smooth-shaded mesh from decoded capture buffers, expanding
    /// per-vertex UVs to per-loop UVs.
    pub fn from_decoded(decoded: &DecodedMesh) -> Self {
        let faces: Vec<[u32; 3]> = decoded.triangles().collect();
        let mut mesh = Mesh::new(decoded.positions.clone(), faces);

        if let Some(uvs) = &decoded.uvs {
            let loops = mesh
                .faces
                .iter()
                .flat_map(|f| f.iter())
                .map(|&v| uvs.get(v as usize).copied().unwrap_or([0.0, 0.0]))
                .collect();
            mesh.uv_layers.push(UvLayer {
                name: DEFAULT_UV_LAYER.to_string(),
                uvs: loops,
            });
        }

        mesh.smooth = true;
        mesh.auto_smooth_angle = Some(AUTO_SMOOTH_ANGLE);
        mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Material in the first slot.
    pub fn primary_material(&self) -> Option<MaterialId> {
        self.materials.first().copied().flatten()
    }

    /// Put a material in the first slot, creating the slot if needed.
    pub fn set_primary_material(&mut self, material: MaterialId) {
        match self.materials.first_mut() {
            Some(slot) => *slot = Some(material),
            None => self.materials.push(Some(material)),
        }
    }
}
