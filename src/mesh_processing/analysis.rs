use cgmath::Vector3;
use serde::{Deserialize, Serialize};

use crate::buffer::DecodeLimits;
use crate::math;
use crate::scene::Mesh;

/// Summary statistics for a scene mesh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeshAnalysisReport {
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub index_count: usize,
    pub material_count: usize,
    pub has_texcoords: bool,
    /// Mean of the vertex positions in object space.
    pub centroid: Vector3<f32>,
    /// Warnings about potential issues (degenerate or oversized geometry).
    pub warnings: Vec<String>,
}

/// Analyze a mesh for matching and logging.
pub fn analyze_mesh(mesh: &Mesh, limits: &DecodeLimits) -> MeshAnalysisReport {
    let vertex_count = mesh.vertex_count();
    let triangle_count = mesh.faces.len();
    let mut warnings = vec![];

    if vertex_count == 0 {
        warnings.push("Mesh has no vertices; it matches any other empty mesh.".to_string());
    }
    if triangle_count == 0 && vertex_count > 0 {
        warnings.push("Mesh has vertices but no faces.".to_string());
    }
    if vertex_count > limits.max_vertices {
        warnings.push(format!(
            "Vertex count ({}) exceeds the import limit ({}).",
            vertex_count, limits.max_vertices
        ));
    }

    MeshAnalysisReport {
        vertex_count,
        triangle_count,
        index_count: triangle_count * 3,
        material_count: mesh.materials.iter().flatten().count(),
        has_texcoords: !mesh.uv_layers.is_empty(),
        centroid: math::centroid(&mesh.positions),
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_simple_mesh() {
        let mesh = Mesh::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(3.0, 0.0, 0.0),
                Vector3::new(0.0, 3.0, 0.0),
            ],
            vec![[0, 1, 2]],
        );
        let report = analyze_mesh(&mesh, &DecodeLimits::default());
        assert_eq!(report.vertex_count, 3);
        assert_eq!(report.triangle_count, 1);
        assert_eq!(report.index_count, 3);
        assert!(!report.has_texcoords);
        assert!((report.centroid.x - 1.0).abs() < 0.001);
        assert!((report.centroid.y - 1.0).abs() < 0.001);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn empty_mesh_warns() {
        let report = analyze_mesh(&Mesh::new(vec![], vec![]), &DecodeLimits::default());
        assert_eq!(report.vertex_count, 0);
        assert_eq!(report.warnings.len(), 1);
    }
}
