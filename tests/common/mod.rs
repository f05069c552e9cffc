// Shared fixtures for the integration tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};

use base64::{prelude::BASE64_STANDARD, Engine};
use cgmath::{Matrix4, Vector3};
use rdac_tools_lib::buffer::{encode_indices, encode_vertices, IndexWidth, VertexLayout};
use rdac_tools_lib::capture::snapshot::{
    CaptureSnapshot, RecordedAction, RecordedBuffer, RecordedTexture,
};
use rdac_tools_lib::capture::{
    Action, BoundTexture, IndexBufferBinding, PipelineState, ResourceId, TextureDesc,
    VertexBufferBinding, VertexInput,
};
use rdac_tools_lib::scene::{ConstraintKind, Mesh, ObjectId, Scene};

pub const VERTEX_STRIDE: usize = 20;
pub const DIFFUSE_TEXTURE: ResourceId = ResourceId(900);

/// Corners of a unit quad shifted by `offset`.
pub fn quad(offset: [f32; 3]) -> Vec<[f32; 3]> {
    [[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]
        .iter()
        .map(|p| [p[0] + offset[0], p[1] + offset[1], p[2] + offset[2]])
        .collect()
}

pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 0, 2, 3];

fn input(semantic: &str, byte_offset: u32) -> VertexInput {
    VertexInput {
        semantic: semantic.to_string(),
        input_slot: 0,
        byte_offset,
    }
}

/// A recorded indexed draw of `positions`, with its buffers. Resource ids
/// are derived from the event id.
pub fn recorded_draw(
    event_id: u32,
    positions: &[[f32; 3]],
    indices: &[u32],
) -> (RecordedAction, Vec<RecordedBuffer>) {
    let layout = VertexLayout {
        stride: VERTEX_STRIDE,
        position_offset: 0,
        uv_offset: Some(12),
    };
    let uvs: Vec<[f32; 2]> = positions.iter().map(|p| [p[0], p[1]]).collect();
    let vertex_buffer = ResourceId(u64::from(event_id) * 10);
    let index_buffer = ResourceId(u64::from(event_id) * 10 + 1);

    let action = RecordedAction {
        action: Action {
            event_id,
            num_indices: indices.len() as u32,
            name: format!("DrawIndexed({})", indices.len()),
        },
        pipeline: PipelineState {
            vertex_buffers: vec![VertexBufferBinding {
                resource: vertex_buffer,
                byte_offset: 0,
                byte_stride: VERTEX_STRIDE as u32,
            }],
            vertex_inputs: vec![input("POSITION", 0), input("TEXCOORD", 12)],
            index_buffer: Some(IndexBufferBinding {
                resource: index_buffer,
                byte_offset: 0,
                byte_stride: 2,
            }),
        },
        fragment_resources: vec![
            BoundTexture {
                slot_name: Some("txDiffuse".to_string()),
                resource: DIFFUSE_TEXTURE,
            },
            BoundTexture {
                slot_name: Some("txCube".to_string()),
                resource: ResourceId(901),
            },
            BoundTexture {
                slot_name: Some("txNormal".to_string()),
                resource: ResourceId::NULL,
            },
        ],
    };
    let buffers = vec![
        RecordedBuffer::new(
            vertex_buffer,
            &encode_vertices(positions, Some(uvs.as_slice()), &layout),
        ),
        RecordedBuffer::new(index_buffer, &encode_indices(indices, IndexWidth::U16)),
    ];
    (action, buffers)
}

/// Three draws: quads at events 10 and 20, and a draw without an index
/// buffer at event 30.
pub fn sample_snapshot() -> CaptureSnapshot {
    let mut snapshot = CaptureSnapshot::default();
    for (event_id, offset) in [(10, [0.0, 0.0, 0.0]), (20, [5.0, 0.0, 0.0])] {
        let (action, buffers) = recorded_draw(event_id, &quad(offset), &QUAD_INDICES);
        snapshot.actions.push(action);
        snapshot.buffers.extend(buffers);
    }

    let (mut unindexed, _) = recorded_draw(30, &quad([0.0; 3]), &QUAD_INDICES);
    unindexed.pipeline.index_buffer = None;
    snapshot.actions.push(unindexed);

    snapshot.textures.push(RecordedTexture {
        desc: TextureDesc {
            resource: DIFFUSE_TEXTURE,
            width: 256,
            height: 256,
        },
        data: Some(BASE64_STANDARD.encode(b"DDS fake payload")),
    });
    snapshot.textures.push(RecordedTexture {
        desc: TextureDesc {
            resource: ResourceId(901),
            width: 64,
            height: 64,
        },
        data: None,
    });
    snapshot
}

/// Write `snapshot` as `<dir>/<name>.json` and return its path.
pub fn write_capture(dir: &Path, name: &str, snapshot: &CaptureSnapshot) -> PathBuf {
    let path = dir.join(format!("{}.json", name));
    snapshot.save(&path).expect("Failed to save capture snapshot");
    path
}

pub fn mesh_from(positions: &[[f32; 3]]) -> Mesh {
    Mesh::new(
        positions.iter().map(|p| Vector3::new(p[0], p[1], p[2])).collect(),
        vec![[0, 1, 2], [0, 2, 3]],
    )
}

pub fn translation(x: f32, y: f32, z: f32) -> Matrix4<f32> {
    Matrix4::from_translation(Vector3::new(x, y, z))
}

/// Reference model: `car_root` at x=10 with a `body` mesh under it and a
/// free-standing `wheel` mesh.
pub struct ReferenceFixture {
    pub scene: Scene,
    pub root: ObjectId,
    pub body: ObjectId,
    pub wheel: ObjectId,
}

pub fn reference_fixture() -> ReferenceFixture {
    let mut scene = Scene::new();
    let root = scene.add_object("car_root", None);
    scene.object_mut(root).unwrap().matrix_basis = translation(10.0, 0.0, 0.0);

    let body_material = scene.add_material("Paint");
    let mut body_mesh = mesh_from(&quad([0.0; 3]));
    body_mesh.set_primary_material(body_material);
    let body = scene.add_object("body", Some(body_mesh));
    scene.set_parent(body, Some(root)).unwrap();
    scene.object_mut(body).unwrap().matrix_basis = translation(0.0, 3.0, 0.0);

    let wheel_material = scene.add_material("Rubber");
    let mut wheel_mesh = mesh_from(&quad([5.0, 0.0, 0.0]));
    wheel_mesh.set_primary_material(wheel_material);
    let wheel = scene.add_object("wheel", Some(wheel_mesh));

    for id in [root, body, wheel] {
        scene.link_object("kn5", id);
    }
    ReferenceFixture {
        scene,
        root,
        body,
        wheel,
    }
}

/// Add a capture mesh with its own material to the `RDC` collection.
pub fn add_capture_mesh(scene: &mut Scene, name: &str, positions: &[[f32; 3]]) -> ObjectId {
    let material = scene.add_material(&format!("{}_material", name));
    let mut mesh = mesh_from(positions);
    mesh.set_primary_material(material);
    let id = scene.add_object(name, Some(mesh));
    scene.link_object("RDC", id);
    id
}

pub fn mark(scene: &mut Scene, source: ObjectId, target: ObjectId) -> String {
    scene
        .add_constraint(source, ConstraintKind::CopyTransforms, Some(target))
        .expect("Failed to add marker")
}
