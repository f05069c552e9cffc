//! Walking a recorded frame through a replay controller and turning its
//! draw calls into scene meshes.
//!
//! The replay API itself is reached through [`CaptureSource`] and
//! [`ReplayController`]; [`snapshot`] implements both over a JSON capture
//! snapshot.

pub mod filter;
pub mod output;
pub mod snapshot;
pub mod textures;
pub mod walker;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;

pub use filter::EventFilter;
pub use output::CaptureOutput;
pub use walker::{import_capture, ImportSummary, SkipReason};

/// Identifier of a replay resource. Zero is the null resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u64);

impl ResourceId {
    pub const NULL: ResourceId = ResourceId(0);

    pub fn is_null(self) -> bool {
        self == Self::NULL
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResourceId::{}", self.0)
    }
}

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub event_id: u32,
    pub num_indices: u32,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexBufferBinding {
    pub resource: ResourceId,
    pub byte_offset: u64,
    pub byte_stride: u32,
}

/// Input-layout element: which vertex buffer slot a semantic reads from
/// and where inside the record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexInput {
    pub semantic: String,
    pub input_slot: u32,
    pub byte_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexBufferBinding {
    pub resource: ResourceId,
    pub byte_offset: u64,
    pub byte_stride: u32,
}

/// Input-assembly state at the current event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineState {
    #[serde(default)]
    pub vertex_buffers: Vec<VertexBufferBinding>,
    #[serde(default)]
    pub vertex_inputs: Vec<VertexInput>,
    #[serde(default)]
    pub index_buffer: Option<IndexBufferBinding>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// A read-only resource bound to a shader stage, with the name the shader
/// reflection gives its slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundTexture {
    pub slot_name: Option<String>,
    pub resource: ResourceId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDesc {
    pub resource: ResourceId,
    pub width: u32,
    pub height: u32,
}

/// An opened capture being replayed.
pub trait ReplayController {
    fn root_actions(&self) -> Vec<Action>;

    /// Move the replay to `event_id`; later state queries describe it.
    fn set_frame_event(&mut self, event_id: u32);

    fn pipeline_state(&self) -> PipelineState;

    /// Up to `length` bytes of a buffer starting at `offset`. Reads past
    /// the end of the buffer come back short.
    fn buffer_data(&self, resource: ResourceId, offset: u64, length: u64) -> anyhow::Result<Vec<u8>>;

    fn read_only_resources(&self, stage: ShaderStage) -> Vec<BoundTexture>;

    fn texture_desc(&self, resource: ResourceId) -> Option<TextureDesc>;

    /// Export mip 0 of a texture as DDS.
    fn save_texture(&mut self, resource: ResourceId, path: &Path) -> anyhow::Result<()>;

    fn shutdown(&mut self) {}
}

/// Opens captures. Failing here is a `ReplayFailure` and ends the run.
pub trait CaptureSource {
    fn open(&self, path: &Path) -> Result<Box<dyn ReplayController>>;
}
