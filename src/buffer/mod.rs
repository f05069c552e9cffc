//! Reconstruction of triangle meshes from raw vertex and index buffer bytes.
//!
//! Vertex buffers are interleaved `stride`-sized records; the position
//! attribute is three little-endian `f32`s, the optional texcoord two.
//! Index buffers are tightly packed unsigned 16- or 32-bit values
//! describing a triangle list.

use binrw::BinReaderExt;
use cgmath::Vector3;
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Seek, SeekFrom};
use thiserror::Error;

use crate::math::{RawVector2, RawVector3};
use crate::validation::limits::{MAX_INDICES, MAX_VERTICES};

/// Size in bytes of a position attribute.
pub const POSITION_SIZE: usize = 12;
/// Size in bytes of a texcoord attribute.
pub const TEXCOORD_SIZE: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("malformed vertex buffer: {0}")]
    MalformedBuffer(String),

    #[error("malformed index buffer: {0}")]
    MalformedIndices(String),

    #[error(
        "mesh exceeds size limit: {vertices} vertices / {indices} indices \
         (limit {max_vertices} / {max_indices})"
    )]
    SizeLimitExceeded {
        vertices: usize,
        indices: usize,
        max_vertices: usize,
        max_indices: usize,
    },
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Width of one index in the index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexWidth {
    U16,
    U32,
}

impl IndexWidth {
    /// Map an index buffer byte stride to a width. Only 2 and 4 are valid.
    pub fn from_stride(stride: u32) -> Result<Self> {
        match stride {
            2 => Ok(IndexWidth::U16),
            4 => Ok(IndexWidth::U32),
            other => Err(DecodeError::MalformedBuffer(format!(
                "index width must be 2 or 4 bytes, got {}",
                other
            ))),
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            IndexWidth::U16 => 2,
            IndexWidth::U32 => 4,
        }
    }
}

/// Where the decoded attributes sit inside one vertex record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    pub stride: usize,
    pub position_offset: usize,
    pub uv_offset: Option<usize>,
}

/// Hard caps on the size of a single decoded mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeLimits {
    pub max_vertices: usize,
    pub max_indices: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_vertices: MAX_VERTICES,
            max_indices: MAX_INDICES,
        }
    }
}

/// Positions, optional per-vertex UVs and a triangle index list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedMesh {
    pub positions: Vec<Vector3<f32>>,
    /// Parallel to `positions`, V already flipped.
    pub uvs: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
}

impl DecodedMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn triangles(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|t| [t[0], t[1], t[2]])
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.indices.is_empty()
    }
}

fn check_layout(raw_len: usize, layout: &VertexLayout) -> Result<usize> {
    if layout.stride == 0 {
        return Err(DecodeError::MalformedBuffer("stride is zero".to_string()));
    }
    if layout.position_offset + POSITION_SIZE > layout.stride {
        return Err(DecodeError::MalformedBuffer(format!(
            "position at offset {} does not fit in a {}-byte record",
            layout.position_offset, layout.stride
        )));
    }
    if let Some(uv_offset) = layout.uv_offset {
        if uv_offset + TEXCOORD_SIZE > layout.stride {
            return Err(DecodeError::MalformedBuffer(format!(
                "texcoord at offset {} does not fit in a {}-byte record",
                uv_offset, layout.stride
            )));
        }
    }
    if raw_len < layout.stride {
        return Err(DecodeError::MalformedBuffer(format!(
            "{} bytes is shorter than one {}-byte record",
            raw_len, layout.stride
        )));
    }
    if raw_len % layout.stride != 0 {
        return Err(DecodeError::MalformedBuffer(format!(
            "{} bytes is not a multiple of the {}-byte stride",
            raw_len, layout.stride
        )));
    }
    Ok(raw_len / layout.stride)
}

/// Decode every record of an interleaved vertex buffer.
///
/// Returns one position per record and, when `layout.uv_offset` is set,
/// one flipped UV per record.
pub fn decode_vertices(
    raw: &[u8],
    layout: &VertexLayout,
) -> Result<(Vec<Vector3<f32>>, Option<Vec<[f32; 2]>>)> {
    let count = check_layout(raw.len(), layout)?;
    let mut cursor = Cursor::new(raw);
    let mut positions = Vec::with_capacity(count);
    let mut uvs = layout.uv_offset.map(|_| Vec::with_capacity(count));

    for record in 0..count {
        let base = (record * layout.stride) as u64;

        cursor
            .seek(SeekFrom::Start(base + layout.position_offset as u64))
            .map_err(|e| DecodeError::MalformedBuffer(e.to_string()))?;
        let position: RawVector3 = cursor
            .read_le()
            .map_err(|e| DecodeError::MalformedBuffer(format!("record {}: {}", record, e)))?;
        positions.push(position.0);

        if let (Some(uv_offset), Some(uvs)) = (layout.uv_offset, uvs.as_mut()) {
            cursor
                .seek(SeekFrom::Start(base + uv_offset as u64))
                .map_err(|e| DecodeError::MalformedBuffer(e.to_string()))?;
            let uv: RawVector2 = cursor
                .read_le()
                .map_err(|e| DecodeError::MalformedBuffer(format!("record {}: {}", record, e)))?;
            uvs.push(uv.to_flipped_uv());
        }
    }

    Ok((positions, uvs))
}

/// Unpack a triangle-list index buffer and check it against the vertex count.
pub fn decode_indices(raw: &[u8], width: IndexWidth, vertex_count: usize) -> Result<Vec<u32>> {
    let size = width.bytes();
    if raw.len() % size != 0 {
        return Err(DecodeError::MalformedIndices(format!(
            "{} bytes is not a whole number of {}-byte indices",
            raw.len(),
            size
        )));
    }

    let indices: Vec<u32> = match width {
        IndexWidth::U16 => raw
            .chunks_exact(2)
            .map(|c| u16::from_le(bytemuck::pod_read_unaligned::<u16>(c)) as u32)
            .collect(),
        IndexWidth::U32 => raw
            .chunks_exact(4)
            .map(|c| u32::from_le(bytemuck::pod_read_unaligned::<u32>(c)))
            .collect(),
    };

    if indices.len() % 3 != 0 {
        return Err(DecodeError::MalformedIndices(format!(
            "{} indices do not form a triangle list",
            indices.len()
        )));
    }
    if let Some((position, index)) = indices
        .iter()
        .enumerate()
        .find(|&(_, &i)| i as usize >= vertex_count)
    {
        return Err(DecodeError::MalformedIndices(format!(
            "index {} at position {} is out of range for {} vertices",
            index, position, vertex_count
        )));
    }

    Ok(indices)
}

/// Decode a full mesh from one draw call's vertex and index bytes.
///
/// The size limits are checked before indices are unpacked, so an
/// oversized mesh is rejected without further work.
pub fn decode_mesh(
    vertex_bytes: &[u8],
    index_bytes: &[u8],
    layout: &VertexLayout,
    index_stride: u32,
    limits: &DecodeLimits,
) -> Result<DecodedMesh> {
    let width = IndexWidth::from_stride(index_stride)?;
    let (positions, uvs) = decode_vertices(vertex_bytes, layout)?;

    let index_count = index_bytes.len() / width.bytes();
    if positions.len() > limits.max_vertices || index_count > limits.max_indices {
        return Err(DecodeError::SizeLimitExceeded {
            vertices: positions.len(),
            indices: index_count,
            max_vertices: limits.max_vertices,
            max_indices: limits.max_indices,
        });
    }

    let indices = decode_indices(index_bytes, width, positions.len())?;
    Ok(DecodedMesh {
        positions,
        uvs,
        indices,
    })
}

/// Encode positions (and optional raw UVs) into interleaved records.
///
/// Inverse of [`decode_vertices`] apart from the V flip; used to build
/// capture snapshots.
pub fn encode_vertices(positions: &[[f32; 3]], uvs: Option<&[[f32; 2]]>, layout: &VertexLayout) -> Vec<u8> {
    let mut out = vec![0u8; positions.len() * layout.stride];
    for (i, p) in positions.iter().enumerate() {
        let base = i * layout.stride + layout.position_offset;
        out[base..base + POSITION_SIZE].copy_from_slice(bytemuck::bytes_of(p));
        if let (Some(uv_offset), Some(uvs)) = (layout.uv_offset, uvs) {
            if let Some(uv) = uvs.get(i) {
                let base = i * layout.stride + uv_offset;
                out[base..base + TEXCOORD_SIZE].copy_from_slice(bytemuck::bytes_of(uv));
            }
        }
    }
    out
}

pub fn encode_indices(indices: &[u32], width: IndexWidth) -> Vec<u8> {
    match width {
        IndexWidth::U16 => indices
            .iter()
            .flat_map(|&i| (i as u16).to_le_bytes())
            .collect(),
        IndexWidth::U32 => indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
    }
}
