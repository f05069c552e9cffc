/// Default limits and thresholds for capture import and reconciliation.

/// Maximum number of vertices decoded for a single draw call.
pub const MAX_VERTICES: usize = 150_000;

/// Maximum number of indices decoded for a single draw call.
pub const MAX_INDICES: usize = 450_000;

/// Default centroid distance under which two meshes are considered the same.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.5;

/// Smallest threshold the operator surface accepts.
pub const MIN_MATCH_THRESHOLD: f32 = 0.00001;

/// Textures smaller than this in either dimension are treated as
/// encrypted placeholders.
pub const PLACEHOLDER_MIN_DIMENSION: u32 = 2;

/// Auto-smooth angle applied to imported capture meshes, in radians (40 degrees).
pub const AUTO_SMOOTH_ANGLE: f32 = 0.698132;

/// Number of image texture nodes in the standard shader graph.
pub const IMAGE_TEXTURE_SLOTS: u8 = 8;
