use binrw::binrw;
use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3, Zero};

/// Three little-endian floats, as stored in a vertex position attribute.
#[binrw]
#[derive(Debug, Clone, Copy)]
#[br(little)]
pub struct RawVector3(
    #[br(map = |raw: [f32; 3]| Vector3::new(raw[0], raw[1], raw[2]))]
    #[bw(map = |v: &Vector3<f32>| [v.x, v.y, v.z])]
    pub Vector3<f32>,
);

/// Two little-endian floats, as stored in a texcoord attribute.
#[binrw]
#[derive(Debug, Clone, Copy)]
#[br(little)]
pub struct RawVector2(
    #[br(map = |raw: [f32; 2]| Vector2::new(raw[0], raw[1]))]
    #[bw(map = |v: &Vector2<f32>| [v.x, v.y])]
    pub Vector2<f32>,
);

impl Default for RawVector2 {
    fn default() -> Self {
        Self(Vector2::new(0.0, 0.0))
    }
}

impl RawVector2 {
    /// UV with the V axis flipped into the editor's bottom-left convention.
    pub fn to_flipped_uv(&self) -> [f32; 2] {
        flip_v([self.0.x, self.0.y])
    }
}

pub fn flip_v(uv: [f32; 2]) -> [f32; 2] {
    [uv[0], 1.0 - uv[1]]
}

/// Arithmetic mean of a set of positions. An empty set has its centroid at the origin.
pub fn centroid(positions: &[Vector3<f32>]) -> Vector3<f32> {
    if positions.is_empty() {
        return Vector3::zero();
    }
    let sum = positions
        .iter()
        .fold(Vector3::zero(), |acc: Vector3<f32>, p| acc + *p);
    sum / positions.len() as f32
}

pub fn distance(a: Vector3<f32>, b: Vector3<f32>) -> f32 {
    (a - b).magnitude()
}

/// Inverse of `m`, or `None` when it is singular.
pub fn try_invert(m: &Matrix4<f32>) -> Option<Matrix4<f32>> {
    m.invert()
}

pub fn translation(m: &Matrix4<f32>) -> Vector3<f32> {
    m.w.truncate()
}

/// Element-wise comparison of two matrices.
pub fn matrices_approx_eq(a: &Matrix4<f32>, b: &Matrix4<f32>, epsilon: f32) -> bool {
    let a: &[[f32; 4]; 4] = a.as_ref();
    let b: &[[f32; 4]; 4] = b.as_ref();
    a.iter()
        .zip(b.iter())
        .all(|(ca, cb)| ca.iter().zip(cb.iter()).all(|(x, y)| (x - y).abs() <= epsilon))
}
