pub mod converter;

/// Name of the directory relocated textures are written to, next to the
/// original file.
pub const TEXTURE_DIR: &str = "texture";

/// Encrypted textures ship as tiny stand-ins; anything narrower or shorter
/// than `min_dimension` texels is treated as one.
pub fn is_placeholder(width: u32, height: u32, min_dimension: u32) -> bool {
    width < min_dimension || height < min_dimension
}
