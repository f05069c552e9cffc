use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use image::ImageFormat;

use super::TEXTURE_DIR;
use crate::scene::{ImageId, Scene};

/// What `relocate_image` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocateOutcome {
    /// The image file already has the requested name.
    Unchanged,
    /// The image already lives in a texture directory.
    AlreadyRelocated,
    /// A file with the new name existed; the image now points at it.
    Reused(PathBuf),
    Converted(PathBuf),
    Copied(PathBuf),
    /// Nothing on disk to move.
    SourceMissing,
}

fn in_texture_dir(path: &Path) -> bool {
    path.parent()
        .and_then(|p| p.file_name())
        .map(|n| n == TEXTURE_DIR)
        .unwrap_or(false)
}

fn target_format(name: &str) -> Option<ImageFormat> {
    let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some(ImageFormat::Png),
        "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
        _ => None,
    }
}

/// Write `source` to `destination`, re-encoding when the destination is a
/// png or jpeg. Returns whether the pixels were converted.
fn write_relocated(source: &Path, destination: &Path, new_name: &str) -> anyhow::Result<bool> {
    match target_format(new_name) {
        Some(ImageFormat::Jpeg) => {
            let img = image::open(source)
                .with_context(|| format!("Failed to decode {}", source.display()))?;
            image::DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(destination, ImageFormat::Jpeg)
                .with_context(|| format!("Failed to write {}", destination.display()))?;
            Ok(true)
        }
        Some(format) => {
            let img = image::open(source)
                .with_context(|| format!("Failed to decode {}", source.display()))?;
            img.save_with_format(destination, format)
                .with_context(|| format!("Failed to write {}", destination.display()))?;
            Ok(true)
        }
        None => {
            fs::copy(source, destination).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    source.display(),
                    destination.display()
                )
            })?;
            Ok(false)
        }
    }
}

/// Move an image's file into a `texture/` directory beside it under
/// `new_name`, then repoint and rename the scene image.
pub fn relocate_image(scene: &mut Scene, image: ImageId, new_name: &str) -> anyhow::Result<RelocateOutcome> {
    let current = scene
        .image(image)
        .with_context(|| format!("Image {} no longer exists", image))?
        .filepath
        .clone();

    if current.file_name().map(|n| n == new_name).unwrap_or(false) {
        return Ok(RelocateOutcome::Unchanged);
    }
    if in_texture_dir(&current) {
        return Ok(RelocateOutcome::AlreadyRelocated);
    }

    let directory = current
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
        .join(TEXTURE_DIR);
    let destination = directory.join(new_name);

    let outcome = if destination.exists() {
        log::info!(
            "{} already exists, pointing {} at it",
            destination.display(),
            new_name
        );
        RelocateOutcome::Reused(destination.clone())
    } else if !current.exists() {
        log::warn!("{} does not exist, nothing to relocate", current.display());
        return Ok(RelocateOutcome::SourceMissing);
    } else {
        fs::create_dir_all(&directory)
            .with_context(|| format!("Failed to create {}", directory.display()))?;
        log::debug!("{} -> {}", current.display(), destination.display());
        if write_relocated(&current, &destination, new_name)? {
            RelocateOutcome::Converted(destination.clone())
        } else {
            RelocateOutcome::Copied(destination.clone())
        }
    };

    if let Some(img) = scene.image_mut(image) {
        img.filepath = destination;
    }
    scene.rename_image(image, new_name);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(0, 0, Rgba([255, 0, 0, 128]));
        img.save_with_format(&path, ImageFormat::Png).unwrap();
        path
    }

    #[test]
    fn converts_to_png_and_renames() {
        let tmp = TempDir::new().unwrap();
        let source = write_png(tmp.path(), "resourceFile_42_txDiffuse.png");
        let mut scene = Scene::new();
        let image = scene.load_image(&source, 4, 4);

        let outcome = relocate_image(&mut scene, image, "body_diffuse.png").unwrap();
        let expected = tmp.path().join("texture").join("body_diffuse.png");
        assert_eq!(outcome, RelocateOutcome::Converted(expected.clone()));
        assert!(expected.exists());
        assert_eq!(image::image_dimensions(&expected).unwrap(), (4, 4));

        let img = scene.image(image).unwrap();
        assert_eq!(img.name, "body_diffuse.png");
        assert_eq!(img.filepath, expected);
        assert_eq!(
            relocate_image(&mut scene, image, "other.png").unwrap(),
            RelocateOutcome::AlreadyRelocated
        );
    }

    #[test]
    fn jpeg_drops_alpha() {
        let tmp = TempDir::new().unwrap();
        let source = write_png(tmp.path(), "in.png");
        let mut scene = Scene::new();
        let image = scene.load_image(&source, 4, 4);

        let outcome = relocate_image(&mut scene, image, "out.jpg").unwrap();
        let expected = tmp.path().join("texture").join("out.jpg");
        assert_eq!(outcome, RelocateOutcome::Converted(expected.clone()));
        let decoded = image::open(&expected).unwrap();
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn unknown_extension_is_copied() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("resourceFile_7_txNormal.dds");
        fs::write(&source, b"DDS raw bytes").unwrap();
        let mut scene = Scene::new();
        let image = scene.load_image(&source, 8, 8);

        let outcome = relocate_image(&mut scene, image, "normal.dds").unwrap();
        let expected = tmp.path().join("texture").join("normal.dds");
        assert_eq!(outcome, RelocateOutcome::Copied(expected.clone()));
        assert_eq!(fs::read(&expected).unwrap(), b"DDS raw bytes");
    }

    #[test]
    fn existing_destination_is_reused() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.dds");
        fs::write(&source, b"new").unwrap();
        fs::create_dir_all(tmp.path().join("texture")).unwrap();
        let existing = tmp.path().join("texture").join("b.dds");
        fs::write(&existing, b"old").unwrap();

        let mut scene = Scene::new();
        let image = scene.load_image(&source, 8, 8);
        let outcome = relocate_image(&mut scene, image, "b.dds").unwrap();
        assert_eq!(outcome, RelocateOutcome::Reused(existing.clone()));
        assert_eq!(fs::read(&existing).unwrap(), b"old");
        assert_eq!(scene.image(image).unwrap().filepath, existing);
    }

    #[test]
    fn same_name_and_missing_source() {
        let tmp = TempDir::new().unwrap();
        let mut scene = Scene::new();
        let same = scene.load_image(&tmp.path().join("keep.dds"), 8, 8);
        assert_eq!(
            relocate_image(&mut scene, same, "keep.dds").unwrap(),
            RelocateOutcome::Unchanged
        );

        let missing = scene.load_image(&tmp.path().join("gone.dds"), 8, 8);
        assert_eq!(
            relocate_image(&mut scene, missing, "new.dds").unwrap(),
            RelocateOutcome::SourceMissing
        );
        assert_eq!(scene.image(missing).unwrap().name, "gone.dds");
    }
}
