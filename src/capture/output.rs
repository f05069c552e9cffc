use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::ResourceId;
use crate::error::{ImportError, Result};

pub const LOG_FILE_NAME: &str = "mesh_import_log.txt";

/// Per-capture output directory: `<capture dir>/<capture stem>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureOutput {
    dir: PathBuf,
}

impl CaptureOutput {
    pub fn new(capture: &Path) -> Result<Self> {
        let stem = capture.file_stem().ok_or_else(|| {
            ImportError::Config(format!("'{}' is not a capture file path", capture.display()))
        })?;
        let parent = capture.parent().unwrap_or_else(|| Path::new(""));
        Ok(Self {
            dir: parent.join(stem),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `resourceFile_<id>_<slot>.dds`
    pub fn texture_path(&self, resource: ResourceId, slot_name: &str) -> PathBuf {
        self.dir
            .join(format!("resourceFile_{}_{}.dds", resource.0, slot_name))
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    pub fn ensure_dir(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_follows_capture_name() {
        let output = CaptureOutput::new(Path::new("/captures/car_01.rdc")).unwrap();
        assert_eq!(output.dir(), Path::new("/captures/car_01"));
        assert_eq!(
            output.texture_path(ResourceId(1234), "txDiffuse"),
            Path::new("/captures/car_01/resourceFile_1234_txDiffuse.dds")
        );
        assert_eq!(
            output.log_path(),
            Path::new("/captures/car_01/mesh_import_log.txt")
        );
    }

    #[test]
    fn rejects_paths_without_a_file_name() {
        assert!(CaptureOutput::new(Path::new("/")).is_err());
    }
}
