use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::buffer::DecodeLimits;
use crate::error::{ImportError, Result};
use crate::validation::limits::{DEFAULT_MATCH_THRESHOLD, PLACEHOLDER_MIN_DIMENSION};

/// Names of the scene collections the pipeline reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    /// Collection receiving meshes reconstructed from the capture.
    pub capture: String,
    /// Collection holding the converted reference model.
    pub reference: String,
    /// Holding collection for parents stripped by `rename_and_reparent_meshes`.
    pub unused_parents: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            capture: "RDC".to_string(),
            reference: "kn5".to_string(),
            unused_parents: "Unused_Parents".to_string(),
        }
    }
}

/// Run-wide settings. Loaded from JSON, every field optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum centroid distance for an automatic match.
    pub matching_threshold: f32,
    /// Hide superseded objects instead of deleting them.
    pub preserve_originals: bool,
    pub limits: DecodeLimits,
    /// Textures smaller than this in either dimension are reported as encrypted.
    pub placeholder_min_dimension: u32,
    pub collections: CollectionNames,
    /// Suffix marking a reference material that has been superseded.
    pub old_material_suffix: String,
    /// Only texture slots whose name starts with this prefix are exported.
    pub texture_slot_prefix: String,
    /// Texture slots containing this marker are cubemaps and are skipped.
    pub cubemap_slot_marker: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            matching_threshold: DEFAULT_MATCH_THRESHOLD,
            preserve_originals: false,
            limits: DecodeLimits::default(),
            placeholder_min_dimension: PLACEHOLDER_MIN_DIMENSION,
            collections: CollectionNames::default(),
            old_material_suffix: "_old".to_string(),
            texture_slot_prefix: "tx".to_string(),
            cubemap_slot_marker: "txCube".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a JSON file and validate them.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.matching_threshold.is_finite() || self.matching_threshold < 0.0 {
            return Err(ImportError::Config(format!(
                "matching_threshold must be a finite value >= 0, got {}",
                self.matching_threshold
            )));
        }
        if self.old_material_suffix.is_empty() {
            return Err(ImportError::Config(
                "old_material_suffix must not be empty".to_string(),
            ));
        }
        if self.limits.max_vertices == 0 || self.limits.max_indices == 0 {
            return Err(ImportError::Config(
                "decode limits must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
