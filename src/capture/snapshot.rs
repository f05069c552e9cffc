//! JSON capture snapshots: the per-draw state of a capture recorded once
//! so it can be replayed without the capture runtime.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::{
    Action, BoundTexture, CaptureSource, PipelineState, ReplayController, ResourceId, ShaderStage,
    TextureDesc,
};
use crate::error::{ImportError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedAction {
    #[serde(flatten)]
    pub action: Action,
    #[serde(default)]
    pub pipeline: PipelineState,
    #[serde(default)]
    pub fragment_resources: Vec<BoundTexture>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedBuffer {
    pub resource: ResourceId,
    /// Base64 of the buffer contents.
    pub data: String,
}

impl RecordedBuffer {
    pub fn new(resource: ResourceId, bytes: &[u8]) -> Self {
        Self {
            resource,
            data: BASE64_STANDARD.encode(bytes),
        }
    }

    pub fn bytes(&self) -> anyhow::Result<Vec<u8>> {
        BASE64_STANDARD
            .decode(&self.data)
            .with_context(|| format!("Buffer {} is not valid base64", self.resource))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedTexture {
    #[serde(flatten)]
    pub desc: TextureDesc,
    /// Base64 of the exported DDS file, when it was recorded.
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureSnapshot {
    pub actions: Vec<RecordedAction>,
    #[serde(default)]
    pub buffers: Vec<RecordedBuffer>,
    #[serde(default)]
    pub textures: Vec<RecordedTexture>,
}

impl CaptureSnapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Replays a [`CaptureSnapshot`].
#[derive(Debug, Clone)]
pub struct SnapshotReplay {
    snapshot: CaptureSnapshot,
    current: Option<usize>,
    buffers: HashMap<ResourceId, usize>,
}

impl SnapshotReplay {
    pub fn new(snapshot: CaptureSnapshot) -> Self {
        let buffers = snapshot
            .buffers
            .iter()
            .enumerate()
            .map(|(i, b)| (b.resource, i))
            .collect();
        Self {
            snapshot,
            current: None,
            buffers,
        }
    }

    fn current_action(&self) -> Option<&RecordedAction> {
        self.current.and_then(|i| self.snapshot.actions.get(i))
    }

    fn texture(&self, resource: ResourceId) -> Option<&RecordedTexture> {
        self.snapshot
            .textures
            .iter()
            .find(|t| t.desc.resource == resource)
    }
}

impl ReplayController for SnapshotReplay {
    fn root_actions(&self) -> Vec<Action> {
        self.snapshot
            .actions
            .iter()
            .map(|a| a.action.clone())
            .collect()
    }

    fn set_frame_event(&mut self, event_id: u32) {
        self.current = self
            .snapshot
            .actions
            .iter()
            .position(|a| a.action.event_id == event_id);
        if self.current.is_none() {
            log::warn!("Event {} is not in the capture", event_id);
        }
    }

    fn pipeline_state(&self) -> PipelineState {
        self.current_action()
            .map(|a| a.pipeline.clone())
            .unwrap_or_default()
    }

    fn buffer_data(&self, resource: ResourceId, offset: u64, length: u64) -> anyhow::Result<Vec<u8>> {
        let index = self
            .buffers
            .get(&resource)
            .with_context(|| format!("Buffer {} not found", resource))?;
        let bytes = self.snapshot.buffers[*index].bytes()?;
        let start = usize::try_from(offset)?.min(bytes.len());
        let end = start
            .saturating_add(usize::try_from(length)?)
            .min(bytes.len());
        Ok(bytes[start..end].to_vec())
    }

    fn read_only_resources(&self, stage: ShaderStage) -> Vec<BoundTexture> {
        match stage {
            ShaderStage::Fragment => self
                .current_action()
                .map(|a| a.fragment_resources.clone())
                .unwrap_or_default(),
            ShaderStage::Vertex => vec![],
        }
    }

    fn texture_desc(&self, resource: ResourceId) -> Option<TextureDesc> {
        self.texture(resource).map(|t| t.desc)
    }

    fn save_texture(&mut self, resource: ResourceId, path: &Path) -> anyhow::Result<()> {
        let data = self
            .texture(resource)
            .and_then(|t| t.data.as_ref())
            .with_context(|| format!("No image data recorded for {}", resource))?;
        let bytes = BASE64_STANDARD
            .decode(data)
            .with_context(|| format!("Texture {} is not valid base64", resource))?;
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Opens `.json` capture snapshots from disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotSource;

impl CaptureSource for SnapshotSource {
    fn open(&self, path: &Path) -> Result<Box<dyn ReplayController>> {
        let snapshot = CaptureSnapshot::load(path).map_err(|e| {
            ImportError::ReplayFailure(format!("Failed to open capture {}: {}", path.display(), e))
        })?;
        log::info!(
            "Opened {} with {} actions",
            path.display(),
            snapshot.actions.len()
        );
        Ok(Box::new(SnapshotReplay::new(snapshot)))
    }
}
