use thiserror::Error;

use crate::buffer::DecodeError;

/// Error taxonomy shared by the import, matching and reconciliation steps.
///
/// Only `ReplayFailure` and `Config` abort a whole run; the rest are caught
/// per mesh, material or pair and turned into report items.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("missing reference: {0}")]
    MissingReference(String),

    #[error("failed to open capture: {0}")]
    ReplayFailure(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ImportError>;
