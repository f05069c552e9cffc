pub mod buffer;
pub mod capture;
pub mod error;
#[cfg(feature = "cli")]
pub mod logging;
pub mod material_config;
pub mod matcher;
pub mod math;
pub mod mesh_processing;
pub mod reconcile;
pub mod scene;
pub mod settings;
pub mod shader;
pub mod texture_pipeline;
pub mod validation;
