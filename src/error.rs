//! Error handling for the water simulation
//!
//! One error type covers GPU bring-up, resource provisioning and configuration.
//! Frame-time diagnostics never surface here; they go through the backend's
//! report channel instead.

use std::path::PathBuf;

/// Errors raised while constructing or driving the simulation
#[derive(Debug, thiserror::Error)]
pub enum WaterError {
    #[error("No suitable GPU adapter found")]
    AdapterUnavailable,

    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    #[error("GPU device request failed: {0}")]
    DeviceRequest(String),

    #[error("Failed to allocate {resource}: {reason}")]
    ResourceAllocation { resource: String, reason: String },

    #[error("Failed to create pipeline '{pipeline}': {reason}")]
    PipelineCreation { pipeline: String, reason: String },

    #[error("Unknown shader include: {name}")]
    ShaderInclude { name: String },

    #[error("Surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),

    #[error("Failed to load config {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("Event loop error: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
}

/// Result alias used throughout the crate
pub type WaterResult<T> = Result<T, WaterError>;

/// Helper trait for attaching context to foreign errors
pub trait WaterErrorContext<T> {
    fn gpu_context(self, resource: &str) -> WaterResult<T>;
    fn config_context(self, path: &std::path::Path) -> WaterResult<T>;
}

impl<T, E> WaterErrorContext<T> for Result<T, E>
where
    E: std::fmt::Display,
{
    fn gpu_context(self, resource: &str) -> WaterResult<T> {
        self.map_err(|e| resource_error(resource, e))
    }

    fn config_context(self, path: &std::path::Path) -> WaterResult<T> {
        self.map_err(|e| WaterError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Create a resource allocation error
pub fn resource_error(resource: &str, reason: impl std::fmt::Display) -> WaterError {
    WaterError::ResourceAllocation {
        resource: resource.to_string(),
        reason: reason.to_string(),
    }
}

/// Create a pipeline creation error
pub fn pipeline_error(pipeline: &str, reason: impl std::fmt::Display) -> WaterError {
    WaterError::PipelineCreation {
        pipeline: pipeline.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gpu_context_wraps_message() {
        let result: Result<(), String> = Err("out of slots".to_string());
        let err = result.gpu_context("height texture").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Failed to allocate height texture: out of slots"
        );
    }

    #[test]
    fn test_config_context_keeps_path() {
        let result: Result<(), &str> = Err("bad toml");
        let err = result
            .config_context(std::path::Path::new("water_block.toml"))
            .unwrap_err();
        match err {
            WaterError::Config { path, reason } => {
                assert_eq!(path, PathBuf::from("water_block.toml"));
                assert_eq!(reason, "bad toml");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_pipeline_error_names_the_pipeline() {
        let err = pipeline_error("Paint Pipeline", "reserved keyword");
        assert!(err.to_string().contains("reserved keyword"));
        match err {
            WaterError::PipelineCreation { pipeline, .. } => {
                assert_eq!(pipeline, "Paint Pipeline");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
