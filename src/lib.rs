//! Interactive height-field water in a walled pool
//!
//! A damped wave field is stepped on the GPU at a fixed rate, painted with the
//! mouse, blocked by switchable barrier boxes and shaded with refraction, fog
//! and sky reflection next to a top-down preview of the raw heights.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod gpu;
pub mod input;
pub mod layout;
pub mod pipeline;
pub mod sim;
pub mod telemetry;

pub use app::{run, run_app};
pub use camera::{OrbitCamera, SceneView};
pub use config::WaterConfig;
pub use error::{WaterError, WaterResult};
pub use pipeline::{
    CpuBackend, FieldBackend, FrameInput, FramePipeline, FrameReport, PipelineStage,
    SimulationContext,
};
