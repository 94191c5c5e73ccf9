//! GPU side of the field pipeline
//!
//! Device bring-up, textures, shaders and pipelines, and [`GpuBackend`], the
//! `FieldBackend` that records every stage into one encoder per frame.

pub mod backend;
pub mod context;
pub mod diagnostics;
pub mod mesh;
pub mod pipelines;
pub mod shader_library;
pub mod textures;
pub mod uniforms;

pub use backend::{GpuBackend, GpuFieldSettings};
pub use context::{AcquiredFrame, GpuContext, RenderTarget};
pub use diagnostics::GpuErrorSink;
pub use shader_library::{preprocess_shader, ShaderPreprocessor};
