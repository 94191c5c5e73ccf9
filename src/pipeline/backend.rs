//! Boundary between the frame orchestration and whoever owns the buffers
//!
//! A backend holds the two height buffers, the derived-surface buffer, the
//! mask, the paint delta and the scene capture. The pipeline tells it which
//! stage to run and which height buffer plays which role; the backend never
//! decides ordering on its own.

use crate::camera::SceneView;
use crate::error::WaterResult;
use crate::sim::{BarrierSet, BrushStroke, HeightRoles, ShadingParams};
use std::fmt;

/// Stages of a displayed frame, in issue order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    MaskBake,
    Paint,
    PaintMerge,
    FieldTick,
    SceneCapture,
    Presentation,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::MaskBake => "mask bake",
            PipelineStage::Paint => "paint",
            PipelineStage::PaintMerge => "paint merge",
            PipelineStage::FieldTick => "field tick",
            PipelineStage::SceneCapture => "scene capture",
            PipelineStage::Presentation => "presentation",
        };
        f.write_str(name)
    }
}

/// Executes pipeline stages against concrete buffers
pub trait FieldBackend {
    /// Prepare for a new displayed frame
    fn begin_frame(&mut self) -> WaterResult<()>;

    /// Rasterize `barriers` top-down into the mask buffer, replacing it
    fn bake_mask(&mut self, barriers: &BarrierSet);

    /// Clear the paint-delta buffer and write this frame's stroke into it
    fn paint(&mut self, stroke: &BrushStroke);

    /// Add `paint * frame_delta` into `roles.current`; `roles.next` may be
    /// used as scratch
    fn merge_paint(&mut self, roles: HeightRoles, frame_delta: f32);

    /// Run the update kernel once: read `roles.current` and the mask, write
    /// `roles.next` and the derived-surface buffer
    fn step_field(&mut self, roles: HeightRoles);

    /// Render opaque scene geometry into the scene color and depth buffers
    fn capture_scene(&mut self, view: &SceneView, barriers: &BarrierSet);

    /// Shade the field from `current_height` and compose the displayed frame
    fn present(&mut self, view: &SceneView, shading: &ShadingParams, current_height: usize);

    /// Submit the frame's work and display it
    fn end_frame(&mut self) -> WaterResult<()>;

    /// Drain diagnostics raised since the last call. Never fatal.
    fn report(&mut self, stage: PipelineStage) -> Vec<String> {
        let _ = stage;
        Vec::new()
    }
}
