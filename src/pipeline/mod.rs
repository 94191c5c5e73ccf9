//! Per-frame orchestration of the water pipeline
//!
//! `FramePipeline::frame` issues every stage of a displayed frame in a fixed
//! order against a [`FieldBackend`]:
//!
//! mask bake (only when invalidated) -> paint -> paint merge -> N field ticks
//! -> scene capture -> presentation
//!
//! All mutable simulation state lives in [`SimulationContext`], so several
//! independent pipelines can coexist and be driven deterministically in tests.

pub mod backend;
pub mod cpu;

pub use backend::{FieldBackend, PipelineStage};
pub use cpu::CpuBackend;

use crate::camera::SceneView;
use crate::config::SimulationConfig;
use crate::error::WaterResult;
use crate::sim::{
    BarrierController, BarrierSet, BrushStroke, HeightField, ShadingParams, SimulationClock,
};
use std::time::{Duration, Instant};

/// Mutable simulation state shared by every stage
#[derive(Debug, Clone)]
pub struct SimulationContext {
    pub clock: SimulationClock,
    pub field: HeightField,
    pub barriers: BarrierController,
    total_ticks: u64,
    frames: u64,
}

impl SimulationContext {
    pub fn new(clock: SimulationClock) -> Self {
        Self {
            clock,
            field: HeightField::new(),
            barriers: BarrierController::new(),
            total_ticks: 0,
            frames: 0,
        }
    }

    /// Build the clock from the `[simulation]` config section
    pub fn from_config(config: &SimulationConfig) -> Self {
        let clock = SimulationClock::new(config.step_seconds())
            .with_max_ticks(config.max_ticks_per_frame)
            .with_max_frame_delta(config.max_frame_delta);
        Self::new(clock)
    }

    /// Ticks completed since creation
    pub fn total_ticks(&self) -> u64 {
        self.total_ticks
    }

    /// Displayed frames since creation
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn barrier_set(&self) -> &BarrierSet {
        self.barriers.set()
    }
}

/// Decoded inputs for one displayed frame
#[derive(Debug, Clone, Copy)]
pub struct FrameInput {
    /// Wall time since the previous displayed frame, in seconds
    pub delta: f64,
    pub stroke: BrushStroke,
    pub shading: ShadingParams,
    pub view: SceneView,
}

/// What a frame actually did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameReport {
    /// Field ticks run this frame
    pub ticks: u32,
    /// Whether the mask was re-baked this frame
    pub mask_rebaked: bool,
    /// Height buffer holding the latest state after the frame
    pub current_height: usize,
    pub total_ticks: u64,
    /// Host time spent issuing paint, merge and ticks
    pub physics_time: Duration,
}

/// Drives a backend through the stages of each displayed frame
pub struct FramePipeline<B: FieldBackend> {
    context: SimulationContext,
    backend: B,
}

impl<B: FieldBackend> FramePipeline<B> {
    pub fn new(context: SimulationContext, backend: B) -> Self {
        log::info!(
            "[FramePipeline::new] Pipeline ready, step {:.6}s",
            context.clock.step()
        );
        Self { context, backend }
    }

    pub fn context(&self) -> &SimulationContext {
        &self.context
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Step to the next barrier layout; the mask is re-baked next frame
    pub fn advance_barriers(&mut self) {
        self.context.barriers.advance();
    }

    /// Remove all barriers; the mask is re-baked next frame
    pub fn clear_barriers(&mut self) {
        self.context.barriers.clear();
    }

    /// Run one displayed frame
    pub fn frame(&mut self, input: &FrameInput) -> WaterResult<FrameReport> {
        self.backend.begin_frame()?;

        let mask_rebaked = self.context.barriers.mask_dirty();
        if mask_rebaked {
            self.backend.bake_mask(self.context.barriers.set());
            self.drain_report(PipelineStage::MaskBake);
            // The bake is now ordered ahead of every tick below
            self.context.barriers.mark_baked();
        }

        let physics_start = Instant::now();

        self.backend.paint(&input.stroke);
        self.drain_report(PipelineStage::Paint);

        // Paint integrates over the same sanitized, clamped delta the clock accepts
        let ticks = self.context.clock.advance(input.delta);
        let merge_delta = self.context.clock.last_delta() as f32;
        self.backend
            .merge_paint(self.context.field.roles(), merge_delta);
        self.drain_report(PipelineStage::PaintMerge);

        for _ in 0..ticks {
            self.backend.step_field(self.context.field.roles());
            self.context.field.swap();
            self.context.total_ticks += 1;
        }
        if ticks > 0 {
            self.drain_report(PipelineStage::FieldTick);
        }

        let physics_time = physics_start.elapsed();

        self.backend
            .capture_scene(&input.view, self.context.barriers.set());
        self.drain_report(PipelineStage::SceneCapture);

        let current_height = self.context.field.current();
        self.backend
            .present(&input.view, &input.shading, current_height);
        self.drain_report(PipelineStage::Presentation);

        self.backend.end_frame()?;
        self.context.frames += 1;

        log::trace!(
            "[FramePipeline::frame] {} ticks, current buffer {}, rebake {}",
            ticks,
            current_height,
            mask_rebaked
        );

        Ok(FrameReport {
            ticks,
            mask_rebaked,
            current_height,
            total_ticks: self.context.total_ticks,
            physics_time,
        })
    }

    fn drain_report(&mut self, stage: PipelineStage) {
        for message in self.backend.report(stage) {
            log::warn!("[FramePipeline] Error after {} stage: {}", stage, message);
        }
    }

    pub fn into_parts(self) -> (SimulationContext, B) {
        (self.context, self.backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::OrbitCamera;
    use crate::sim::{BrushParams, PointerState};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl FieldBackend for Recorder {
        fn begin_frame(&mut self) -> WaterResult<()> {
            self.calls.push("begin".into());
            Ok(())
        }
        fn bake_mask(&mut self, barriers: &BarrierSet) {
            self.calls.push(format!("mask {}", barriers.configuration()));
        }
        fn paint(&mut self, _stroke: &BrushStroke) {
            self.calls.push("paint".into());
        }
        fn merge_paint(&mut self, roles: crate::sim::HeightRoles, _frame_delta: f32) {
            self.calls.push(format!("merge {}", roles.current));
        }
        fn step_field(&mut self, roles: crate::sim::HeightRoles) {
            self.calls.push(format!("tick {}->{}", roles.current, roles.next));
        }
        fn capture_scene(&mut self, _view: &SceneView, _barriers: &BarrierSet) {
            self.calls.push("capture".into());
        }
        fn present(&mut self, _view: &SceneView, _shading: &ShadingParams, current: usize) {
            self.calls.push(format!("present {}", current));
        }
        fn end_frame(&mut self) -> WaterResult<()> {
            self.calls.push("end".into());
            Ok(())
        }
    }

    fn input(delta: f64) -> FrameInput {
        FrameInput {
            delta,
            stroke: BrushStroke {
                pointer: PointerState::default(),
                brush: BrushParams {
                    size: 0.15,
                    power: 25.0,
                },
            },
            shading: ShadingParams {
                fog_density: 0.75,
                turbulence: 0.0,
                refraction: 0.25,
                reflection: 0.35,
            },
            view: OrbitCamera::new(30.0, 512, 600).scene_view(),
        }
    }

    #[test]
    fn test_first_frame_order() {
        let context = SimulationContext::new(SimulationClock::new(0.25));
        let mut pipeline = FramePipeline::new(context, Recorder::default());
        let report = pipeline.frame(&input(0.5)).unwrap();

        assert_eq!(report.ticks, 2);
        assert!(report.mask_rebaked);
        assert_eq!(
            pipeline.backend().calls,
            vec![
                "begin", "mask 0", "paint", "merge 0", "tick 0->1", "tick 1->0", "capture",
                "present 0", "end"
            ]
        );
    }

    #[test]
    fn test_zero_tick_frame_still_presents() {
        let context = SimulationContext::new(SimulationClock::new(1.0));
        let mut pipeline = FramePipeline::new(context, Recorder::default());
        pipeline.frame(&input(0.1)).unwrap();
        pipeline.backend_mut().calls.clear();

        let report = pipeline.frame(&input(0.1)).unwrap();
        assert_eq!(report.ticks, 0);
        assert!(!report.mask_rebaked);
        assert_eq!(
            pipeline.backend().calls,
            vec!["begin", "paint", "merge 0", "capture", "present 0", "end"]
        );
    }

    #[test]
    fn test_barrier_change_rebakes_once() {
        let context = SimulationContext::new(SimulationClock::new(1.0));
        let mut pipeline = FramePipeline::new(context, Recorder::default());
        pipeline.frame(&input(0.0)).unwrap();

        pipeline.advance_barriers();
        assert!(pipeline.frame(&input(0.0)).unwrap().mask_rebaked);
        assert!(!pipeline.frame(&input(0.0)).unwrap().mask_rebaked);
        assert_eq!(pipeline.context().barrier_set().configuration(), 1);
    }
}
