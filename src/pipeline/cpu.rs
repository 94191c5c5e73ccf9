//! Software backend
//!
//! Runs every field stage on CPU grids so the pipeline can be driven without a
//! GPU. Scene capture and presentation only count invocations; there is
//! nothing to draw into.

use super::backend::{FieldBackend, PipelineStage};
use crate::camera::SceneView;
use crate::error::WaterResult;
use crate::sim::{
    paint_delta, rasterize_mask, BarrierSet, BrushStroke, FieldFootprint, FieldGrid, FieldKernel,
    HeightCell, HeightRoles, ShadingParams, SurfaceCell,
};

/// Stage counters for the software backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuStageCounts {
    pub mask_bakes: u64,
    pub paints: u64,
    pub merges: u64,
    pub ticks: u64,
    pub captures: u64,
    pub presents: u64,
}

pub struct CpuBackend {
    heights: [FieldGrid<HeightCell>; 2],
    surface: FieldGrid<SurfaceCell>,
    mask: FieldGrid<f32>,
    paint: FieldGrid<f32>,
    footprint: FieldFootprint,
    kernel: Box<dyn FieldKernel>,
    counts: CpuStageCounts,
    last_presented: Option<usize>,
}

impl CpuBackend {
    /// Create a backend with square `resolution` grids over `footprint`
    pub fn new(resolution: usize, footprint: FieldFootprint, kernel: Box<dyn FieldKernel>) -> Self {
        log::info!(
            "[CpuBackend::new] {}x{} field, kernel '{}'",
            resolution,
            resolution,
            kernel.name()
        );
        Self {
            heights: [
                FieldGrid::new(resolution, resolution),
                FieldGrid::new(resolution, resolution),
            ],
            surface: FieldGrid::new(resolution, resolution),
            mask: FieldGrid::new(resolution, resolution),
            paint: FieldGrid::new(resolution, resolution),
            footprint,
            kernel,
            counts: CpuStageCounts::default(),
            last_presented: None,
        }
    }

    pub fn height(&self, index: usize) -> &FieldGrid<HeightCell> {
        &self.heights[index]
    }

    /// Mutable access for seeding initial conditions
    pub fn height_mut(&mut self, index: usize) -> &mut FieldGrid<HeightCell> {
        &mut self.heights[index]
    }

    pub fn surface(&self) -> &FieldGrid<SurfaceCell> {
        &self.surface
    }

    pub fn mask(&self) -> &FieldGrid<f32> {
        &self.mask
    }

    pub fn paint_delta(&self) -> &FieldGrid<f32> {
        &self.paint
    }

    pub fn counts(&self) -> CpuStageCounts {
        self.counts
    }

    /// Height buffer index handed to the most recent presentation
    pub fn last_presented(&self) -> Option<usize> {
        self.last_presented
    }
}

impl FieldBackend for CpuBackend {
    fn begin_frame(&mut self) -> WaterResult<()> {
        Ok(())
    }

    fn bake_mask(&mut self, barriers: &BarrierSet) {
        rasterize_mask(barriers, &self.footprint, &mut self.mask);
        self.counts.mask_bakes += 1;
        log::debug!(
            "[CpuBackend::bake_mask] Configuration {}, {} occupied cells",
            barriers.configuration(),
            self.mask.count_nonzero()
        );
    }

    fn paint(&mut self, stroke: &BrushStroke) {
        paint_delta(stroke, &self.mask, &mut self.paint);
        self.counts.paints += 1;
    }

    fn merge_paint(&mut self, roles: HeightRoles, frame_delta: f32) {
        let [a, b] = &mut self.heights;
        let (current, next) = if roles.current == 0 { (a, b) } else { (b, a) };

        // Sum into the scratch buffer, then publish back into current
        for ((out, cell), paint) in next
            .cells_mut()
            .iter_mut()
            .zip(current.cells())
            .zip(self.paint.cells())
        {
            *out = HeightCell {
                height: cell.height + paint * frame_delta,
                velocity: cell.velocity,
            };
        }
        current.cells_mut().copy_from_slice(next.cells());
        self.counts.merges += 1;
    }

    fn step_field(&mut self, roles: HeightRoles) {
        let [a, b] = &mut self.heights;
        let (current, next) = if roles.current == 0 {
            (&*a, b)
        } else {
            (&*b, a)
        };
        self.kernel.step(current, &self.mask, next, &mut self.surface);
        self.counts.ticks += 1;
    }

    fn capture_scene(&mut self, _view: &SceneView, _barriers: &BarrierSet) {
        self.counts.captures += 1;
    }

    fn present(&mut self, _view: &SceneView, _shading: &ShadingParams, current_height: usize) {
        self.last_presented = Some(current_height);
        self.counts.presents += 1;
    }

    fn end_frame(&mut self) -> WaterResult<()> {
        Ok(())
    }

    fn report(&mut self, stage: PipelineStage) -> Vec<String> {
        if stage == PipelineStage::FieldTick {
            let diverged = self
                .heights
                .iter()
                .any(|grid| grid.cells().iter().any(|c| !c.height.is_finite()));
            if diverged {
                return vec!["field height is no longer finite".to_string()];
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{BrushParams, PointerState, WaveKernel};

    fn backend() -> CpuBackend {
        CpuBackend::new(
            16,
            FieldFootprint::new(8.0),
            Box::new(WaveKernel::new(0.25, 0.995, 1.0)),
        )
    }

    #[test]
    fn test_merge_publishes_into_current() {
        let mut backend = backend();
        backend.paint(&BrushStroke {
            pointer: PointerState {
                position: [0.5, 0.5],
                active: true,
            },
            brush: BrushParams {
                size: 0.2,
                power: 10.0,
            },
        });
        let roles = HeightRoles {
            current: 1,
            next: 0,
        };
        backend.merge_paint(roles, 0.5);

        let peak = backend.paint_delta().max_value() * 0.5;
        let merged = backend
            .height(1)
            .cells()
            .iter()
            .map(|c| c.height)
            .fold(f32::NEG_INFINITY, f32::max);
        assert!((merged - peak).abs() < 1e-6);
        assert_eq!(backend.counts().merges, 1);
    }

    #[test]
    fn test_step_writes_next_only() {
        let mut backend = backend();
        let bump = HeightCell {
            height: 1.0,
            velocity: 0.0,
        };
        backend.height_mut(0).set(8, 8, bump);
        backend.step_field(HeightRoles {
            current: 0,
            next: 1,
        });

        assert_eq!(backend.height(0).get(8, 8).height, 1.0);
        assert!(backend.height(1).get(7, 8).height > 0.0);
    }
}
