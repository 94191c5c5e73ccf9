//! End-to-end frame scenarios on the software backend

use water_block::camera::OrbitCamera;
use water_block::pipeline::{CpuBackend, FrameInput, FramePipeline, SimulationContext};
use water_block::sim::{
    brush_falloff, BrushParams, BrushStroke, FieldFootprint, FieldGrid, FieldKernel, HeightCell,
    PointerState, ShadingParams, SimulationClock, SurfaceCell, WaveKernel,
};

const DT: f64 = 1.0 / 750.0;

/// Adds 1.0 to every height so the tick count is readable from the buffers
struct CountingKernel;

impl FieldKernel for CountingKernel {
    fn step(
        &mut self,
        current: &FieldGrid<HeightCell>,
        _mask: &FieldGrid<f32>,
        next: &mut FieldGrid<HeightCell>,
        surface: &mut FieldGrid<SurfaceCell>,
    ) {
        for (out, cell) in next.cells_mut().iter_mut().zip(current.cells()) {
            *out = HeightCell {
                height: cell.height + 1.0,
                velocity: 1.0,
            };
        }
        surface.cells_mut().fill(SurfaceCell::default());
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn input(delta: f64, stroke: BrushStroke) -> FrameInput {
    FrameInput {
        delta,
        stroke,
        shading: ShadingParams {
            fog_density: 0.75,
            turbulence: 0.0,
            refraction: 0.25,
            reflection: 0.35,
        },
        view: OrbitCamera::new(30.0, 512, 600).scene_view(),
    }
}

fn idle_stroke() -> BrushStroke {
    BrushStroke {
        pointer: PointerState::default(),
        brush: BrushParams {
            size: 0.15,
            power: 25.0,
        },
    }
}

fn wave_pipeline(resolution: usize) -> FramePipeline<CpuBackend> {
    let backend = CpuBackend::new(
        resolution,
        FieldFootprint::new(8.0),
        Box::new(WaveKernel::new(0.25, 0.995, 16.0 / resolution as f32)),
    );
    FramePipeline::new(SimulationContext::new(SimulationClock::new(DT)), backend)
}

fn counting_pipeline(step: f64) -> FramePipeline<CpuBackend> {
    let backend = CpuBackend::new(8, FieldFootprint::new(8.0), Box::new(CountingKernel));
    FramePipeline::new(SimulationContext::new(SimulationClock::new(step)), backend)
}

#[test]
fn test_sixty_hz_frames_run_twelve_ticks_each() {
    let mut pipeline = wave_pipeline(32);
    let report = pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    assert_eq!(report.ticks, 12);
    let expected = 1.0 / 60.0 - 12.0 / 750.0;
    assert!((pipeline.context().clock.accumulator() - expected).abs() < 1e-12);

    // The carried half step surfaces as an extra tick every other frame
    for _ in 1..60 {
        let report = pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
        assert!(report.ticks == 12 || report.ticks == 13);
    }
    let total = pipeline.context().total_ticks();
    assert!((749..=751).contains(&total));
    assert_eq!(pipeline.context().frames(), 60);
}

#[test]
fn test_tick_total_independent_of_frame_slicing() {
    let slicings: [&[f64]; 3] = [
        &[1.0],
        &[1.0 / 60.0; 60],
        &[0.3, 0.0, 0.05, 0.15, 0.001, 0.499],
    ];
    for deltas in slicings {
        let mut pipeline = counting_pipeline(DT);
        for &delta in deltas {
            pipeline.frame(&input(delta, idle_stroke())).unwrap();
            let accumulator = pipeline.context().clock.accumulator();
            assert!((0.0..DT).contains(&accumulator));
        }
        let total = pipeline.context().total_ticks();
        assert!((749..=751).contains(&total), "{total} ticks: {deltas:?}");
    }
}

#[test]
fn test_current_buffer_parity_follows_tick_count() {
    let mut pipeline = counting_pipeline(0.25);
    for (delta, ticks) in [(0.75, 3), (0.25, 1), (0.125, 0), (1.25, 5)] {
        let before = pipeline.context().field.current();
        let report = pipeline.frame(&input(delta, idle_stroke())).unwrap();
        assert_eq!(report.ticks, ticks);
        assert_eq!(report.current_height, (before + ticks as usize) % 2);
        let presented = pipeline.backend().last_presented();
        assert_eq!(presented, Some(report.current_height));
    }

    // Every tick read the buffer the previous tick wrote
    let total = pipeline.context().total_ticks();
    let current = pipeline.context().field.current();
    for cell in pipeline.backend().height(current).cells() {
        assert_eq!(cell.height, total as f32);
    }
}

#[test]
fn test_mask_rebakes_once_per_configuration_change() {
    let mut pipeline = counting_pipeline(DT);
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    assert_eq!(pipeline.backend().counts().mask_bakes, 1);

    pipeline.advance_barriers();
    for _ in 0..3 {
        pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    }
    assert_eq!(pipeline.backend().counts().mask_bakes, 2);

    // Two changes before the next frame still cost a single bake
    pipeline.advance_barriers();
    pipeline.clear_barriers();
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    assert_eq!(pipeline.backend().counts().mask_bakes, 3);
    assert_eq!(pipeline.backend().counts().presents, 7);
}

#[test]
fn test_barrier_cycle_ends_with_clear_mask() {
    let mut pipeline = wave_pipeline(64);
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    assert_eq!(pipeline.backend().mask().count_nonzero(), 0);

    let mut configurations = Vec::new();
    for _ in 0..4 {
        pipeline.advance_barriers();
        assert!(pipeline.context().barriers.mask_dirty());
        let report = pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
        assert!(report.mask_rebaked);
        assert!(!pipeline.context().barriers.mask_dirty());

        let configuration = pipeline.context().barrier_set().configuration();
        let occupied = pipeline.backend().mask().count_nonzero();
        if configuration == 0 {
            assert_eq!(occupied, 0);
        } else {
            assert!(occupied > 0, "configuration {} baked empty", configuration);
        }
        configurations.push(configuration);
    }
    assert_eq!(configurations, vec![1, 2, 3, 0]);
}

#[test]
fn test_brush_at_centre_paints_full_power() {
    // Odd resolution puts a cell centre exactly on the field centre
    let resolution = 129;
    let mut pipeline = wave_pipeline(resolution);
    let stroke = BrushStroke {
        pointer: PointerState {
            position: [0.5, 0.5],
            active: true,
        },
        brush: BrushParams {
            size: 0.15,
            power: 25.0,
        },
    };
    pipeline.frame(&input(1.0 / 60.0, stroke)).unwrap();

    let paint = pipeline.backend().paint_delta();
    let centre = resolution / 2;
    assert_eq!(paint.get(centre, centre), brush_falloff(0.0, 0.15) * 25.0);
    assert_eq!(paint.max_value(), 25.0);

    for y in 0..resolution {
        for x in 0..resolution {
            let [u, v] = paint.cell_center(x, y);
            let distance = ((u - 0.5).powi(2) + (v - 0.5).powi(2)).sqrt();
            if distance > 0.15 + 1e-4 {
                assert_eq!(paint.get(x, y), 0.0, "cell ({}, {})", x, y);
            }
        }
    }
}

#[test]
fn test_inactive_pointer_paints_nothing() {
    let mut pipeline = wave_pipeline(32);
    pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    assert_eq!(pipeline.backend().paint_delta().count_nonzero(), 0);

    let current = pipeline.context().field.current();
    assert!(pipeline
        .backend()
        .height(current)
        .cells()
        .iter()
        .all(|c| c.height == 0.0));
}

#[test]
fn test_paint_is_masked_by_barriers() {
    let mut pipeline = wave_pipeline(64);
    // Configuration 1 walls off the middle column
    pipeline.advance_barriers();
    let stroke = BrushStroke {
        pointer: PointerState {
            position: [0.5, 0.5],
            active: true,
        },
        brush: BrushParams {
            size: 0.3,
            power: 25.0,
        },
    };
    pipeline.frame(&input(1.0 / 60.0, stroke)).unwrap();

    let backend = pipeline.backend();
    let mask = backend.mask();
    let paint = backend.paint_delta();
    assert!(paint.count_nonzero() > 0);
    for (occupied, value) in mask.cells().iter().zip(paint.cells()) {
        if *occupied > 0.5 {
            assert_eq!(*value, 0.0);
        }
    }
}

#[test]
fn test_painted_wave_spreads_and_stays_finite() {
    let mut pipeline = wave_pipeline(32);
    let stroke = BrushStroke {
        pointer: PointerState {
            position: [0.5, 0.5],
            active: true,
        },
        brush: BrushParams {
            size: 0.1,
            power: 25.0,
        },
    };
    pipeline.frame(&input(1.0 / 60.0, stroke)).unwrap();
    for _ in 0..30 {
        pipeline.frame(&input(1.0 / 60.0, idle_stroke())).unwrap();
    }

    let current = pipeline.context().field.current();
    let heights = pipeline.backend().height(current);
    assert!(heights.cells().iter().all(|c| c.height.is_finite()));
    // The corner was never painted directly
    assert!(heights.get(1, 1).height != 0.0);
}

fn centre_stroke(size: f32, power: f32) -> BrushStroke {
    BrushStroke {
        pointer: PointerState {
            position: [0.5, 0.5],
            active: true,
        },
        brush: BrushParams { size, power },
    }
}

#[test]
fn test_paint_merge_uses_clamped_frame_delta() {
    let resolution = 129;
    let clock = SimulationClock::new(1.0).with_max_frame_delta(Some(0.1));
    let backend = CpuBackend::new(
        resolution,
        FieldFootprint::new(8.0),
        Box::new(CountingKernel),
    );
    let mut pipeline = FramePipeline::new(SimulationContext::new(clock), backend);

    // A five second stall is clamped to 0.1 s for the merge as well as the clock
    let stroke = centre_stroke(0.15, 25.0);
    let report = pipeline.frame(&input(5.0, stroke)).unwrap();
    assert_eq!(report.ticks, 0);

    let centre = resolution / 2;
    let current = pipeline.context().field.current();
    let height = pipeline.backend().height(current).get(centre, centre).height;
    assert!((height - 25.0 * 0.1).abs() < 1e-5, "centre height {height}");
}

#[test]
fn test_invalid_frame_delta_merges_nothing() {
    for delta in [f64::NAN, f64::INFINITY, -1.0] {
        let mut pipeline = wave_pipeline(32);
        let stroke = centre_stroke(0.2, 25.0);
        let report = pipeline.frame(&input(delta, stroke)).unwrap();
        assert_eq!(report.ticks, 0);
        assert!(pipeline.backend().paint_delta().count_nonzero() > 0);

        let current = pipeline.context().field.current();
        let heights = pipeline.backend().height(current);
        let untouched = heights.cells().iter().all(|c| c.height == 0.0);
        assert!(untouched, "delta {delta}");
    }
}
