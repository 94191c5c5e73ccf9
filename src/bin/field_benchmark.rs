//! Headless field benchmark
//!
//! Drives the software backend through simulated 60 Hz frames with a moving
//! brush and barrier changes, then prints tick throughput.
//!
//! Usage: `field_benchmark [frames] [config.toml]`

use std::path::PathBuf;
use std::time::{Duration, Instant};
use water_block::camera::OrbitCamera;
use water_block::pipeline::{CpuBackend, FrameInput, FramePipeline, SimulationContext};
use water_block::sim::{BrushStroke, FieldFootprint, PointerState, Tunables, WaveKernel};
use water_block::WaterConfig;

const FRAME_DELTA: f64 = 1.0 / 60.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut args = std::env::args().skip(1);
    let frames: u64 = match args.next() {
        Some(text) => text.parse()?,
        None => 600,
    };
    let config = WaterConfig::resolve(args.next().map(PathBuf::from))?;

    println!("Water Block Field Benchmark");
    println!("===========================\n");

    let resolution = config.simulation.resolution;
    let footprint = FieldFootprint::new(config.field.half_extent);
    let kernel = WaveKernel::new(
        config.simulation.wave_speed,
        config.simulation.damping,
        2.0 * config.field.half_extent / resolution as f32,
    );
    let backend = CpuBackend::new(resolution as usize, footprint, Box::new(kernel));
    let context = SimulationContext::from_config(&config.simulation);
    let mut pipeline = FramePipeline::new(context, backend);

    let tunables = Tunables::new(config.controls.initial, config.controls.steps);
    let view = OrbitCamera::new(30.0, config.window.width / 2, config.window.height).scene_view();

    println!("Field: {}x{}", resolution, resolution);
    println!("Step: {:.6}s", config.simulation.step_seconds());
    println!("Frames: {} at {:.1} Hz\n", frames, 1.0 / FRAME_DELTA);

    let mut physics_time = Duration::ZERO;
    let start = Instant::now();
    for frame in 0..frames {
        // Change the barrier layout every two seconds
        if frame > 0 && frame % 120 == 0 {
            pipeline.advance_barriers();
        }

        let angle = frame as f32 * 0.05;
        let input = FrameInput {
            delta: FRAME_DELTA,
            stroke: BrushStroke {
                pointer: PointerState {
                    position: [0.5 + 0.3 * angle.cos(), 0.5 + 0.3 * angle.sin()],
                    active: frame % 30 < 10,
                },
                brush: tunables.brush(),
            },
            shading: tunables.shading(),
            view,
        };
        let report = pipeline.frame(&input)?;
        physics_time += report.physics_time;
    }
    let elapsed = start.elapsed();

    let displayed = pipeline.context().frames();
    let total_ticks = pipeline.context().total_ticks();
    let counts = pipeline.backend().counts();
    println!("Results");
    println!("-------");
    println!("Wall time: {:.2?}", elapsed);
    println!("Frames presented: {}", displayed);
    println!("Ticks: {} ({} mask bakes)", total_ticks, counts.mask_bakes);
    println!(
        "Physics: {:.2?} total, {:.3} us/tick",
        physics_time,
        physics_time.as_secs_f64() * 1e6 / total_ticks.max(1) as f64
    );
    println!(
        "Throughput: {:.0} ticks/s ({:.2}x real time)",
        total_ticks as f64 / elapsed.as_secs_f64(),
        (displayed as f64 * FRAME_DELTA) / elapsed.as_secs_f64()
    );
    Ok(())
}
