//! Windowed application: event loop, controls and the per-frame driver

use crate::camera::OrbitCamera;
use crate::config::WaterConfig;
use crate::error::WaterError;
use crate::gpu::{GpuBackend, GpuContext, GpuFieldSettings};
use crate::input::{ControlAction, InputState};
use crate::pipeline::{FrameInput, FramePipeline, SimulationContext};
use crate::sim::{BrushStroke, Tunable, Tunables};
use crate::telemetry::FrameTelemetry;
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use winit::dpi::LogicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{EventLoop, EventLoopWindowTarget};
use winit::keyboard::PhysicalKey;
use winit::window::{Window, WindowBuilder};

/// Everything the event loop mutates between frames
struct WaterApp {
    window: Arc<Window>,
    title: String,
    pipeline: FramePipeline<GpuBackend>,
    input: InputState,
    tunables: Tunables,
    camera: OrbitCamera,
    telemetry: FrameTelemetry,
    orbit_degrees_per_pixel: f32,
    last_frame: Instant,
}

impl WaterApp {
    fn apply_actions(&mut self) {
        let mut title_dirty = false;
        for action in self.input.take_actions() {
            match action {
                ControlAction::SelectPrevious => {
                    self.tunables.select_previous();
                    title_dirty = true;
                }
                ControlAction::SelectNext => {
                    self.tunables.select_next();
                    title_dirty = true;
                }
                ControlAction::Adjust(amount) => {
                    self.tunables.nudge_selected(amount);
                    self.camera
                        .set_distance(self.tunables.get(Tunable::CameraDistance));
                    title_dirty = true;
                }
                ControlAction::AdvanceBarriers => {
                    self.pipeline.advance_barriers();
                    log::info!(
                        "[WaterApp] Barrier configuration {}",
                        self.pipeline.context().barrier_set().configuration()
                    );
                }
                ControlAction::ClearBarriers => {
                    self.pipeline.clear_barriers();
                    log::info!("[WaterApp] Barriers cleared");
                }
            }
        }
        if title_dirty {
            log::info!("[WaterApp] {}", self.tunables.summary());
            self.refresh_title();
        }
    }

    fn refresh_title(&self) {
        self.window.set_title(&format!(
            "{} | {} | {}",
            self.title,
            self.telemetry.latest().summary(),
            self.tunables.summary()
        ));
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pipeline.backend_mut().resize(width, height);
        let (scene_width, scene_height) = self.pipeline.backend().layout().scene.pixel_size();
        self.camera.resize(scene_width, scene_height);
    }

    fn redraw(&mut self, elwt: &EventLoopWindowTarget<()>) {
        let now = Instant::now();
        let delta = now.duration_since(self.last_frame).as_secs_f64();
        self.last_frame = now;

        self.apply_actions();
        let (dx, dy) = self.input.take_drag_delta();
        self.camera.orbit(
            dx * self.orbit_degrees_per_pixel,
            dy * self.orbit_degrees_per_pixel,
        );

        let preview = self.pipeline.backend().layout().preview;
        let input = FrameInput {
            delta,
            stroke: BrushStroke {
                pointer: self.input.pointer(preview.width, preview.height),
                brush: self.tunables.brush(),
            },
            shading: self.tunables.shading(),
            view: self.camera.scene_view(),
        };

        match self.pipeline.frame(&input) {
            Ok(report) => {
                if self
                    .telemetry
                    .record_frame(now, report.ticks, report.physics_time)
                    .is_some()
                {
                    self.refresh_title();
                }
            }
            Err(WaterError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                let size = self.window.inner_size();
                log::warn!("[WaterApp] Surface lost, reconfiguring");
                self.resize(size.width, size.height);
            }
            Err(WaterError::Surface(wgpu::SurfaceError::OutOfMemory)) => {
                log::error!("[WaterApp] Out of GPU memory, exiting");
                elwt.exit();
            }
            Err(e) => log::warn!("[WaterApp] Frame skipped: {}", e),
        }
    }
}

/// Create the window and device, then run until the window closes
pub async fn run_app(event_loop: EventLoop<()>, config: WaterConfig) -> Result<()> {
    log::info!("[app::run_app] Starting");

    if let Err(e) = env_logger::try_init() {
        log::debug!("[app::run_app] env_logger already initialized: {}", e);
    }

    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&config.window.title)
            .with_inner_size(LogicalSize::new(config.window.width, config.window.height))
            .build(&event_loop)
            .map_err(|e| {
                log::error!("[app::run_app] Window creation failed: {}", e);
                WaterError::from(e)
            })?,
    );

    let (context, target) = GpuContext::for_window(window.clone()).await?;
    log::info!(
        "[app::run_app] Running on {} ({:?})",
        context.adapter_info.name,
        context.adapter_info.backend
    );
    let backend = GpuBackend::new(&context, target, GpuFieldSettings::from(&config))?;
    let (scene_width, scene_height) = backend.layout().scene.pixel_size();

    let tunables = Tunables::new(config.controls.initial, config.controls.steps);
    let camera = OrbitCamera::new(
        tunables.get(Tunable::CameraDistance),
        scene_width,
        scene_height,
    );
    let simulation = SimulationContext::from_config(&config.simulation);

    let mut app = WaterApp {
        window: window.clone(),
        title: config.window.title.clone(),
        pipeline: FramePipeline::new(simulation, backend),
        input: InputState::new(),
        tunables,
        camera,
        telemetry: FrameTelemetry::new(),
        orbit_degrees_per_pixel: config.controls.orbit_degrees_per_pixel,
        last_frame: Instant::now(),
    };
    app.refresh_title();
    window.request_redraw();

    event_loop.run(move |event, elwt| match event {
        Event::WindowEvent {
            ref event,
            window_id,
        } if window_id == app.window.id() => match event {
            WindowEvent::CloseRequested => elwt.exit(),
            WindowEvent::Resized(size) => app.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(code) = event.physical_key {
                    app.input.process_key(code, event.state);
                }
            }
            WindowEvent::MouseInput { button, state, .. } => {
                app.input.process_mouse_button(*button, *state);
            }
            WindowEvent::CursorMoved { position, .. } => {
                app.input
                    .process_cursor_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::CursorLeft { .. } => app.input.process_cursor_left(),
            WindowEvent::MouseWheel { delta, .. } => app.input.process_scroll(*delta),
            WindowEvent::RedrawRequested => app.redraw(elwt),
            _ => {}
        },
        Event::AboutToWait => app.window.request_redraw(),
        _ => {}
    })?;

    log::info!("[app::run_app] Event loop finished");
    Ok(())
}

/// Blocking entry point used by the binary
pub fn run(config: WaterConfig) -> Result<()> {
    let event_loop = EventLoop::new().map_err(WaterError::from)?;
    pollster::block_on(run_app(event_loop, config))
}
