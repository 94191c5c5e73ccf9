//! Height-field simulation state
//!
//! Pure CPU-side data: the fixed-timestep clock, the ping-pong role index,
//! barrier configuration, brush painting and the software kernels. Nothing
//! here touches the GPU.

pub mod barrier;
pub mod brush;
pub mod clock;
pub mod grid;
pub mod kernel;
pub mod ping_pong;
pub mod tunables;

pub use barrier::{
    layout_volumes, rasterize_mask, BarrierController, BarrierSet, BarrierVolume,
    BARRIER_LAYOUT_COUNT, MAX_BARRIER_VOLUMES,
};
pub use brush::{brush_falloff, paint_delta, BrushParams, BrushStroke, PointerState};
pub use clock::SimulationClock;
pub use grid::{FieldFootprint, FieldGrid, HeightCell, SurfaceCell};
pub use kernel::{FieldKernel, WaveKernel};
pub use ping_pong::{HeightField, HeightRoles};
pub use tunables::{ShadingParams, Tunable, Tunables, TUNABLE_COUNT};

/// Default simulation rate in ticks per second
pub const DEFAULT_STEP_HZ: f64 = 750.0;
