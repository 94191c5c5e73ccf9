//! Runtime configuration loaded from TOML
//!
//! Every field has a default, so a partial file (or no file at all) is valid.

use crate::error::{WaterError, WaterErrorContext, WaterResult};
use crate::sim::tunables::TUNABLE_COUNT;
use crate::sim::DEFAULT_STEP_HZ;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "water_block.toml";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WaterConfig {
    pub window: WindowConfig,
    pub simulation: SimulationConfig,
    pub field: FieldConfig,
    pub controls: ControlsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Water Block".to_string(),
            width: 1024,
            height: 600,
        }
    }
}

/// Fixed-timestep and kernel settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Side length of the square field textures, in cells
    pub resolution: u32,
    /// Simulation ticks per simulated second
    pub step_hz: f64,
    /// Upper bound on ticks run in a single displayed frame
    pub max_ticks_per_frame: Option<u32>,
    /// Frame deltas above this (seconds) are clamped before accumulation
    pub max_frame_delta: Option<f64>,
    pub wave_speed: f32,
    pub damping: f32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            resolution: 128,
            step_hz: DEFAULT_STEP_HZ,
            max_ticks_per_frame: Some(750),
            max_frame_delta: None,
            wave_speed: 0.25,
            damping: 0.995,
        }
    }
}

impl SimulationConfig {
    /// Fixed step size in seconds
    pub fn step_seconds(&self) -> f64 {
        1.0 / self.step_hz
    }
}

/// Geometry of the simulated surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    /// Half width of the square footprint centred on the origin
    pub half_extent: f32,
    /// Quads per side of the field mesh
    pub mesh_density: u32,
    /// Rest height of the field plane
    pub surface_height: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            half_extent: 8.0,
            mesh_density: 48,
            surface_height: 5.0,
        }
    }
}

/// Initial values and per-action steps of the user tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    pub initial: [f32; TUNABLE_COUNT],
    pub steps: [f32; TUNABLE_COUNT],
    /// Camera orbit in degrees per pixel of right-drag
    pub orbit_degrees_per_pixel: f32,
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            initial: [30.0, 0.15, 25.0, 0.75, 0.0, 0.25, 0.35],
            steps: [-2.0, 0.01, 2.5, 0.05, 0.025, 0.05, 0.05],
            orbit_degrees_per_pixel: 0.5,
        }
    }
}

impl WaterConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> WaterResult<Self> {
        let text = std::fs::read_to_string(path).config_context(path)?;
        let config = Self::from_toml_str(&text).config_context(path)?;
        config.validate()?;
        log::info!(
            "[WaterConfig::load] Loaded configuration from {}",
            path.display()
        );
        Ok(config)
    }

    /// Resolve the config from an optional CLI path.
    ///
    /// An explicit path must exist. Without one, `water_block.toml` is used when
    /// present and defaults otherwise.
    pub fn resolve(explicit: Option<PathBuf>) -> WaterResult<Self> {
        match explicit {
            Some(path) => Self::load(&path),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    log::info!("[WaterConfig::resolve] No config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> WaterResult<()> {
        if self.simulation.resolution == 0 {
            return Err(WaterError::InvalidConfig(
                "simulation.resolution must be non-zero".to_string(),
            ));
        }
        if !(self.simulation.step_hz > 0.0) {
            return Err(WaterError::InvalidConfig(
                "simulation.step_hz must be positive".to_string(),
            ));
        }
        if !(self.field.half_extent > 0.0) {
            return Err(WaterError::InvalidConfig(
                "field.half_extent must be positive".to_string(),
            ));
        }
        if self.field.mesh_density == 0 {
            return Err(WaterError::InvalidConfig(
                "field.mesh_density must be non-zero".to_string(),
            ));
        }
        if self.window.width < 2 || self.window.height == 0 {
            return Err(WaterError::InvalidConfig(format!(
                "window size {}x{} is too small",
                self.window.width, self.window.height
            )));
        }
        Ok(())
    }
}
