//! User-adjustable scalar parameters
//!
//! Seven values are cycled through with a selection cursor and nudged by a
//! fixed step per action.

use crate::sim::brush::BrushParams;

pub const TUNABLE_COUNT: usize = 7;

/// The adjustable parameters, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tunable {
    CameraDistance,
    BrushSize,
    BrushPower,
    FogDensity,
    Turbulence,
    Refraction,
    Reflection,
}

impl Tunable {
    pub const ALL: [Tunable; TUNABLE_COUNT] = [
        Tunable::CameraDistance,
        Tunable::BrushSize,
        Tunable::BrushPower,
        Tunable::FogDensity,
        Tunable::Turbulence,
        Tunable::Refraction,
        Tunable::Reflection,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Tunable::CameraDistance => "Camera Distance",
            Tunable::BrushSize => "Brush Size",
            Tunable::BrushPower => "Brush Power",
            Tunable::FogDensity => "Fog Density",
            Tunable::Turbulence => "Turbulence",
            Tunable::Refraction => "Refraction",
            Tunable::Reflection => "Reflection",
        }
    }

    /// Brush power is the only value allowed to go negative
    fn allows_negative(self) -> bool {
        matches!(self, Tunable::BrushPower)
    }
}

/// Field shading parameters consumed by presentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadingParams {
    pub fog_density: f32,
    pub turbulence: f32,
    pub refraction: f32,
    pub reflection: f32,
}

/// Current tunable values plus the selection cursor
#[derive(Debug, Clone, PartialEq)]
pub struct Tunables {
    values: [f32; TUNABLE_COUNT],
    steps: [f32; TUNABLE_COUNT],
    selected: usize,
}

impl Tunables {
    pub fn new(values: [f32; TUNABLE_COUNT], steps: [f32; TUNABLE_COUNT]) -> Self {
        Self {
            values,
            steps,
            selected: 0,
        }
    }

    pub fn get(&self, tunable: Tunable) -> f32 {
        self.values[tunable.index()]
    }

    pub fn selected(&self) -> Tunable {
        Tunable::ALL[self.selected]
    }

    /// Move the cursor up, wrapping to the last entry
    pub fn select_previous(&mut self) {
        self.selected = (self.selected + TUNABLE_COUNT - 1) % TUNABLE_COUNT;
    }

    /// Move the cursor down, wrapping to the first entry
    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % TUNABLE_COUNT;
    }

    /// Add `amount` steps to the selected value
    pub fn nudge_selected(&mut self, amount: f32) {
        let tunable = self.selected();
        let index = tunable.index();
        self.values[index] += self.steps[index] * amount;

        // Values below one step snap to zero
        if !tunable.allows_negative() && self.values[index] < self.steps[index].abs() {
            self.values[index] = 0.0;
        }
    }

    pub fn brush(&self) -> BrushParams {
        BrushParams {
            size: self.get(Tunable::BrushSize),
            power: self.get(Tunable::BrushPower),
        }
    }

    pub fn shading(&self) -> ShadingParams {
        ShadingParams {
            fog_density: self.get(Tunable::FogDensity),
            turbulence: self.get(Tunable::Turbulence),
            refraction: self.get(Tunable::Refraction),
            reflection: self.get(Tunable::Reflection),
        }
    }

    /// One line per tunable with the selection marked
    pub fn summary(&self) -> String {
        Tunable::ALL
            .iter()
            .map(|t| {
                let marker = if *t == self.selected() { '>' } else { ' ' };
                format!("{} {:<15}: {}", marker, t.label(), self.get(*t))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlsConfig;

    fn defaults() -> Tunables {
        let controls = ControlsConfig::default();
        Tunables::new(controls.initial, controls.steps)
    }

    #[test]
    fn test_selection_wraps() {
        let mut tunables = defaults();
        tunables.select_previous();
        assert_eq!(tunables.selected(), Tunable::Reflection);
        tunables.select_next();
        assert_eq!(tunables.selected(), Tunable::CameraDistance);
    }

    #[test]
    fn test_values_snap_to_zero_below_one_step() {
        let mut tunables = defaults();
        tunables.select_next(); // brush size 0.15, step 0.01
        for _ in 0..20 {
            tunables.nudge_selected(-1.0);
        }
        assert_eq!(tunables.get(Tunable::BrushSize), 0.0);
    }

    #[test]
    fn test_brush_power_can_go_negative() {
        let mut tunables = defaults();
        tunables.select_next();
        tunables.select_next();
        for _ in 0..12 {
            tunables.nudge_selected(-1.0);
        }
        assert!(tunables.get(Tunable::BrushPower) < 0.0);
        assert_eq!(tunables.brush().power, tunables.get(Tunable::BrushPower));
    }

    #[test]
    fn test_camera_distance_step_moves_closer() {
        let mut tunables = defaults();
        tunables.nudge_selected(1.0);
        assert_eq!(tunables.get(Tunable::CameraDistance), 28.0);
    }

    #[test]
    fn test_camera_distance_snaps_near_zero() {
        let mut tunables = defaults();
        for _ in 0..14 {
            tunables.nudge_selected(1.0);
        }
        assert_eq!(tunables.get(Tunable::CameraDistance), 2.0);
        tunables.nudge_selected(1.0);
        assert_eq!(tunables.get(Tunable::CameraDistance), 0.0);
    }

    #[test]
    fn test_summary_marks_selection() {
        let tunables = defaults();
        let summary = tunables.summary();
        assert!(summary.lines().next().unwrap().starts_with('>'));
        assert_eq!(summary.lines().count(), TUNABLE_COUNT);
    }
}
