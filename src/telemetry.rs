//! Frame rate and simulation cost telemetry
//!
//! Counts frames and field ticks over a fixed window and publishes one
//! snapshot per window for the title bar.

use std::time::{Duration, Instant};

/// Snapshot published once per telemetry window
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TelemetrySnapshot {
    /// Displayed frames in the last window
    pub fps: u32,
    /// Field ticks in the last window
    pub ticks: u64,
    /// Physics time accumulated over the window, in milliseconds
    pub physics_ms_per_second: f64,
    /// Physics time of the most recent frame, in milliseconds
    pub physics_ms_per_frame: f64,
}

impl TelemetrySnapshot {
    pub fn summary(&self) -> String {
        format!(
            "FPS: {} | Physics Loops: {} | Physics Calc Time: {:.2}ms/s, {:.3}ms/frame",
            self.fps, self.ticks, self.physics_ms_per_second, self.physics_ms_per_frame
        )
    }
}

/// Rolling one-second counters for frame rate and simulation cost
#[derive(Debug, Clone)]
pub struct FrameTelemetry {
    window: Duration,
    window_start: Instant,
    frames: u32,
    ticks: u64,
    physics_time: Duration,
    last_physics_time: Duration,
    latest: TelemetrySnapshot,
}

impl FrameTelemetry {
    /// Create new telemetry with a one-second window
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1), Instant::now())
    }

    pub fn with_window(window: Duration, start: Instant) -> Self {
        Self {
            window,
            window_start: start,
            frames: 0,
            ticks: 0,
            physics_time: Duration::ZERO,
            last_physics_time: Duration::ZERO,
            latest: TelemetrySnapshot::default(),
        }
    }

    /// Record one displayed frame. Returns a fresh snapshot when the window
    /// rolls over.
    pub fn record_frame(
        &mut self,
        now: Instant,
        ticks: u32,
        physics_time: Duration,
    ) -> Option<TelemetrySnapshot> {
        self.frames += 1;
        self.ticks += ticks as u64;
        self.physics_time += physics_time;
        self.last_physics_time = physics_time;

        if now.duration_since(self.window_start) < self.window {
            return None;
        }

        self.latest = TelemetrySnapshot {
            fps: self.frames,
            ticks: self.ticks,
            physics_ms_per_second: self.physics_time.as_secs_f64() * 1000.0,
            physics_ms_per_frame: self.last_physics_time.as_secs_f64() * 1000.0,
        };
        self.window_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.physics_time = Duration::ZERO;

        log::info!("[FrameTelemetry] {}", self.latest.summary());
        Some(self.latest)
    }

    pub fn latest(&self) -> TelemetrySnapshot {
        self.latest
    }
}

impl Default for FrameTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_rollover() {
        let start = Instant::now();
        let mut telemetry = FrameTelemetry::with_window(Duration::from_secs(1), start);

        for i in 1..60u64 {
            let now = start + Duration::from_millis(i * 16);
            assert!(telemetry
                .record_frame(now, 12, Duration::from_micros(500))
                .is_none());
        }
        let snapshot = telemetry
            .record_frame(start + Duration::from_secs(1), 13, Duration::from_millis(1))
            .unwrap();

        assert_eq!(snapshot.fps, 60);
        assert_eq!(snapshot.ticks, 59 * 12 + 13);
        assert!((snapshot.physics_ms_per_frame - 1.0).abs() < 1e-9);
        assert!((snapshot.physics_ms_per_second - (59.0 * 0.5 + 1.0)).abs() < 1e-6);
        assert_eq!(telemetry.latest(), snapshot);
    }
}
