//! Input decoding
//!
//! Raw winit events are folded into [`InputState`]; the app drains discrete
//! [`ControlAction`]s and the accumulated orbit drag once per frame and reads
//! the pointer as field-normalised coordinates.

use crate::sim::PointerState;
use std::collections::HashSet;
use winit::event::{ElementState, MouseButton, MouseScrollDelta};
pub use winit::keyboard::KeyCode;

/// Pixels per line for touchpads that report pixel deltas
const PIXELS_PER_SCROLL_LINE: f32 = 40.0;

/// Discrete user commands
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlAction {
    SelectPrevious,
    SelectNext,
    /// Add this many steps to the selected tunable
    Adjust(f32),
    AdvanceBarriers,
    ClearBarriers,
}

impl ControlAction {
    /// Action bound to a key press, if any
    pub fn from_key(key: KeyCode) -> Option<Self> {
        match key {
            KeyCode::ArrowUp => Some(ControlAction::SelectPrevious),
            KeyCode::ArrowDown => Some(ControlAction::SelectNext),
            KeyCode::ArrowLeft => Some(ControlAction::Adjust(-1.0)),
            KeyCode::ArrowRight => Some(ControlAction::Adjust(1.0)),
            KeyCode::Space => Some(ControlAction::AdvanceBarriers),
            KeyCode::KeyZ => Some(ControlAction::ClearBarriers),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct InputState {
    keys_pressed: HashSet<KeyCode>,
    mouse_buttons_pressed: HashSet<MouseButton>,
    cursor_position: Option<(f32, f32)>,
    drag_delta: (f32, f32),
    actions: Vec<ControlAction>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_key(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.keys_pressed.insert(key);
                // OS key repeat re-sends Pressed, so a held key keeps acting
                if let Some(action) = ControlAction::from_key(key) {
                    self.actions.push(action);
                }
            }
            ElementState::Released => {
                self.keys_pressed.remove(&key);
            }
        }
    }

    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_buttons_pressed.insert(button);
            }
            ElementState::Released => {
                self.mouse_buttons_pressed.remove(&button);
            }
        }
    }

    /// Track the cursor; while the right button is held the motion becomes
    /// orbit drag
    pub fn process_cursor_moved(&mut self, x: f32, y: f32) {
        if let Some((last_x, last_y)) = self.cursor_position {
            if self.is_mouse_button_pressed(MouseButton::Right) {
                self.drag_delta.0 += x - last_x;
                self.drag_delta.1 += y - last_y;
            }
        }
        self.cursor_position = Some((x, y));
    }

    pub fn process_cursor_left(&mut self) {
        self.cursor_position = None;
    }

    pub fn process_scroll(&mut self, delta: MouseScrollDelta) {
        let lines = match delta {
            MouseScrollDelta::LineDelta(_, y) => y,
            MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_SCROLL_LINE,
        };
        if lines != 0.0 {
            self.actions.push(ControlAction::Adjust(lines));
        }
    }

    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn is_mouse_button_pressed(&self, button: MouseButton) -> bool {
        self.mouse_buttons_pressed.contains(&button)
    }

    /// Actions queued since the last call
    pub fn take_actions(&mut self) -> Vec<ControlAction> {
        std::mem::take(&mut self.actions)
    }

    /// Right-drag motion in pixels since the last call
    pub fn take_drag_delta(&mut self) -> (f32, f32) {
        std::mem::take(&mut self.drag_delta)
    }

    /// Pointer over the preview area of `preview_width` x `preview_height`
    /// pixels, clamped into `[0, 1]^2`
    pub fn pointer(&self, preview_width: f32, preview_height: f32) -> PointerState {
        let position = match self.cursor_position {
            Some((x, y)) => [
                (x / preview_width.max(1.0)).clamp(0.0, 1.0),
                (y / preview_height.max(1.0)).clamp(0.0, 1.0),
            ],
            None => PointerState::default().position,
        };
        PointerState {
            position,
            active: self.is_mouse_button_pressed(MouseButton::Left),
        }
    }
}
