//! Pointer painting into the transient paint-delta buffer

use crate::sim::grid::FieldGrid;

/// Decoded pointer state for one displayed frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    /// Position in normalised field coordinates, `[0, 1]^2`
    pub position: [f32; 2],
    /// Whether the paint button is held
    pub active: bool,
}

impl Default for PointerState {
    fn default() -> Self {
        Self {
            position: [0.5, 0.5],
            active: false,
        }
    }
}

/// Brush shape and strength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushParams {
    /// Radius in normalised field units
    pub size: f32,
    /// Peak paint rate; negative values dig troughs
    pub power: f32,
}

/// Everything the paint stage needs for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BrushStroke {
    pub pointer: PointerState,
    pub brush: BrushParams,
}

impl BrushStroke {
    /// Paint value at normalised position `uv`, ignoring the mask
    pub fn value_at(&self, uv: [f32; 2]) -> f32 {
        if !self.pointer.active {
            return 0.0;
        }
        let dx = uv[0] - self.pointer.position[0];
        let dy = uv[1] - self.pointer.position[1];
        let distance = (dx * dx + dy * dy).sqrt();
        brush_falloff(distance, self.brush.size) * self.brush.power
    }
}

/// Radial falloff: 1 at the centre, smoothly reaching exactly 0 at `radius`
pub fn brush_falloff(distance: f32, radius: f32) -> f32 {
    if radius <= 0.0 || distance >= radius {
        return 0.0;
    }
    let t = distance / radius;
    let s = 1.0 - t * t;
    s * s
}

/// Clear `delta` and write the stroke into it, zero wherever `mask` is occupied
pub fn paint_delta(stroke: &BrushStroke, mask: &FieldGrid<f32>, delta: &mut FieldGrid<f32>) {
    delta.clear();
    if !stroke.pointer.active {
        return;
    }
    for y in 0..delta.height() {
        for x in 0..delta.width() {
            if mask.get(x, y) > 0.5 {
                continue;
            }
            let value = stroke.value_at(delta.cell_center(x, y));
            delta.set(x, y, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stroke(active: bool, power: f32) -> BrushStroke {
        BrushStroke {
            pointer: PointerState {
                position: [0.5, 0.5],
                active,
            },
            brush: BrushParams { size: 0.15, power },
        }
    }

    #[test]
    fn test_falloff_shape() {
        assert_eq!(brush_falloff(0.0, 0.15), 1.0);
        assert_eq!(brush_falloff(0.15, 0.15), 0.0);
        assert_eq!(brush_falloff(0.3, 0.15), 0.0);
        assert!(brush_falloff(0.05, 0.15) > brush_falloff(0.1, 0.15));
        assert_eq!(brush_falloff(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_inactive_pointer_paints_nothing() {
        let mask = FieldGrid::new(16, 16);
        let mut delta = FieldGrid::filled(16, 16, 3.0);
        paint_delta(&stroke(false, 25.0), &mask, &mut delta);
        assert_eq!(delta.count_nonzero(), 0);
    }

    #[test]
    fn test_mask_blocks_paint() {
        let mask = FieldGrid::filled(16, 16, 1.0);
        let mut delta = FieldGrid::new(16, 16);
        paint_delta(&stroke(true, 25.0), &mask, &mut delta);
        assert_eq!(delta.count_nonzero(), 0);
    }

    #[test]
    fn test_power_scales_monotonically() {
        let uv = [0.52, 0.5];
        let weak = stroke(true, 5.0).value_at(uv);
        let strong = stroke(true, 25.0).value_at(uv);
        assert!(strong > weak);
        assert!(weak > 0.0);
    }
}
