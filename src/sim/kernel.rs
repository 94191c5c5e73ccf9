//! CPU field update kernels
//!
//! A kernel reads the current height buffer and the mask and fully writes the
//! next height buffer plus the derived-surface buffer. The orchestration never
//! looks inside; it only guarantees the buffers are distinct.

use crate::sim::grid::{FieldGrid, HeightCell, SurfaceCell};
use rayon::prelude::*;

/// One tick of the height-field update
pub trait FieldKernel: Send {
    /// Compute `next` and `surface` from `current` and `mask`.
    ///
    /// Every cell of both outputs must be written.
    fn step(
        &mut self,
        current: &FieldGrid<HeightCell>,
        mask: &FieldGrid<f32>,
        next: &mut FieldGrid<HeightCell>,
        surface: &mut FieldGrid<SurfaceCell>,
    );

    fn name(&self) -> &str {
        "kernel"
    }
}

/// Damped explicit wave equation on (height, velocity)
///
/// Occupied mask cells are held at rest and reflect their neighbours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveKernel {
    /// Laplacian coupling per tick; stable below 0.5
    pub wave_speed: f32,
    /// Velocity retained per tick
    pub damping: f32,
    /// World size of one cell, used for normals
    pub cell_size: f32,
}

impl WaveKernel {
    pub fn new(wave_speed: f32, damping: f32, cell_size: f32) -> Self {
        Self {
            wave_speed,
            damping,
            cell_size,
        }
    }
}

fn is_wall(mask: &FieldGrid<f32>, x: isize, y: isize) -> bool {
    mask.get_clamped(x, y) > 0.5
}

/// Height of a neighbour, mirrored back to the centre at walls and edges
fn neighbour_height(
    current: &FieldGrid<HeightCell>,
    mask: &FieldGrid<f32>,
    x: isize,
    y: isize,
    centre: f32,
) -> f32 {
    let inside = x >= 0 && y >= 0 && x < current.width() as isize && y < current.height() as isize;
    if !inside || is_wall(mask, x, y) {
        centre
    } else {
        current.get(x as usize, y as usize).height
    }
}

impl FieldKernel for WaveKernel {
    fn step(
        &mut self,
        current: &FieldGrid<HeightCell>,
        mask: &FieldGrid<f32>,
        next: &mut FieldGrid<HeightCell>,
        surface: &mut FieldGrid<SurfaceCell>,
    ) {
        let width = current.width();
        let kernel = *self;

        next.cells_mut()
            .par_chunks_mut(width)
            .zip(surface.cells_mut().par_chunks_mut(width))
            .enumerate()
            .for_each(|(y, (next_row, surface_row))| {
                for x in 0..width {
                    let (xi, yi) = (x as isize, y as isize);
                    if is_wall(mask, xi, yi) {
                        next_row[x] = HeightCell::default();
                        surface_row[x] = SurfaceCell::default();
                        continue;
                    }

                    let cell = current.get(x, y);
                    let h = cell.height;
                    let left = neighbour_height(current, mask, xi - 1, yi, h);
                    let right = neighbour_height(current, mask, xi + 1, yi, h);
                    let down = neighbour_height(current, mask, xi, yi - 1, h);
                    let up = neighbour_height(current, mask, xi, yi + 1, h);

                    let laplacian = left + right + down + up - 4.0 * h;
                    let velocity = (cell.velocity + kernel.wave_speed * laplacian) * kernel.damping;
                    next_row[x] = HeightCell {
                        height: h + velocity,
                        velocity,
                    };

                    let slope_x = (right - left) / (2.0 * kernel.cell_size);
                    let slope_z = (up - down) / (2.0 * kernel.cell_size);
                    let length = (slope_x * slope_x + 1.0 + slope_z * slope_z).sqrt();
                    surface_row[x] = SurfaceCell {
                        normal: [-slope_x / length, 1.0 / length, -slope_z / length],
                        velocity,
                    };
                }
            });
    }

    fn name(&self) -> &str {
        "wave"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(
        kernel: &mut WaveKernel,
        field: &FieldGrid<HeightCell>,
        mask: &FieldGrid<f32>,
    ) -> (FieldGrid<HeightCell>, FieldGrid<SurfaceCell>) {
        let mut next = FieldGrid::new(field.width(), field.height());
        let mut surface = FieldGrid::new(field.width(), field.height());
        kernel.step(field, mask, &mut next, &mut surface);
        (next, surface)
    }

    #[test]
    fn test_flat_field_stays_flat() {
        let mut kernel = WaveKernel::new(0.25, 0.995, 0.125);
        let field = FieldGrid::new(8, 8);
        let mask = FieldGrid::new(8, 8);
        let (next, surface) = run(&mut kernel, &field, &mask);
        assert!(next.cells().iter().all(|c| *c == HeightCell::default()));
        assert!(surface.cells().iter().all(|c| c.normal == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_bump_spreads_to_neighbours() {
        let mut kernel = WaveKernel::new(0.25, 1.0, 0.125);
        let mut field = FieldGrid::new(9, 9);
        let bump = HeightCell {
            height: 1.0,
            velocity: 0.0,
        };
        field.set(4, 4, bump);
        let mask = FieldGrid::new(9, 9);

        let (next, _) = run(&mut kernel, &field, &mask);
        assert!(next.get(4, 4).height < 1.0);
        assert!(next.get(3, 4).height > 0.0);
        assert!(next.get(4, 5).height > 0.0);
    }

    #[test]
    fn test_walls_stay_at_rest() {
        let mut kernel = WaveKernel::new(0.25, 1.0, 0.125);
        let cell = HeightCell {
            height: 2.0,
            velocity: 1.0,
        };
        let field = FieldGrid::filled(6, 6, cell);
        let mut mask = FieldGrid::new(6, 6);
        mask.set(2, 2, 1.0);

        let (next, surface) = run(&mut kernel, &field, &mask);
        assert_eq!(next.get(2, 2), HeightCell::default());
        assert_eq!(surface.get(2, 2), SurfaceCell::default());
        assert!(next.get(0, 0).height > 2.0);
    }
}
