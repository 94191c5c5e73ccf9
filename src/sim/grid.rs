//! CPU-side field buffers and footprint mapping
//!
//! Cell `(i, j)` covers `u in [i/w, (i+1)/w)` and `v in [j/h, (j+1)/h)`; row 0
//! is `v = 0`, matching texel row 0 of the GPU textures.

/// Height buffer texel: surface displacement and its rate of change
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeightCell {
    pub height: f32,
    pub velocity: f32,
}

/// Derived-surface texel: unit normal and vertical velocity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceCell {
    pub normal: [f32; 3],
    pub velocity: f32,
}

impl Default for SurfaceCell {
    fn default() -> Self {
        Self {
            normal: [0.0, 1.0, 0.0],
            velocity: 0.0,
        }
    }
}

/// Dense row-major 2D buffer
#[derive(Debug, Clone, PartialEq)]
pub struct FieldGrid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T: Copy + Default> FieldGrid<T> {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![T::default(); width * height],
        }
    }

    /// Reset every cell to the default value
    pub fn clear(&mut self) {
        self.cells.fill(T::default());
    }
}

impl<T: Copy> FieldGrid<T> {
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            cells: vec![value; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, x: usize, y: usize) -> T {
        self.cells[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: T) {
        self.cells[y * self.width + x] = value;
    }

    /// Read with coordinates clamped to the grid edge
    pub fn get_clamped(&self, x: isize, y: isize) -> T {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.get(x, y)
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    pub fn cells_mut(&mut self) -> &mut [T] {
        &mut self.cells
    }

    /// Normalised coordinates of the centre of cell `(x, y)`
    pub fn cell_center(&self, x: usize, y: usize) -> [f32; 2] {
        [
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        ]
    }

    /// Cell containing normalised coordinates `uv`, clamped to the grid
    pub fn cell_at(&self, uv: [f32; 2]) -> (usize, usize) {
        let x = (uv[0] * self.width as f32).floor() as isize;
        let y = (uv[1] * self.height as f32).floor() as isize;
        (
            x.clamp(0, self.width as isize - 1) as usize,
            y.clamp(0, self.height as isize - 1) as usize,
        )
    }
}

impl FieldGrid<f32> {
    /// Largest value in the grid
    pub fn max_value(&self) -> f32 {
        self.cells.iter().copied().fold(f32::NEG_INFINITY, f32::max)
    }

    /// Number of cells with a non-zero value
    pub fn count_nonzero(&self) -> usize {
        self.cells.iter().filter(|v| **v != 0.0).count()
    }
}

/// Horizontal footprint of the field in world space
///
/// The field is a square centred on the origin in the XZ plane with
/// `u = (x + E) / 2E` and `v = (z + E) / 2E`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldFootprint {
    pub half_extent: f32,
}

impl FieldFootprint {
    pub fn new(half_extent: f32) -> Self {
        Self { half_extent }
    }

    /// World XZ position of normalised field coordinates
    pub fn uv_to_world(&self, uv: [f32; 2]) -> [f32; 2] {
        let e = self.half_extent;
        [uv[0] * 2.0 * e - e, uv[1] * 2.0 * e - e]
    }

    /// Normalised field coordinates of a world XZ position (unclamped)
    pub fn world_to_uv(&self, xz: [f32; 2]) -> [f32; 2] {
        let e = self.half_extent;
        [(xz[0] + e) / (2.0 * e), (xz[1] + e) / (2.0 * e)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_lookup_roundtrips_centres() {
        let grid: FieldGrid<f32> = FieldGrid::new(16, 8);
        for (x, y) in [(0, 0), (15, 7), (3, 5)] {
            assert_eq!(grid.cell_at(grid.cell_center(x, y)), (x, y));
        }
        assert_eq!(grid.cell_at([-0.5, 2.0]), (0, 7));
    }

    #[test]
    fn test_footprint_corners() {
        let footprint = FieldFootprint::new(8.0);
        assert_eq!(footprint.uv_to_world([0.0, 0.0]), [-8.0, -8.0]);
        assert_eq!(footprint.uv_to_world([1.0, 1.0]), [8.0, 8.0]);
        assert_eq!(footprint.world_to_uv([0.0, 0.0]), [0.5, 0.5]);
    }

    #[test]
    fn test_clamped_reads() {
        let mut grid: FieldGrid<f32> = FieldGrid::new(4, 4);
        grid.set(0, 0, 2.0);
        grid.set(3, 3, 5.0);
        assert_eq!(grid.get_clamped(-3, -1), 2.0);
        assert_eq!(grid.get_clamped(10, 10), 5.0);
    }
}
