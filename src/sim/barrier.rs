//! Barrier configurations and the mask invalidation protocol
//!
//! Barriers are solid boxes standing in the field. Their top-down footprint
//! is baked into the mask buffer, which stays valid until the configuration
//! changes again.

use crate::sim::grid::{FieldFootprint, FieldGrid};

/// Number of non-empty barrier layouts; configuration 0 is "no barriers"
pub const BARRIER_LAYOUT_COUNT: usize = 3;

/// Upper bound on volumes in any layout
pub const MAX_BARRIER_VOLUMES: usize = 3;

/// Axis-aligned solid box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarrierVolume {
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

impl BarrierVolume {
    pub const fn new(center: [f32; 3], half_extents: [f32; 3]) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Whether the world XZ point lies inside the box's top-down footprint
    pub fn covers_xz(&self, x: f32, z: f32) -> bool {
        (x - self.center[0]).abs() < self.half_extents[0]
            && (z - self.center[2]).abs() < self.half_extents[2]
    }
}

/// One wall through the middle with a thicker stub
const LAYOUT_WALL: [BarrierVolume; 2] = [
    BarrierVolume::new([0.0, 5.0, 0.0], [1.0, 5.0, 8.0]),
    BarrierVolume::new([0.5, 5.0, 0.0], [1.0, 5.0, 2.0]),
];

/// Two walls with a small gap between them
const LAYOUT_GAP: [BarrierVolume; 2] = [
    BarrierVolume::new([0.0, 5.0, -4.5], [1.0, 5.0, 3.5]),
    BarrierVolume::new([0.0, 5.0, 4.5], [1.0, 5.0, 3.5]),
];

/// Three staggered walls forming a zigzag channel
const LAYOUT_ZIGZAG: [BarrierVolume; 3] = [
    BarrierVolume::new([4.0, 5.0, 1.0], [1.0, 5.0, 7.0]),
    BarrierVolume::new([0.0, 5.0, -1.0], [1.0, 5.0, 7.0]),
    BarrierVolume::new([-4.0, 5.0, 1.0], [1.0, 5.0, 7.0]),
];

/// Volumes making up a configuration index (0 and out-of-range are empty)
pub fn layout_volumes(configuration: usize) -> &'static [BarrierVolume] {
    match configuration {
        1 => &LAYOUT_WALL,
        2 => &LAYOUT_GAP,
        3 => &LAYOUT_ZIGZAG,
        _ => &[],
    }
}

/// Current set of barrier volumes
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierSet {
    configuration: usize,
    volumes: Vec<BarrierVolume>,
    /// Bumped on every mutation so geometry caches can tell sets apart
    generation: u64,
}

impl BarrierSet {
    /// Empty set (configuration 0)
    pub fn empty() -> Self {
        Self {
            configuration: 0,
            volumes: Vec::new(),
            generation: 0,
        }
    }

    pub fn configuration(&self) -> usize {
        self.configuration
    }

    pub fn volumes(&self) -> &[BarrierVolume] {
        &self.volumes
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn set_configuration(&mut self, configuration: usize) {
        self.configuration = configuration;
        self.volumes.clear();
        self.volumes.extend_from_slice(layout_volumes(configuration));
        self.generation += 1;
    }

    /// Whether a world XZ point is covered by any volume
    pub fn covers_xz(&self, x: f32, z: f32) -> bool {
        self.volumes.iter().any(|v| v.covers_xz(x, z))
    }
}

impl Default for BarrierSet {
    fn default() -> Self {
        Self::empty()
    }
}

/// Owner of the barrier configuration and the mask-invalidation flag
#[derive(Debug, Clone)]
pub struct BarrierController {
    set: BarrierSet,
    mask_dirty: bool,
    transitions: u64,
}

impl BarrierController {
    /// Start with no barriers and a mask that still needs its first bake
    pub fn new() -> Self {
        Self {
            set: BarrierSet::empty(),
            mask_dirty: true,
            transitions: 0,
        }
    }

    pub fn set(&self) -> &BarrierSet {
        &self.set
    }

    /// Step to the next layout, wrapping from the last back to 0
    pub fn advance(&mut self) {
        let next = (self.set.configuration + 1) % (BARRIER_LAYOUT_COUNT + 1);
        self.transition(next);
    }

    /// Jump straight to configuration 0
    pub fn clear(&mut self) {
        self.transition(0);
    }

    fn transition(&mut self, configuration: usize) {
        self.set.set_configuration(configuration);
        self.mask_dirty = true;
        self.transitions += 1;
        log::info!(
            "[BarrierController] Barrier configuration {} ({} volumes)",
            configuration,
            self.set.len()
        );
    }

    /// Whether the mask must be re-baked before the next tick
    pub fn mask_dirty(&self) -> bool {
        self.mask_dirty
    }

    /// Clear the invalidation flag. Only call after the re-bake has been issued.
    pub fn mark_baked(&mut self) {
        self.mask_dirty = false;
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }
}

impl Default for BarrierController {
    fn default() -> Self {
        Self::new()
    }
}

/// Rasterize the set top-down into `mask`: 1.0 where a cell centre is
/// covered, 0.0 elsewhere. The whole mask is rewritten.
pub fn rasterize_mask(set: &BarrierSet, footprint: &FieldFootprint, mask: &mut FieldGrid<f32>) {
    for y in 0..mask.height() {
        for x in 0..mask.width() {
            let [wx, wz] = footprint.uv_to_world(mask.cell_center(x, y));
            let occupied = if set.covers_xz(wx, wz) { 1.0 } else { 0.0 };
            mask.set(x, y, occupied);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_wraps_to_zero() {
        let mut controller = BarrierController::new();
        let mut seen = Vec::new();
        for _ in 0..4 {
            controller.advance();
            seen.push(controller.set().configuration());
        }
        assert_eq!(seen, vec![1, 2, 3, 0]);
        assert!(controller.set().is_empty());
    }

    #[test]
    fn test_every_transition_invalidates() {
        let mut controller = BarrierController::new();
        controller.mark_baked();
        controller.advance();
        assert!(controller.mask_dirty());
        controller.mark_baked();
        controller.clear();
        assert!(controller.mask_dirty());
        assert_eq!(controller.transitions(), 2);
    }

    #[test]
    fn test_layout_sizes() {
        assert_eq!(layout_volumes(1).len(), 2);
        assert_eq!(layout_volumes(2).len(), 2);
        assert_eq!(layout_volumes(3).len(), 3);
        assert!(layout_volumes(99).is_empty());
        for configuration in 0..=BARRIER_LAYOUT_COUNT {
            assert!(layout_volumes(configuration).len() <= MAX_BARRIER_VOLUMES);
        }
    }

    #[test]
    fn test_gap_layout_leaves_centre_open() {
        let mut controller = BarrierController::new();
        controller.advance();
        controller.advance();
        let set = controller.set();
        assert!(!set.covers_xz(0.0, 0.0));
        assert!(set.covers_xz(0.0, 4.5));
        assert!(set.covers_xz(0.0, -4.5));
    }

    #[test]
    fn test_rasterized_wall_occupies_middle_column() {
        let mut controller = BarrierController::new();
        controller.advance();
        let footprint = FieldFootprint::new(8.0);
        let mut mask = FieldGrid::new(32, 32);
        rasterize_mask(controller.set(), &footprint, &mut mask);

        assert_eq!(mask.get(16, 16), 1.0);
        assert_eq!(mask.get(2, 16), 0.0);
        assert!(mask.count_nonzero() > 0);
    }

    #[test]
    fn test_generation_changes_on_mutation() {
        let mut controller = BarrierController::new();
        let before = controller.set().generation();
        controller.clear();
        assert_ne!(controller.set().generation(), before);
    }
}
