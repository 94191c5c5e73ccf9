//! Double-buffer role tracking for the height field
//!
//! The field owns two height buffers. Exactly one is `current` (readable as
//! simulation input); the other is `next` (write target of the in-flight tick).

/// Read/write assignment for one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeightRoles {
    /// Buffer read by the tick
    pub current: usize,
    /// Buffer written by the tick
    pub next: usize,
}

/// Role index over a pair of height buffers
#[derive(Debug, Clone, Default)]
pub struct HeightField {
    current: usize,
    swaps: u64,
}

impl HeightField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the buffer holding the latest completed state
    pub fn current(&self) -> usize {
        self.current
    }

    /// Index of the buffer the next tick writes
    pub fn next(&self) -> usize {
        1 - self.current
    }

    pub fn roles(&self) -> HeightRoles {
        HeightRoles {
            current: self.current,
            next: self.next(),
        }
    }

    /// Publish the just-written buffer as current. Called once per completed tick.
    pub fn swap(&mut self) {
        self.current = 1 - self.current;
        self.swaps += 1;
    }

    /// Number of swaps since creation
    pub fn swaps(&self) -> u64 {
        self.swaps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_never_alias() {
        let mut field = HeightField::new();
        for _ in 0..5 {
            let roles = field.roles();
            assert_ne!(roles.current, roles.next);
            field.swap();
        }
    }

    #[test]
    fn test_swap_parity() {
        let mut field = HeightField::new();
        let start = field.current();
        for n in 1..=9u64 {
            field.swap();
            assert_eq!(field.current(), (start + n as usize) % 2);
        }
        assert_eq!(field.swaps(), 9);
    }
}
