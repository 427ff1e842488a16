//! Grid coordinates for positional combat
//!
//! The battle grid is abstract and unobstructed; all range checks use the
//! Chebyshev ("king move") metric, so diagonal steps cost the same as
//! straight ones.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer coordinate on the combat grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl GridCoord {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Build a coordinate from raw persisted data.
    ///
    /// Returns None unless exactly three components are present; callers
    /// fall back to a known-good position rather than aborting.
    pub fn from_slice(raw: &[i32]) -> Option<Self> {
        match raw {
            [x, y, z] => Some(Self::new(*x, *y, *z)),
            _ => None,
        }
    }

    /// Chebyshev distance: the maximum per-axis delta
    pub fn chebyshev(&self, other: &Self) -> u32 {
        let dx = (self.x as i64 - other.x as i64).unsigned_abs();
        let dy = (self.y as i64 - other.y as i64).unsigned_abs();
        let dz = (self.z as i64 - other.z as i64).unsigned_abs();
        dx.max(dy).max(dz).min(u32::MAX as u64) as u32
    }

    /// One movement step toward a target position.
    ///
    /// Within `max_step` of the target the mover snaps onto the target's
    /// x/y, keeping its own elevation unless it flies. Otherwise each axis
    /// closes by at most `max_step` independently.
    pub fn step_toward(self, target: GridCoord, max_step: u32, flies: bool) -> GridCoord {
        if self.chebyshev(&target) < max_step {
            let z = if flies { target.z } else { self.z };
            return GridCoord::new(target.x, target.y, z);
        }
        let z = if flies {
            step_axis(self.z, target.z, max_step)
        } else {
            self.z
        };
        GridCoord::new(
            step_axis(self.x, target.x, max_step),
            step_axis(self.y, target.y, max_step),
            z,
        )
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Advance one axis by at most `max_step` toward a target value
fn step_axis(from: i32, to: i32, max_step: u32) -> i32 {
    let delta = to as i64 - from as i64;
    let step = delta.unsigned_abs().min(max_step as u64) as i64;
    let step = if delta < 0 { -step } else { step };
    (from as i64 + step) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_distance_to_self_is_zero() {
        let a = GridCoord::new(3, -2, 7);
        assert_eq!(a.chebyshev(&a), 0);
    }

    #[test]
    fn test_distance_takes_largest_axis() {
        let a = GridCoord::new(0, 0, 0);
        let b = GridCoord::new(1, 5, -2);
        assert_eq!(a.chebyshev(&b), 5);
    }

    #[test]
    fn test_from_slice_requires_three_components() {
        assert_eq!(
            GridCoord::from_slice(&[1, 2, 3]),
            Some(GridCoord::new(1, 2, 3))
        );
        assert_eq!(GridCoord::from_slice(&[1, 2]), None);
        assert_eq!(GridCoord::from_slice(&[1, 2, 3, 4]), None);
        assert_eq!(GridCoord::from_slice(&[]), None);
    }

    #[test]
    fn test_step_toward_snaps_when_close() {
        let from = GridCoord::new(0, 0, 0);
        let target = GridCoord::new(1, 1, 4);
        let stepped = from.step_toward(target, 2, false);
        // Within range: snap to target x/y but hold elevation
        assert_eq!(stepped, GridCoord::new(1, 1, 0));
    }

    #[test]
    fn test_step_toward_snaps_elevation_when_flying() {
        let from = GridCoord::new(0, 0, 0);
        let target = GridCoord::new(1, 1, 4);
        let stepped = from.step_toward(target, 2, true);
        assert_eq!(stepped, GridCoord::new(1, 1, 4));
    }

    #[test]
    fn test_step_toward_limits_each_axis() {
        let from = GridCoord::new(0, 0, 0);
        let target = GridCoord::new(10, -10, 10);
        let stepped = from.step_toward(target, 3, false);
        assert_eq!(stepped, GridCoord::new(3, -3, 0));
    }

    #[test]
    fn test_step_toward_exact_distance_does_not_snap() {
        let from = GridCoord::new(0, 0, 0);
        let target = GridCoord::new(2, 0, 0);
        // Distance equals the step: walk, don't snap
        assert_eq!(from.step_toward(target, 2, false), target);
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(
            ax in -1000i32..1000, ay in -1000i32..1000, az in -1000i32..1000,
            bx in -1000i32..1000, by in -1000i32..1000, bz in -1000i32..1000,
        ) {
            let a = GridCoord::new(ax, ay, az);
            let b = GridCoord::new(bx, by, bz);
            prop_assert_eq!(a.chebyshev(&b), b.chebyshev(&a));
        }

        #[test]
        fn prop_step_never_overshoots(
            ax in -100i32..100, ay in -100i32..100,
            bx in -100i32..100, by in -100i32..100,
            step in 1u32..20,
        ) {
            let a = GridCoord::new(ax, ay, 0);
            let b = GridCoord::new(bx, by, 0);
            let moved = a.step_toward(b, step, false);
            prop_assert!(moved.chebyshev(&b) <= a.chebyshev(&b));
            prop_assert!(a.chebyshev(&moved) <= step);
        }
    }
}
