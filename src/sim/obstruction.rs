//! Line-segment obstructions

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::closest_point_on_segment;

/// Index of an explicit (authored) obstruction within its layer.
///
/// Explicit obstructions keep their index across boundary rebuilds, so
/// triggers and tile events can hold one to toggle the obstruction later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstructionId(pub usize);

/// One directed boundary segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstruction {
    a: DVec2,
    b: DVec2,
    pub active: bool,
    pub name: Option<String>,
}

impl Obstruction {
    pub fn new(a: DVec2, b: DVec2) -> Self {
        Self {
            a,
            b,
            active: true,
            name: None,
        }
    }

    pub fn named(a: DVec2, b: DVec2, name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(a, b)
        }
    }

    #[inline]
    pub fn a(&self) -> DVec2 {
        self.a
    }

    #[inline]
    pub fn b(&self) -> DVec2 {
        self.b
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    /// Closest point on the segment to `p`
    pub fn closest_point(&self, p: DVec2) -> DVec2 {
        closest_point_on_segment(p, self.a, self.b)
    }

    pub fn distance_to(&self, p: DVec2) -> f64 {
        p.distance(self.closest_point(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_active_and_unnamed() {
        let o = Obstruction::new(DVec2::ZERO, DVec2::new(0.0, 10.0));
        assert!(o.active);
        assert!(o.name.is_none());
        assert!(!o.is_degenerate());
        assert_eq!(o.distance_to(DVec2::new(3.0, 5.0)), 3.0);
    }

    #[test]
    fn test_named() {
        let o = Obstruction::named(DVec2::ZERO, DVec2::X, "gate");
        assert_eq!(o.name.as_deref(), Some("gate"));
    }
}
