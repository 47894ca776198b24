//! Planar geometry for zones, obstructions and contact tests
//!
//! Polygons are implicitly closed point rings. Rectangles are half-open on
//! their far edges, so adjacent tile rectangles never both contain a point.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::GEOM_EPSILON;

/// Closest point to `p` on the segment `a`-`b`
pub fn closest_point_on_segment(p: DVec2, a: DVec2, b: DVec2) -> DVec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `p` to the segment `a`-`b`
#[inline]
pub fn dist_to_segment(p: DVec2, a: DVec2, b: DVec2) -> f64 {
    p.distance(closest_point_on_segment(p, a, b))
}

/// Intersection points of segments `a1`-`a2` and `b1`-`b2`.
///
/// Crossing or touching segments yield one point. Colinear overlapping
/// segments yield every endpoint of either segment that lies on the other,
/// which is what splits partially shared polygon edges.
pub fn segment_intersections(a1: DVec2, a2: DVec2, b1: DVec2, b2: DVec2) -> Vec<DVec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let qp = b1 - a1;
    let denom = r.perp_dot(s);

    if denom == 0.0 {
        if qp.perp_dot(r) != 0.0 || qp.perp_dot(s) != 0.0 {
            // Parallel, never meeting
            return Vec::new();
        }
        let mut points = Vec::new();
        for p in [b1, b2] {
            if within_colinear(p, a1, a2) && !points.contains(&p) {
                points.push(p);
            }
        }
        for p in [a1, a2] {
            if within_colinear(p, b1, b2) && !points.contains(&p) {
                points.push(p);
            }
        }
        return points;
    }

    let t = qp.perp_dot(s) / denom;
    let u = qp.perp_dot(r) / denom;
    if !(0.0..=1.0).contains(&t) || !(0.0..=1.0).contains(&u) {
        return Vec::new();
    }

    // Endpoint hits reuse the exact endpoint so later equality checks see it
    let point = match (t, u) {
        (t, _) if t == 0.0 => a1,
        (t, _) if t == 1.0 => a2,
        (_, u) if u == 0.0 => b1,
        (_, u) if u == 1.0 => b2,
        _ => snap_to(a1 + r * t, [a1, a2, b1, b2]),
    };
    vec![point]
}

/// Whether `p`, known to be colinear with `a`-`b`, lies within the segment
fn within_colinear(p: DVec2, a: DVec2, b: DVec2) -> bool {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return p == a;
    }
    let t = (p - a).dot(ab);
    (0.0..=len_sq).contains(&t)
}

fn snap_to(p: DVec2, candidates: [DVec2; 4]) -> DVec2 {
    candidates
        .into_iter()
        .find(|c| c.distance_squared(p) < GEOM_EPSILON * GEOM_EPSILON)
        .unwrap_or(p)
}

/// Axis-aligned rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Half-open containment: the left/top edges are inside, right/bottom are not
    pub fn contains(&self, p: DVec2) -> bool {
        if self.width <= 0.0 || self.height <= 0.0 {
            return false;
        }
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }
}

/// A closed polygon ring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub points: Vec<DVec2>,
}

impl Polygon {
    pub fn new(points: Vec<DVec2>) -> Self {
        Self { points }
    }

    /// Directed edges, closing edge first, then in ring order
    pub fn edges(&self) -> impl Iterator<Item = (DVec2, DVec2)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| {
            let prev = if i == 0 { n - 1 } else { i - 1 };
            (self.points[prev], self.points[i])
        })
    }

    /// Even-odd containment test. Points on the boundary may land either side;
    /// callers that care test [`Polygon::edge_at`] first.
    pub fn contains(&self, p: DVec2) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let cross_x = (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x;
                if p.x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// The first edge (in [`Polygon::edges`] order) that `p` lies on
    pub fn edge_at(&self, p: DVec2) -> Option<(DVec2, DVec2)> {
        self.edges()
            .find(|&(a, b)| a != b && dist_to_segment(p, a, b) <= GEOM_EPSILON)
    }

    /// Twice the signed area; positive when the ring turns clockwise on a
    /// y-down screen (counter-clockwise in y-up math convention)
    pub fn signed_area2(&self) -> f64 {
        self.edges().map(|(a, b)| a.perp_dot(b)).sum()
    }

    /// Copy of this polygon wound clockwise in y-down screen space
    pub fn clockwise(&self) -> Self {
        let mut points = self.points.clone();
        if self.signed_area2() < 0.0 {
            points.reverse();
        }
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        Polygon::new(vec![
            DVec2::new(x, y),
            DVec2::new(x + size, y),
            DVec2::new(x + size, y + size),
            DVec2::new(x, y + size),
        ])
    }

    #[test]
    fn test_closest_point_clamps_to_ends() {
        let a = DVec2::new(0.0, 0.0);
        let b = DVec2::new(10.0, 0.0);
        assert_eq!(closest_point_on_segment(DVec2::new(-5.0, 3.0), a, b), a);
        assert_eq!(closest_point_on_segment(DVec2::new(15.0, 3.0), a, b), b);
        assert_eq!(
            closest_point_on_segment(DVec2::new(4.0, 3.0), a, b),
            DVec2::new(4.0, 0.0)
        );
        assert_eq!(dist_to_segment(DVec2::new(4.0, 3.0), a, b), 3.0);
    }

    #[test]
    fn test_crossing_segments() {
        let hits = segment_intersections(
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(0.0, 10.0),
            DVec2::new(10.0, 0.0),
        );
        assert_eq!(hits, vec![DVec2::new(5.0, 5.0)]);
    }

    #[test]
    fn test_touching_segments_reuse_endpoint() {
        let hits = segment_intersections(
            DVec2::new(0.1, 0.1),
            DVec2::new(0.3, 0.7),
            DVec2::new(0.3, 0.7),
            DVec2::new(0.9, 0.2),
        );
        assert_eq!(hits, vec![DVec2::new(0.3, 0.7)]);
    }

    #[test]
    fn test_colinear_overlap_yields_inner_endpoints() {
        let hits = segment_intersections(
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(5.0, 0.0),
            DVec2::new(20.0, 0.0),
        );
        assert_eq!(hits, vec![DVec2::new(5.0, 0.0), DVec2::new(10.0, 0.0)]);
    }

    #[test]
    fn test_parallel_and_disjoint() {
        assert!(
            segment_intersections(
                DVec2::new(0.0, 0.0),
                DVec2::new(10.0, 0.0),
                DVec2::new(0.0, 1.0),
                DVec2::new(10.0, 1.0),
            )
            .is_empty()
        );
        assert!(
            segment_intersections(
                DVec2::new(0.0, 0.0),
                DVec2::new(1.0, 0.0),
                DVec2::new(2.0, -1.0),
                DVec2::new(2.0, 1.0),
            )
            .is_empty()
        );
    }

    #[test]
    fn test_polygon_contains() {
        let sq = square(0.0, 0.0, 10.0);
        assert!(sq.contains(DVec2::new(5.0, 5.0)));
        assert!(!sq.contains(DVec2::new(15.0, 5.0)));
        assert!(!sq.contains(DVec2::new(-1.0, 5.0)));
    }

    #[test]
    fn test_polygon_edge_at_reports_directed_edge() {
        let sq = square(0.0, 0.0, 10.0);
        let edge = sq.edge_at(DVec2::new(10.0, 5.0));
        assert_eq!(edge, Some((DVec2::new(10.0, 0.0), DVec2::new(10.0, 10.0))));
        assert!(sq.edge_at(DVec2::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_clockwise_normalizes_winding() {
        let sq = square(0.0, 0.0, 10.0);
        let mut reversed = sq.clone();
        reversed.points.reverse();
        assert!(sq.signed_area2() > 0.0);
        assert!(reversed.signed_area2() < 0.0);
        assert_eq!(reversed.clockwise().signed_area2(), sq.signed_area2());
    }

    #[test]
    fn test_rect_half_open() {
        let r = Rect::new(0.0, 0.0, 16.0, 16.0);
        assert!(r.contains(DVec2::new(0.0, 0.0)));
        assert!(!r.contains(DVec2::new(16.0, 8.0)));
        assert!(!Rect::new(0.0, 0.0, 0.0, 5.0).contains(DVec2::ZERO));
    }
}
