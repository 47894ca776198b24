//! Boundary synthesis: walkable zone polygons -> exterior obstructions
//!
//! The walkable area of a layer is the union of its walkable zones. Edges are
//! swept left to right; every edge is split wherever another edge crosses or
//! overlaps it, and each resulting piece survives only if it is not interior
//! to the union. Two zones that share an edge traverse it in opposite
//! directions (all zones on a layer share one winding), which is how a shared
//! boundary is told apart from a polygon nested against another's outline.

use std::cmp::Ordering;

use glam::DVec2;

use super::geometry::{Polygon, segment_intersections};
use super::obstruction::Obstruction;
use super::zone::Zone;

/// A directed polygon edge tagged with its owning shape
#[derive(Debug, Clone, Copy)]
struct Edge {
    a: DVec2,
    b: DVec2,
    shape: usize,
}

/// One endpoint of an edge, as seen by the sweep
#[derive(Debug, Clone, Copy)]
struct Endpoint {
    pt: DVec2,
    edge: usize,
}

/// Computes the minimal obstruction set bounding a layer's walkable zones
pub struct BoundaryBuilder<'a> {
    shapes: Vec<&'a Polygon>,
}

impl<'a> BoundaryBuilder<'a> {
    /// Collect the walkable zones; everything else is ignored
    pub fn new(zones: &'a [Zone]) -> Self {
        let shapes = zones
            .iter()
            .filter(|z| z.is_walkable())
            .map(|z| &z.polygon)
            .collect();
        Self { shapes }
    }

    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Run the sweep and return the exterior boundary segments
    pub fn build(&self) -> Vec<Obstruction> {
        let (edges, mut endpoints) = self.decompose();

        // Left to right, then top to bottom; stable so ties keep input order
        endpoints.sort_by(|p, q| {
            p.pt.x
                .partial_cmp(&q.pt.x)
                .unwrap_or(Ordering::Equal)
                .then_with(|| p.pt.y.partial_cmp(&q.pt.y).unwrap_or(Ordering::Equal))
        });

        let mut splits: Vec<Vec<DVec2>> = vec![Vec::new(); edges.len()];
        let mut active: Vec<usize> = Vec::new();
        let mut out = Vec::new();

        for endpoint in &endpoints {
            let Some(slot) = active.iter().position(|&e| e == endpoint.edge) else {
                active.push(endpoint.edge);
                continue;
            };
            active.remove(slot);

            let idx = endpoint.edge;
            let edge = edges[idx];
            for &other in &active {
                let o = edges[other];
                for p in segment_intersections(edge.a, edge.b, o.a, o.b) {
                    splits[idx].push(p);
                    splits[other].push(p);
                }
            }

            let vertices = std::mem::take(&mut splits[idx]);
            self.emit_pieces(edge, vertices, &mut out);
        }

        log::debug!(
            "boundary: {} shapes, {} edges -> {} obstructions",
            self.shapes.len(),
            edges.len(),
            out.len()
        );
        out
    }

    /// Break every walkable polygon into edges and endpoint records.
    /// Zero-length edges (duplicate consecutive points) are dropped here.
    fn decompose(&self) -> (Vec<Edge>, Vec<Endpoint>) {
        let mut edges = Vec::new();
        let mut endpoints = Vec::new();
        for (shape, poly) in self.shapes.iter().enumerate() {
            for (a, b) in poly.edges() {
                if a == b {
                    continue;
                }
                let edge = edges.len();
                edges.push(Edge { a, b, shape });
                endpoints.push(Endpoint { pt: a, edge });
                endpoints.push(Endpoint { pt: b, edge });
            }
        }
        (edges, endpoints)
    }

    /// Split `edge` at its recorded vertices and keep the exterior pieces
    fn emit_pieces(&self, edge: Edge, mut vertices: Vec<DVec2>, out: &mut Vec<Obstruction>) {
        vertices.push(edge.a);
        vertices.push(edge.b);
        // Ordering by distance from the start keeps the edge's direction
        vertices.sort_by(|p, q| {
            p.distance_squared(edge.a)
                .partial_cmp(&q.distance_squared(edge.a))
                .unwrap_or(Ordering::Equal)
        });

        for pair in vertices.windows(2) {
            let (start, end) = (pair[0], pair[1]);
            if start == end {
                continue;
            }
            if self.is_interior(start, end, edge.shape) {
                log::trace!("boundary: drop {start} -> {end}");
                continue;
            }
            if out.iter().any(|o| o.a() == start && o.b() == end) {
                continue;
            }
            log::trace!("boundary: keep {start} -> {end}");
            out.push(Obstruction::new(start, end));
        }
    }

    /// Whether the piece `start`-`end` of a `shape` edge lies inside the union
    fn is_interior(&self, start: DVec2, end: DVec2, shape: usize) -> bool {
        let mid = (start + end) * 0.5;
        for (idx, poly) in self.shapes.iter().enumerate() {
            if idx == shape {
                continue;
            }
            match poly.edge_at(mid) {
                Some((oa, ob)) => {
                    if runs_opposite(start, end, oa, ob) {
                        return true;
                    }
                }
                None => {
                    if poly.contains(mid) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

/// Whether two coincident edges are traversed in opposite directions
fn runs_opposite(a1: DVec2, a2: DVec2, b1: DVec2, b2: DVec2) -> bool {
    (a1.x > a2.x) != (b1.x > b2.x) || (a1.y > a2.y) != (b1.y > b2.y)
}
