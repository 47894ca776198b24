//! Debug overlay
//!
//! Read-only projection of a layer into outline shapes: obstructions as
//! segments, zones and triggers as polygons, and actors as the shape they
//! collide as (a circle while moving, a square while stationary). Nothing
//! here feeds back into the simulation.

pub mod shapes;
pub mod vertex;

pub use vertex::{Vertex, colors};

use glam::DVec2;

use crate::sim::{LayerId, World};

/// Chords used for actor circles
const CIRCLE_SEGMENTS: u32 = 24;

/// One outline to draw
#[derive(Debug, Clone, PartialEq)]
pub enum DebugShape {
    Segment {
        a: DVec2,
        b: DVec2,
        color: [f32; 4],
    },
    Circle {
        center: DVec2,
        radius: f64,
        color: [f32; 4],
    },
    Polygon {
        points: Vec<DVec2>,
        color: [f32; 4],
    },
}

impl DebugShape {
    /// Line-list vertices for this shape
    pub fn vertices(&self) -> Vec<Vertex> {
        match self {
            DebugShape::Segment { a, b, color } => shapes::segment(*a, *b, *color).to_vec(),
            DebugShape::Circle {
                center,
                radius,
                color,
            } => shapes::circle(*center, *radius, *color, CIRCLE_SEGMENTS),
            DebugShape::Polygon { points, color } => shapes::polyline(points, true, *color),
        }
    }
}

/// Every overlay shape for one layer: zones, triggers, obstructions, then actors
pub fn collect(world: &World, layer: LayerId) -> Vec<DebugShape> {
    let Some(l) = world.layer(layer) else {
        return Vec::new();
    };
    let mut out = Vec::new();

    for zone in l.zones() {
        out.push(DebugShape::Polygon {
            points: zone.polygon.points.clone(),
            color: colors::ZONE,
        });
    }
    for trigger in &l.triggers {
        let r = trigger.rect;
        out.push(DebugShape::Polygon {
            points: vec![
                DVec2::new(r.x, r.y),
                DVec2::new(r.x + r.width, r.y),
                DVec2::new(r.x + r.width, r.y + r.height),
                DVec2::new(r.x, r.y + r.height),
            ],
            color: colors::TRIGGER,
        });
    }
    for o in l.obstructions() {
        out.push(DebugShape::Segment {
            a: o.a(),
            b: o.b(),
            color: if o.active {
                colors::OBSTRUCTION
            } else {
                colors::OBSTRUCTION_INACTIVE
            },
        });
    }
    for &id in l.actors() {
        let Some(actor) = world.actor(id) else {
            continue;
        };
        let (p, r) = (actor.position, actor.radius);
        if actor.is_stationary() {
            out.push(DebugShape::Polygon {
                points: vec![
                    DVec2::new(p.x - r, p.y - r),
                    DVec2::new(p.x + r, p.y - r),
                    DVec2::new(p.x + r, p.y + r),
                    DVec2::new(p.x - r, p.y + r),
                ],
                color: colors::ACTOR_STATIONARY,
            });
        } else {
            out.push(DebugShape::Circle {
                center: p,
                radius: r,
                color: colors::ACTOR_MOVING,
            });
        }
    }
    out
}

/// Flatten shapes into one line list
pub fn line_vertices(shapes: &[DebugShape]) -> Vec<Vertex> {
    shapes.iter().flat_map(DebugShape::vertices).collect()
}
