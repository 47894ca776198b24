//! Line-list generation for overlay primitives
//!
//! Every generator emits vertex pairs, one pair per line segment.

use glam::DVec2;
use std::f64::consts::PI;

use super::vertex::Vertex;

fn vertex(p: DVec2, color: [f32; 4]) -> Vertex {
    Vertex::new(p.x as f32, p.y as f32, color)
}

/// One segment
pub fn segment(a: DVec2, b: DVec2, color: [f32; 4]) -> [Vertex; 2] {
    [vertex(a, color), vertex(b, color)]
}

/// Circle outline approximated by `segments` chords
pub fn circle(center: DVec2, radius: f64, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    let segments = segments.max(3);
    let mut vertices = Vec::with_capacity((segments * 2) as usize);

    for i in 0..segments {
        let theta1 = (i as f64 / segments as f64) * 2.0 * PI;
        let theta2 = ((i + 1) as f64 / segments as f64) * 2.0 * PI;

        vertices.push(vertex(center + DVec2::from_angle(theta1) * radius, color));
        vertices.push(vertex(center + DVec2::from_angle(theta2) * radius, color));
    }

    vertices
}

/// Outline through `points`, joining the last point back to the first if `closed`
pub fn polyline(points: &[DVec2], closed: bool, color: [f32; 4]) -> Vec<Vertex> {
    if points.len() < 2 {
        return Vec::new();
    }
    let mut vertices = Vec::with_capacity(points.len() * 2);
    for pair in points.windows(2) {
        vertices.extend(segment(pair[0], pair[1], color));
    }
    if closed && points.len() > 2 {
        vertices.extend(segment(points[points.len() - 1], points[0], color));
    }
    vertices
}
