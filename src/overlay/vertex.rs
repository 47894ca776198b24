//! Vertex type for debug line lists

use bytemuck::{Pod, Zeroable};

/// 2D line vertex with position and color, laid out for direct upload
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }
}

/// `0xRRGGBB` to linear RGBA
pub const fn rgb(hex: u32, alpha: f32) -> [f32; 4] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
        alpha,
    ]
}

/// Colors for overlay shapes
pub mod colors {
    use super::rgb;

    pub const OBSTRUCTION: [f32; 4] = rgb(0xaaaaaa, 1.0);
    pub const OBSTRUCTION_INACTIVE: [f32; 4] = rgb(0xaaaaaa, 0.25);
    pub const ZONE: [f32; 4] = rgb(0xffffff, 0.8);
    pub const ACTOR_MOVING: [f32; 4] = rgb(0x33aaaa, 1.0);
    pub const ACTOR_STATIONARY: [f32; 4] = rgb(0xaa33aa, 1.0);
    pub const TRIGGER: [f32; 4] = rgb(0xddaa33, 0.6);
}
