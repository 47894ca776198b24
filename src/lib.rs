//! Zone Slide - movement resolution for tile-based 2D worlds
//!
//! Core modules:
//! - `sim`: Frame-stepped simulation (obstructions, boundary synthesis, slide resolver, behaviors)
//! - `overlay`: Read-only debug shapes and line vertices
//! - `mapdef`: Authoring definitions consumed from map loaders
//! - `settings`: Data-driven world configuration
//! - `error`: Errors for load-time and handle operations

pub mod error;
pub mod mapdef;
pub mod overlay;
pub mod settings;
pub mod sim;

pub use error::WorldError;
pub use settings::Settings;

use glam::DVec2;

/// Simulation constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f64 = 1.0 / 60.0;

    /// Maximum correction passes per slide call
    pub const MAX_SLIDE_ITERATIONS: u32 = 20;
    /// Travelled fraction at which a slide counts as complete
    pub const TRAVEL_COMPLETE: f64 = 0.999;
    /// Maximum nesting of actor-pushes-actor chains within one slide
    pub const MAX_PUSH_DEPTH: u32 = 8;
    /// Actors farther than this multiple of the combined radii are skipped early
    pub const NEAR_ACTOR_FACTOR: f64 = 1.5;

    /// Default tile size in world units
    pub const DEFAULT_TILE_SIZE: f64 = 16.0;
    /// Actor defaults
    pub const DEFAULT_ACTOR_RADIUS: f64 = 8.0;
    pub const DEFAULT_ACTOR_SPEED: f64 = 100.0;
    /// Speed a pursuing actor switches to
    pub const CHASE_SPEED: f64 = 100.0;

    /// Tolerance for point-on-edge tests
    pub const GEOM_EPSILON: f64 = 1e-9;
}

/// Normalize a heading in degrees to [0, 360). Non-finite input yields NaN.
#[inline]
pub fn normalize_heading(degrees: f64) -> f64 {
    let h = degrees.rem_euclid(360.0);
    // Tiny negatives round up to the modulus
    if h >= 360.0 { 0.0 } else { h }
}

/// Unit vector for a heading in degrees (0 = +x, 90 = +y)
#[inline]
pub fn heading_to_vec(degrees: f64) -> DVec2 {
    let rad = degrees.to_radians();
    DVec2::new(rad.cos(), rad.sin())
}

/// Heading in degrees of a displacement, in (-180, 180]
#[inline]
pub fn vec_to_heading(v: DVec2) -> f64 {
    v.y.atan2(v.x).to_degrees()
}

/// Discrete tile coordinate containing a world position
#[inline]
pub fn tile_coord(pos: DVec2, tile_size: DVec2) -> (i64, i64) {
    (
        (pos.x / tile_size.x).floor() as i64,
        (pos.y / tile_size.y).floor() as i64,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_heading() {
        assert_eq!(normalize_heading(-90.0), 270.0);
        assert_eq!(normalize_heading(450.0), 90.0);
        assert_eq!(normalize_heading(0.0), 0.0);
        assert_eq!(normalize_heading(-720.0), 0.0);
        let h = normalize_heading(-1e-20);
        assert!((0.0..360.0).contains(&h));
    }

    #[test]
    fn test_normalize_heading_non_finite_returns() {
        assert!(normalize_heading(f64::INFINITY).is_nan());
        assert!(normalize_heading(f64::NEG_INFINITY).is_nan());
        assert!(normalize_heading(f64::NAN).is_nan());
    }

    #[test]
    fn test_heading_round_trip() {
        let v = heading_to_vec(90.0);
        assert!(v.x.abs() < 1e-12);
        assert!((v.y - 1.0).abs() < 1e-12);
        assert!((vec_to_heading(DVec2::new(0.0, -3.0)) + 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_tile_coord_floors_negative() {
        let ts = DVec2::splat(16.0);
        assert_eq!(tile_coord(DVec2::new(15.9, 16.0), ts), (0, 1));
        assert_eq!(tile_coord(DVec2::new(-0.1, 0.0), ts), (-1, 0));
    }
}
