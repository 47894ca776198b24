//! World settings
//!
//! Loaded from JSON next to the map data. Every field has a default, so a
//! settings file only needs to name what it changes.

use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::consts::{CHASE_SPEED, DEFAULT_ACTOR_RADIUS, DEFAULT_ACTOR_SPEED, DEFAULT_TILE_SIZE};
use crate::error::WorldError;

/// World configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Map ===
    /// Tile width in world units
    pub tile_width: f64,
    /// Tile height in world units
    pub tile_height: f64,

    // === Simulation ===
    /// Seed for behavior RNGs
    pub seed: u64,
    /// Speed given to actors that don't specify one (units/sec)
    pub actor_speed: f64,
    /// Radius given to actors that don't specify one
    pub actor_radius: f64,
    /// Speed an actor switches to when it gives chase
    pub chase_speed: f64,

    // === Input ===
    /// Stick magnitudes below this are treated as no input
    pub deadzone: f64,

    // === Debug ===
    /// Emit debug overlay shapes each frame
    pub debug_overlay: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_SIZE,
            tile_height: DEFAULT_TILE_SIZE,

            seed: 0x5eed,
            actor_speed: DEFAULT_ACTOR_SPEED,
            actor_radius: DEFAULT_ACTOR_RADIUS,
            chase_speed: CHASE_SPEED,

            deadzone: 0.2,

            debug_overlay: false,
        }
    }
}

impl Settings {
    pub fn tile_size(&self) -> DVec2 {
        DVec2::new(self.tile_width, self.tile_height)
    }

    pub fn from_json_str(json: &str) -> Result<Self, WorldError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_json_str(&text)?;
        log::info!("Loaded settings from {}", path.as_ref().display());
        Ok(settings)
    }

    /// Load settings, falling back to defaults when the file is missing or bad
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path.as_ref()) {
            Ok(settings) => settings,
            Err(e) => {
                log::info!("Using default settings ({e})");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let s = Settings::from_json_str(r#"{"tile_width": 32, "seed": 7}"#).unwrap();
        assert_eq!(s.tile_size(), DVec2::new(32.0, 16.0));
        assert_eq!(s.seed, 7);
        assert_eq!(s.deadzone, 0.2);
        assert_eq!(s.chase_speed, CHASE_SPEED);
    }

    #[test]
    fn test_bad_json_is_error() {
        assert!(matches!(
            Settings::from_json_str("{not json"),
            Err(WorldError::Json(_))
        ));
    }

    #[test]
    fn test_missing_file_falls_back() {
        let s = Settings::load_or_default("/nonexistent/zone-slide/settings.json");
        assert_eq!(s, Settings::default());
    }
}
