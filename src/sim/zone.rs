//! Authored regions: polygon zones, tile events and triggers

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::geometry::{Polygon, Rect};
use super::obstruction::ObstructionId;

/// Flag name that marks a zone as part of the walkable area
pub const WALKABLE_FLAG: &str = "walkable";

/// Handler names fired when an event-triggering actor crosses a zone boundary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneEvents {
    #[serde(default, rename = "onEnter")]
    pub on_enter: Option<String>,
    #[serde(default, rename = "onExit")]
    pub on_exit: Option<String>,
}

/// A named polygon region with flags and optional enter/exit hooks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub polygon: Polygon,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub events: Option<ZoneEvents>,
}

impl Zone {
    pub fn new(name: impl Into<String>, points: Vec<DVec2>) -> Self {
        Self {
            name: name.into(),
            polygon: Polygon::new(points),
            flags: BTreeMap::new(),
            events: None,
        }
    }

    /// Builder-style flag setter
    pub fn with_flag(mut self, flag: impl Into<String>, value: bool) -> Self {
        self.flags.insert(flag.into(), value);
        self
    }

    pub fn with_events(mut self, events: ZoneEvents) -> Self {
        self.events = Some(events);
        self
    }

    pub fn flag(&self, flag: &str) -> Option<bool> {
        self.flags.get(flag).copied()
    }

    /// True only when the zone explicitly carries `walkable = true`
    pub fn is_walkable(&self) -> bool {
        self.flag(WALKABLE_FLAG).unwrap_or(false)
    }

    pub fn has_events(&self) -> bool {
        self.events.is_some()
    }

    pub fn contains(&self, p: DVec2) -> bool {
        self.polygon.contains(p)
    }
}

fn default_true() -> bool {
    true
}

/// A rectangle region bound to a handler name.
///
/// Used both for tile events (fired when an actor steps into a new tile inside
/// the rectangle) and for triggers (fired by interacting with the rectangle).
/// A solid region owns references to obstructions that follow its solidity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectEvent {
    pub name: String,
    pub rect: Rect,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    solid: bool,
    #[serde(default)]
    pub obstructions: Vec<ObstructionId>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

impl RectEvent {
    pub fn new(name: impl Into<String>, rect: Rect) -> Self {
        Self {
            name: name.into(),
            rect,
            active: true,
            solid: true,
            obstructions: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    pub fn with_obstructions(mut self, obstructions: Vec<ObstructionId>) -> Self {
        self.obstructions = obstructions;
        self
    }

    pub fn solid(&self) -> bool {
        self.solid
    }

    /// Record the new solidity. The owning layer applies it to the referenced
    /// obstructions; see `Layer::set_event_solid`.
    pub(crate) fn set_solid_flag(&mut self, solid: bool) {
        self.solid = solid;
    }

    /// Tile-space rectangle `(tx, ty, tw, th)`
    pub fn tile_rect(&self, tile_size: DVec2) -> (i64, i64, i64, i64) {
        (
            (self.rect.x / tile_size.x).floor() as i64,
            (self.rect.y / tile_size.y).floor() as i64,
            (self.rect.width / tile_size.x).floor() as i64,
            (self.rect.height / tile_size.y).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkable_requires_explicit_flag() {
        let pts = vec![DVec2::ZERO, DVec2::X, DVec2::ONE];
        assert!(!Zone::new("a", pts.clone()).is_walkable());
        assert!(!Zone::new("b", pts.clone()).with_flag(WALKABLE_FLAG, false).is_walkable());
        assert!(Zone::new("c", pts).with_flag(WALKABLE_FLAG, true).is_walkable());
    }

    #[test]
    fn test_zone_events_deserialize_camel_case() {
        let ev: ZoneEvents = serde_json::from_str(r#"{"onEnter":"door"}"#).unwrap();
        assert_eq!(ev.on_enter.as_deref(), Some("door"));
        assert!(ev.on_exit.is_none());
    }

    #[test]
    fn test_tile_rect() {
        let ev = RectEvent::new("chest", Rect::new(32.0, 48.0, 32.0, 16.0));
        assert_eq!(ev.tile_rect(DVec2::splat(16.0)), (2, 3, 2, 1));
        assert!(ev.solid());
        assert!(ev.active);
    }
}
