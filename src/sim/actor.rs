//! Actors and their handles

use std::collections::BTreeMap;
use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::behavior::Behavior;
use super::layer::LayerId;
use crate::consts::{DEFAULT_ACTOR_RADIUS, DEFAULT_ACTOR_SPEED};
use crate::normalize_heading;

/// Stable handle to an actor slot in the world arena.
///
/// The generation changes every time a slot is reused, so a handle kept past
/// `destroy_actor` never resolves to the slot's next occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl ActorId {
    pub fn index(&self) -> u32 {
        self.index
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

/// Sprite animation an external renderer should show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Animation {
    #[default]
    Stand,
    Walk,
}

/// Callback consulted before an actor is pushed. Receives the pusher;
/// returning false vetoes the push.
pub type PushGate = Box<dyn FnMut(ActorId) -> bool>;

/// A mobile body on a layer
pub struct Actor {
    /// Authored id used for world lookups; not required to be unique by name
    pub key: Option<String>,
    pub name: String,
    pub position: DVec2,
    pub radius: f64,
    /// Movement speed in world units per second
    pub speed: f64,
    pub solid: bool,
    /// Resistance to being pushed; infinite means immovable
    pub push_weight: f64,
    pub push_strength: f64,
    pub respects_obstructions: bool,
    pub triggers_events: bool,
    /// Facing heading in degrees, [0, 360)
    pub facing: f64,
    pub animation: Animation,
    pub emote: Option<String>,
    /// Free-form authoring parameters (`vision`, `notice`, ...)
    pub params: BTreeMap<String, serde_json::Value>,
    pub(crate) stationary: bool,
    pub(crate) moved_last_frame: bool,
    pub(crate) push_gate: Option<PushGate>,
    pub(crate) behavior: Option<Behavior>,
    pub(crate) layer: LayerId,
}

impl Actor {
    pub fn new(name: impl Into<String>, position: DVec2) -> Self {
        Self {
            key: None,
            name: name.into(),
            position,
            radius: DEFAULT_ACTOR_RADIUS,
            speed: DEFAULT_ACTOR_SPEED,
            solid: true,
            push_weight: f64::INFINITY,
            push_strength: 0.0,
            respects_obstructions: true,
            triggers_events: false,
            facing: 0.0,
            animation: Animation::Stand,
            emote: None,
            params: BTreeMap::new(),
            stationary: true,
            moved_last_frame: false,
            push_gate: None,
            behavior: None,
            layer: LayerId(0),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_solid(mut self, solid: bool) -> Self {
        self.solid = solid;
        self
    }

    pub fn with_push(mut self, weight: f64, strength: f64) -> Self {
        self.push_weight = weight;
        self.push_strength = strength;
        self
    }

    pub fn with_triggers_events(mut self, triggers: bool) -> Self {
        self.triggers_events = triggers;
        self
    }

    pub fn with_facing(mut self, degrees: f64) -> Self {
        self.facing = normalize_heading(degrees);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    pub fn with_behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Layer this actor is currently listed on
    pub fn layer(&self) -> LayerId {
        self.layer
    }

    /// Whether the actor stood still through the previous frame.
    /// Stationary actors collide as squares, moving ones as circles.
    pub fn is_stationary(&self) -> bool {
        self.stationary
    }

    pub fn moved_last_frame(&self) -> bool {
        self.moved_last_frame
    }

    pub fn behavior(&self) -> Option<&Behavior> {
        self.behavior.as_ref()
    }

    pub fn set_push_gate(&mut self, gate: impl FnMut(ActorId) -> bool + 'static) {
        self.push_gate = Some(Box::new(gate));
    }

    pub fn clear_push_gate(&mut self) {
        self.push_gate = None;
    }

    pub fn param_f64(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(serde_json::Value::as_f64)
    }

    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(serde_json::Value::as_str)
    }

    /// Offset to the tile the actor faces, snapped to the nearest cardinal
    pub fn facing_tile_offset(&self, tile_size: DVec2) -> DVec2 {
        let dir = normalize_heading(self.facing);
        if !(45.0..315.0).contains(&dir) {
            DVec2::new(tile_size.x, 0.0)
        } else if dir < 135.0 {
            DVec2::new(0.0, tile_size.y)
        } else if dir < 225.0 {
            DVec2::new(-tile_size.x, 0.0)
        } else {
            DVec2::new(0.0, -tile_size.y)
        }
    }
}

impl fmt::Debug for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actor")
            .field("key", &self.key)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("radius", &self.radius)
            .field("solid", &self.solid)
            .field("push_weight", &self.push_weight)
            .field("push_strength", &self.push_strength)
            .field("stationary", &self.stationary)
            .field("layer", &self.layer)
            .field("behavior", &self.behavior)
            .field("push_gate", &self.push_gate.is_some())
            .finish_non_exhaustive()
    }
}
