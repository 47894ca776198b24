//! Map definitions
//!
//! The serde shapes a map loader hands over: layers of zones, explicit
//! obstructions, tile events, triggers and actors. [`World::from_map_def`]
//! turns a definition into a live world, building each layer's boundary once
//! after everything on it is in place.

use std::collections::BTreeMap;
use std::path::Path;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::settings::Settings;
use crate::sim::{Actor, Layer, LayerId, Obstruction, Rect, RectEvent, World, Zone, ZoneEvents};

fn default_true() -> bool {
    true
}

/// A whole map
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MapDef {
    /// Layers bottom first
    #[serde(default)]
    pub layers: Vec<LayerDef>,
    /// Key of the actor driven by player input
    #[serde(default)]
    pub player: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerDef {
    pub name: String,
    #[serde(default = "default_true")]
    pub walkable: bool,
    #[serde(default)]
    pub zones: Vec<ZoneDef>,
    #[serde(default)]
    pub obstructions: Vec<ObstructionDef>,
    #[serde(default)]
    pub events: Vec<RectDef>,
    #[serde(default)]
    pub triggers: Vec<RectDef>,
    #[serde(default)]
    pub actors: Vec<ActorDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub points: Vec<[f64; 2]>,
    #[serde(default)]
    pub flags: BTreeMap<String, bool>,
    #[serde(default)]
    pub events: Option<ZoneEvents>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstructionDef {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A tile event or trigger rectangle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RectDef {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_true")]
    pub solid: bool,
    /// Names of explicit obstructions on the same layer that follow `solid`
    #[serde(default)]
    pub obstructions: Vec<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorDef {
    /// Lookup key, unique across the map
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub radius: Option<f64>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default = "default_true")]
    pub solid: bool,
    /// Missing means immovable
    #[serde(default)]
    pub push_weight: Option<f64>,
    #[serde(default)]
    pub push_strength: f64,
    #[serde(default = "default_true")]
    pub respects_obstructions: bool,
    #[serde(default)]
    pub triggers_events: bool,
    #[serde(default)]
    pub facing: f64,
    /// Registered behavior name
    #[serde(default)]
    pub behavior: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
}

impl MapDef {
    pub fn from_json_str(json: &str) -> Result<Self, WorldError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, WorldError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let def = Self::from_json_str(&text)?;
        log::info!(
            "Loaded map {} ({} layers)",
            path.as_ref().display(),
            def.layers.len()
        );
        Ok(def)
    }
}

impl ZoneDef {
    /// The zone, wound clockwise
    pub fn to_zone(&self) -> Zone {
        let points = self.points.iter().map(|&[x, y]| DVec2::new(x, y)).collect();
        let mut zone = Zone::new(self.name.clone(), points);
        zone.polygon = zone.polygon.clockwise();
        zone.flags = self.flags.clone();
        zone.events = self.events.clone();
        zone
    }
}

impl ObstructionDef {
    pub fn to_obstruction(&self) -> Obstruction {
        let a = DVec2::new(self.x1, self.y1);
        let b = DVec2::new(self.x2, self.y2);
        let mut o = match &self.name {
            Some(name) => Obstruction::named(a, b, name.clone()),
            None => Obstruction::new(a, b),
        };
        o.active = self.active;
        o
    }
}

impl ActorDef {
    pub fn to_actor(&self, settings: &Settings) -> Actor {
        let mut actor = Actor::new(self.name.clone(), DVec2::new(self.x, self.y))
            .with_radius(self.radius.unwrap_or(settings.actor_radius))
            .with_speed(self.speed.unwrap_or(settings.actor_speed))
            .with_solid(self.solid)
            .with_push(self.push_weight.unwrap_or(f64::INFINITY), self.push_strength)
            .with_triggers_events(self.triggers_events)
            .with_facing(self.facing);
        actor.key = self.id.clone();
        actor.respects_obstructions = self.respects_obstructions;
        actor.params = self.params.clone();
        actor
    }
}

/// Build a tile event or trigger, resolving obstruction names on `layer`
fn rect_event(layer: &Layer, def: &RectDef) -> RectEvent {
    let mut owned = Vec::new();
    for name in &def.obstructions {
        let ids = layer.obstruction_ids_by_name(name);
        if ids.is_empty() {
            log::warn!("layer {}: {} names unknown obstruction {name}", layer.name, def.name);
        }
        owned.extend(ids);
    }
    let mut ev = RectEvent::new(def.name.clone(), Rect::new(def.x, def.y, def.width, def.height))
        .with_obstructions(owned);
    ev.active = def.active;
    ev.properties = def.properties.clone();
    ev
}

impl World {
    /// Build a world from a map definition
    pub fn from_map_def(def: &MapDef, settings: Settings) -> Result<World, WorldError> {
        let mut world = World::new(settings);

        for layer_def in &def.layers {
            let mut layer = Layer::new(layer_def.name.clone());
            layer.walkable = layer_def.walkable;
            layer.freeze_obstructions();

            for zone in &layer_def.zones {
                layer.add_zone(zone.to_zone());
            }
            for o in &layer_def.obstructions {
                layer.add_obstruction(o.to_obstruction());
            }
            for ev in &layer_def.events {
                let event = rect_event(&layer, ev);
                let idx = layer.add_event(event);
                layer.set_event_solid(idx, ev.solid);
            }
            for tr in &layer_def.triggers {
                let trigger = rect_event(&layer, tr);
                let idx = layer.add_trigger(trigger);
                layer.set_trigger_solid(idx, tr.solid);
            }

            layer.unfreeze_obstructions();
            layer.rebuild_obstructions();
            log::info!(
                "layer {}: {} zones, {} obstructions, {} events, {} triggers",
                layer.name,
                layer.zones().len(),
                layer.obstruction_count(),
                layer.events.len(),
                layer.triggers.len()
            );
            let layer_id = world.add_layer(layer);
            world.spawn_layer_actors(layer_id, &layer_def.actors)?;
        }

        if let Some(key) = &def.player {
            let player = world
                .actor_by_key(key)
                .ok_or_else(|| WorldError::UnknownActor(key.clone()))?;
            world.set_player(Some(player));
        }
        Ok(world)
    }

    fn spawn_layer_actors(&mut self, layer: LayerId, defs: &[ActorDef]) -> Result<(), WorldError> {
        for def in defs {
            let actor = def.to_actor(self.settings());
            let id = self.spawn_actor(layer, actor)?;
            if let Some(name) = &def.behavior {
                self.assign_behavior(id, name);
            }
        }
        Ok(())
    }
}
