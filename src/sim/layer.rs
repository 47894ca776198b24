//! Map layers: zones, obstructions, tile events, triggers and actor membership

use glam::DVec2;

use super::actor::ActorId;
use super::boundary::BoundaryBuilder;
use super::obstruction::{Obstruction, ObstructionId};
use super::zone::{RectEvent, Zone};

/// Index of a layer within the world, bottom first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct LayerId(pub usize);

/// One stacked plane of the map.
///
/// The obstruction list is the authored (explicit) obstructions followed by
/// the boundary generated from the walkable zones. Explicit obstructions keep
/// their indices across rebuilds.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    /// Whether actors can be transferred onto this layer by `layerUp`/`layerDown`
    pub walkable: bool,
    zones: Vec<Zone>,
    explicit: Vec<Obstruction>,
    generated: Vec<Obstruction>,
    frozen: bool,
    pub events: Vec<RectEvent>,
    pub triggers: Vec<RectEvent>,
    pub(crate) actors: Vec<ActorId>,
}

impl Layer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            walkable: true,
            zones: Vec::new(),
            explicit: Vec::new(),
            generated: Vec::new(),
            frozen: false,
            events: Vec::new(),
            triggers: Vec::new(),
            actors: Vec::new(),
        }
    }

    /// Defer rebuilds while zones and obstructions are bulk loaded
    pub fn freeze_obstructions(&mut self) {
        self.frozen = true;
    }

    /// Allow rebuilds again. Does not rebuild by itself.
    pub fn unfreeze_obstructions(&mut self) {
        self.frozen = false;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn add_zone(&mut self, zone: Zone) -> &Zone {
        if zone.polygon.points.len() < 3 {
            log::warn!(
                "layer {}: zone {} has {} points",
                self.name,
                zone.name,
                zone.polygon.points.len()
            );
        }
        self.zones.push(zone);
        if !self.frozen {
            self.rebuild_obstructions();
        }
        let idx = self.zones.len() - 1;
        &self.zones[idx]
    }

    /// Add an authored obstruction. Degenerate segments are dropped.
    pub fn add_obstruction(&mut self, obstruction: Obstruction) -> Option<ObstructionId> {
        if obstruction.is_degenerate() {
            log::warn!("layer {}: dropping zero-length obstruction", self.name);
            return None;
        }
        self.explicit.push(obstruction);
        if !self.frozen {
            self.rebuild_obstructions();
        }
        Some(ObstructionId(self.explicit.len() - 1))
    }

    /// Recompute the generated boundary from the walkable zones
    pub fn rebuild_obstructions(&mut self) {
        self.generated = BoundaryBuilder::new(&self.zones).build();
        log::debug!(
            "layer {}: {} explicit + {} generated obstructions",
            self.name,
            self.explicit.len(),
            self.generated.len()
        );
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Every obstruction, explicit first
    pub fn obstructions(&self) -> impl Iterator<Item = &Obstruction> {
        self.explicit.iter().chain(self.generated.iter())
    }

    pub fn obstruction_count(&self) -> usize {
        self.explicit.len() + self.generated.len()
    }

    pub fn obstruction(&self, id: ObstructionId) -> Option<&Obstruction> {
        self.explicit.get(id.0)
    }

    pub fn set_obstruction_active(&mut self, id: ObstructionId, active: bool) -> bool {
        match self.explicit.get_mut(id.0) {
            Some(o) => {
                o.active = active;
                true
            }
            None => false,
        }
    }

    pub fn actors(&self) -> &[ActorId] {
        &self.actors
    }

    pub fn add_event(&mut self, event: RectEvent) -> usize {
        self.events.push(event);
        self.events.len() - 1
    }

    pub fn add_trigger(&mut self, trigger: RectEvent) -> usize {
        self.triggers.push(trigger);
        self.triggers.len() - 1
    }

    /// Set a tile event's solidity and apply it to the obstructions it owns
    pub fn set_event_solid(&mut self, index: usize, solid: bool) {
        if let Some(ev) = self.events.get_mut(index) {
            ev.set_solid_flag(solid);
            let owned = ev.obstructions.clone();
            self.apply_solidity(&owned, solid);
        }
    }

    /// Set a trigger's solidity and apply it to the obstructions it owns
    pub fn set_trigger_solid(&mut self, index: usize, solid: bool) {
        if let Some(tr) = self.triggers.get_mut(index) {
            tr.set_solid_flag(solid);
            let owned = tr.obstructions.clone();
            self.apply_solidity(&owned, solid);
        }
    }

    fn apply_solidity(&mut self, owned: &[ObstructionId], solid: bool) {
        for &id in owned {
            if !self.set_obstruction_active(id, solid) {
                log::warn!("layer {}: no obstruction {:?}", self.name, id);
            }
        }
    }

    /// Zones with enter/exit hooks that contain `p`, as indices into `zones()`
    pub fn event_zones_at(&self, p: DVec2) -> Vec<usize> {
        self.zones
            .iter()
            .enumerate()
            .filter(|(_, z)| z.has_events() && z.contains(p))
            .map(|(i, _)| i)
            .collect()
    }

    /// Active tile events whose rectangle contains `p`
    pub fn events_at(&self, p: DVec2) -> impl Iterator<Item = &RectEvent> {
        self.events
            .iter()
            .filter(move |e| e.active && e.rect.contains(p))
    }

    /// Active triggers whose rectangle contains `p`
    pub fn triggers_at(&self, p: DVec2) -> impl Iterator<Item = &RectEvent> {
        self.triggers
            .iter()
            .filter(move |t| t.active && t.rect.contains(p))
    }

    pub fn triggers_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RectEvent> {
        self.triggers.iter().filter(move |t| t.name == name)
    }

    pub fn events_by_name<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RectEvent> {
        self.events.iter().filter(move |e| e.name == name)
    }

    /// Handles of the explicit obstructions carrying `name`
    pub fn obstruction_ids_by_name(&self, name: &str) -> Vec<ObstructionId> {
        self.explicit
            .iter()
            .enumerate()
            .filter(|(_, o)| o.name.as_deref() == Some(name))
            .map(|(i, _)| ObstructionId(i))
            .collect()
    }

    pub fn obstructions_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> impl Iterator<Item = &'a Obstruction> {
        self.obstructions()
            .filter(move |o| o.name.as_deref() == Some(name))
    }
}
