//! World state: layers, the actor arena and the event plumbing between them
//!
//! Actors live in a generational arena owned by the world. Each layer keeps
//! only a membership list of handles, and each actor records the layer it is
//! on, so moving an actor between layers is two list updates and destroying
//! one drops it from every lookup before the call returns.

use std::collections::{HashMap, VecDeque};

use glam::DVec2;
use rand_pcg::Pcg32;

use super::actor::{Actor, ActorId};
use super::behavior::{AlertGate, Behavior, BehaviorRegistry, Stun};
use super::handlers::{EventContext, EventKind, HandlerTable};
use super::layer::{Layer, LayerId};
use super::obstruction::Obstruction;
use super::zone::RectEvent;
use crate::error::WorldError;
use crate::settings::Settings;
use crate::tile_coord;

/// Built-in handler moving the actor to the next walkable layer above
pub const LAYER_UP_HANDLER: &str = "layerUp";
/// Built-in handler moving the actor to the next walkable layer below
pub const LAYER_DOWN_HANDLER: &str = "layerDown";

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    actor: Option<Actor>,
}

/// A handler invocation raised while a movement was still resolving
#[derive(Debug, Clone)]
struct PendingEvent {
    handler: String,
    context: EventContext,
}

/// The simulated map
#[derive(Debug)]
pub struct World {
    settings: Settings,
    layers: Vec<Layer>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    keys: HashMap<String, ActorId>,
    player: Option<ActorId>,
    pub handlers: HandlerTable,
    pub behaviors: BehaviorRegistry,
    pending: VecDeque<PendingEvent>,
    /// Nesting of in-progress movement calls; handlers wait until it is zero
    pub(crate) move_depth: u32,
    alert: AlertGate,
    control_locks: u32,
}

impl World {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            layers: Vec::new(),
            slots: Vec::new(),
            free: Vec::new(),
            keys: HashMap::new(),
            player: None,
            handlers: HandlerTable::new(),
            behaviors: BehaviorRegistry::with_builtins(),
            pending: VecDeque::new(),
            move_depth: 0,
            alert: AlertGate::default(),
            control_locks: 0,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn tile_size(&self) -> DVec2 {
        self.settings.tile_size()
    }

    // === Layers ===

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id.0)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id.0)
    }

    pub fn layer_by_name(&self, name: &str) -> Option<LayerId> {
        self.layers.iter().position(|l| l.name == name).map(LayerId)
    }

    // === Actors ===

    /// Add an actor to the arena and list it on `layer`
    pub fn spawn_actor(&mut self, layer: LayerId, mut actor: Actor) -> Result<ActorId, WorldError> {
        if layer.0 >= self.layers.len() {
            return Err(WorldError::LayerOutOfRange(layer));
        }
        if let Some(key) = &actor.key {
            if self.keys.contains_key(key) {
                return Err(WorldError::DuplicateKey(key.clone()));
            }
        }

        actor.layer = layer;
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.actor = Some(actor);
                ActorId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    actor: Some(actor),
                });
                ActorId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        if let Some(key) = self.actor(id).and_then(|a| a.key.clone()) {
            self.keys.insert(key, id);
        }
        self.layers[layer.0].actors.push(id);
        log::debug!("spawned actor {id} on layer {}", self.layers[layer.0].name);
        Ok(id)
    }

    /// Remove an actor from its layer, the key lookup and the arena.
    /// A pursuit in progress is abandoned first.
    pub fn destroy_actor(&mut self, id: ActorId) -> Result<Actor, WorldError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation && s.actor.is_some())
            .ok_or(WorldError::StaleActor(id))?;
        let mut actor = slot.actor.take().ok_or(WorldError::StaleActor(id))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        if let Some(layer) = self.layers.get_mut(actor.layer.0) {
            layer.actors.retain(|&a| a != id);
        }
        if let Some(key) = &actor.key {
            self.keys.remove(key);
        }
        if self.player == Some(id) {
            self.player = None;
        }
        if let Some(mut behavior) = actor.behavior.take() {
            behavior.abandon(id, self);
            actor.behavior = Some(behavior);
        }
        if self.alert.release(id) {
            log::warn!("actor {id} destroyed while holding the alert gate");
        }
        log::debug!("destroyed actor {id} ({})", actor.name);
        Ok(actor)
    }

    pub fn contains(&self, id: ActorId) -> bool {
        self.actor(id).is_some()
    }

    pub fn actor(&self, id: ActorId) -> Option<&Actor> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.actor.as_ref())
    }

    pub fn actor_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.actor.as_mut())
    }

    /// Look an actor up by its authored key
    pub fn actor_by_key(&self, key: &str) -> Option<ActorId> {
        self.keys.get(key).copied()
    }

    /// Every live actor, in arena order
    pub fn actor_ids(&self) -> impl Iterator<Item = ActorId> + '_ {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.actor.as_ref().map(|_| ActorId {
                index: i as u32,
                generation: s.generation,
            })
        })
    }

    /// Teleport an actor, moving it between layer lists if needed
    pub fn place_actor(
        &mut self,
        id: ActorId,
        position: DVec2,
        layer: LayerId,
    ) -> Result<(), WorldError> {
        if layer.0 >= self.layers.len() {
            return Err(WorldError::LayerOutOfRange(layer));
        }
        let actor = self.actor_mut(id).ok_or(WorldError::StaleActor(id))?;
        let from = actor.layer;
        actor.position = position;
        actor.layer = layer;
        if from != layer {
            self.layers[from.0].actors.retain(|&a| a != id);
            self.layers[layer.0].actors.push(id);
            log::debug!(
                "actor {id} moved from layer {} to {}",
                self.layers[from.0].name,
                self.layers[layer.0].name
            );
        }
        Ok(())
    }

    /// Like [`World::place_actor`], addressing the layer by name
    pub fn place_actor_on(
        &mut self,
        id: ActorId,
        position: DVec2,
        layer: &str,
    ) -> Result<(), WorldError> {
        let layer = self
            .layer_by_name(layer)
            .ok_or_else(|| WorldError::UnknownLayer(layer.to_string()))?;
        self.place_actor(id, position, layer)
    }

    pub fn player(&self) -> Option<ActorId> {
        self.player
    }

    pub fn set_player(&mut self, id: Option<ActorId>) {
        self.player = id;
    }

    // === Name queries ===

    pub fn get_all_actors_by_name(&self, name: &str) -> Vec<ActorId> {
        self.layers
            .iter()
            .flat_map(|l| l.actors.iter().copied())
            .filter(|&id| self.actor(id).is_some_and(|a| a.name == name))
            .collect()
    }

    pub fn get_all_triggers_by_name<'a>(&'a self, name: &'a str) -> Vec<(LayerId, &'a RectEvent)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, l)| l.triggers_by_name(name).map(move |t| (LayerId(i), t)))
            .collect()
    }

    pub fn get_all_events_by_name<'a>(&'a self, name: &'a str) -> Vec<(LayerId, &'a RectEvent)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, l)| l.events_by_name(name).map(move |e| (LayerId(i), e)))
            .collect()
    }

    pub fn get_all_obstructions_by_name<'a>(
        &'a self,
        name: &'a str,
    ) -> Vec<(LayerId, &'a Obstruction)> {
        self.layers
            .iter()
            .enumerate()
            .flat_map(|(i, l)| l.obstructions_by_name(name).map(move |o| (LayerId(i), o)))
            .collect()
    }

    // === Behaviors ===

    /// Deterministic RNG for an actor's behavior, derived from the world seed
    pub fn behavior_rng(&self, id: ActorId) -> Pcg32 {
        Pcg32::new(self.settings.seed, (u64::from(id.index) << 1) | 1)
    }

    /// Install the registered behavior `name` on an actor.
    /// Returns false (and logs) when the name is unknown.
    pub fn assign_behavior(&mut self, id: ActorId, name: &str) -> bool {
        let rng = self.behavior_rng(id);
        let Some(behavior) = self.behaviors.create(name, rng) else {
            log::warn!("unknown behavior '{name}' for actor {id}");
            return false;
        };
        if !self.contains(id) {
            return false;
        }
        self.set_behavior(id, Some(behavior));
        true
    }

    /// Replace an actor's behavior, abandoning the old one
    pub fn set_behavior(&mut self, id: ActorId, behavior: Option<Behavior>) {
        let Some(actor) = self.actor_mut(id) else {
            return;
        };
        let previous = std::mem::replace(&mut actor.behavior, behavior);
        if let Some(mut previous) = previous {
            previous.abandon(id, self);
        }
    }

    /// Freeze an actor's behavior for `seconds`, then resume it
    pub fn stun(&mut self, id: ActorId, seconds: f64) {
        if let Some(actor) = self.actor_mut(id) {
            let resume = actor.behavior.take();
            actor.behavior = Some(Behavior::Stun(Stun::new(seconds, resume)));
        }
    }

    pub fn alert_gate(&self) -> &AlertGate {
        &self.alert
    }

    pub fn alert_gate_mut(&mut self) -> &mut AlertGate {
        &mut self.alert
    }

    // === Control lock ===

    /// Suspend player input and wandering actors until the matching unlock
    pub fn lock_controls(&mut self) {
        self.control_locks += 1;
    }

    pub fn unlock_controls(&mut self) {
        self.control_locks = self.control_locks.saturating_sub(1);
    }

    pub fn controls_locked(&self) -> bool {
        self.control_locks > 0
    }

    // === Events ===

    /// Whether `name` resolves to a registered or built-in handler
    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains(name) || name == LAYER_UP_HANDLER || name == LAYER_DOWN_HANDLER
    }

    /// Build the context for an event raised by `actor` at `position`
    pub fn event_context(&self, actor: ActorId, kind: EventKind, position: DVec2) -> EventContext {
        EventContext {
            actor,
            kind,
            position,
            tile: tile_coord(position, self.tile_size()),
        }
    }

    /// Invoke the handler `name`. Inside a movement call the invocation is
    /// queued until the outermost movement returns.
    pub fn fire(&mut self, name: &str, context: EventContext) {
        if self.move_depth > 0 {
            self.pending.push_back(PendingEvent {
                handler: name.to_string(),
                context,
            });
        } else {
            self.dispatch(name, &context);
        }
    }

    /// Run every queued handler in the order it was raised
    pub(crate) fn flush_events(&mut self) {
        while let Some(ev) = self.pending.pop_front() {
            self.dispatch(&ev.handler, &ev.context);
        }
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    fn dispatch(&mut self, name: &str, context: &EventContext) {
        if let Some(mut handler) = self.handlers.take(name) {
            log::debug!("handler {name} <- {:?} from {}", context.kind, context.actor);
            handler(self, context);
            self.handlers.restore(name, handler);
            return;
        }
        match name {
            LAYER_UP_HANDLER => self.shift_layer(context.actor, true),
            LAYER_DOWN_HANDLER => self.shift_layer(context.actor, false),
            _ => log::trace!("no handler for {name}"),
        }
    }

    /// Move an actor to the nearest walkable layer above or below its own
    fn shift_layer(&mut self, id: ActorId, up: bool) {
        let Some((position, current)) = self.actor(id).map(|a| (a.position, a.layer)) else {
            return;
        };
        let target = if up {
            (current.0 + 1..self.layers.len()).find(|&i| self.layers[i].walkable)
        } else {
            (0..current.0).rev().find(|&i| self.layers[i].walkable)
        };
        if let Some(target) = target {
            if let Err(e) = self.place_actor(id, position, LayerId(target)) {
                log::warn!("layer shift failed: {e}");
            }
        }
    }

    /// Interact with whatever sits one tile ahead of the actor.
    ///
    /// Fires the first active trigger there that has a handler, then every
    /// actor on the layer whose name has a handler and whose body covers the
    /// point. Returns how many handlers were invoked.
    pub fn interact(&mut self, id: ActorId) -> usize {
        let tile_size = self.tile_size();
        let Some(actor) = self.actor(id) else {
            return 0;
        };
        let point = actor.position + actor.facing_tile_offset(tile_size);
        let Some(layer) = self.layer(actor.layer) else {
            return 0;
        };

        let trigger = layer
            .triggers
            .iter()
            .enumerate()
            .find(|(_, t)| t.active && t.rect.contains(point) && self.has_handler(&t.name))
            .map(|(i, t)| (i, t.name.clone()));

        let targets: Vec<(ActorId, String)> = layer
            .actors
            .iter()
            .filter_map(|&other| {
                let a = self.actor(other)?;
                (self.has_handler(&a.name) && point.distance(a.position) < a.radius)
                    .then(|| (other, a.name.clone()))
            })
            .collect();

        let mut fired = 0;
        if let Some((trigger, name)) = trigger {
            let ctx = self.event_context(id, EventKind::Trigger { trigger }, point);
            self.fire(&name, ctx);
            fired += 1;
        }
        for (target, name) in targets {
            let ctx = self.event_context(id, EventKind::Interact { target }, point);
            self.fire(&name, ctx);
            fired += 1;
        }
        fired
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::sim::geometry::Rect;

    fn two_layer_world() -> (World, LayerId, LayerId) {
        let mut world = World::default();
        let ground = world.add_layer(Layer::new("ground"));
        let upper = world.add_layer(Layer::new("upper"));
        (world, ground, upper)
    }

    #[test]
    fn test_spawn_and_lookup() {
        let (mut world, ground, _) = two_layer_world();
        let id = world
            .spawn_actor(ground, Actor::new("npc", DVec2::new(8.0, 8.0)).with_key("npc_1"))
            .unwrap();
        assert_eq!(world.actor_by_key("npc_1"), Some(id));
        assert_eq!(world.layer(ground).unwrap().actors(), &[id]);
        assert_eq!(world.actor(id).unwrap().layer(), ground);
        assert_eq!(world.get_all_actors_by_name("npc"), vec![id]);
    }

    #[test]
    fn test_spawn_rejects_bad_layer_and_duplicate_key() {
        let (mut world, ground, _) = two_layer_world();
        assert!(matches!(
            world.spawn_actor(LayerId(9), Actor::new("x", DVec2::ZERO)),
            Err(WorldError::LayerOutOfRange(_))
        ));
        world
            .spawn_actor(ground, Actor::new("a", DVec2::ZERO).with_key("k"))
            .unwrap();
        assert!(matches!(
            world.spawn_actor(ground, Actor::new("b", DVec2::ZERO).with_key("k")),
            Err(WorldError::DuplicateKey(_))
        ));
    }

    #[test]
    fn test_destroy_removes_everywhere_and_invalidates_handle() {
        let (mut world, ground, _) = two_layer_world();
        let id = world
            .spawn_actor(ground, Actor::new("npc", DVec2::ZERO).with_key("npc"))
            .unwrap();
        world.set_player(Some(id));
        world.destroy_actor(id).unwrap();

        assert!(world.actor(id).is_none());
        assert!(world.layer(ground).unwrap().actors().is_empty());
        assert!(world.actor_by_key("npc").is_none());
        assert!(world.player().is_none());
        assert!(matches!(world.destroy_actor(id), Err(WorldError::StaleActor(_))));

        // Slot reuse does not revive the old handle
        let next = world.spawn_actor(ground, Actor::new("next", DVec2::ZERO)).unwrap();
        assert_eq!(next.index(), id.index());
        assert!(world.actor(id).is_none());
        assert!(world.actor(next).is_some());
    }

    #[test]
    fn test_place_actor_moves_membership() {
        let (mut world, ground, upper) = two_layer_world();
        let id = world.spawn_actor(ground, Actor::new("npc", DVec2::ZERO)).unwrap();
        world.place_actor(id, DVec2::new(32.0, 32.0), upper).unwrap();
        assert!(world.layer(ground).unwrap().actors().is_empty());
        assert_eq!(world.layer(upper).unwrap().actors(), &[id]);
        assert_eq!(world.actor(id).unwrap().position, DVec2::new(32.0, 32.0));
        assert!(matches!(
            world.place_actor_on(id, DVec2::ZERO, "attic"),
            Err(WorldError::UnknownLayer(_))
        ));
    }

    #[test]
    fn test_layer_up_and_down_skip_unwalkable() {
        let mut world = World::default();
        let ground = world.add_layer(Layer::new("ground"));
        let mut roof = Layer::new("roof");
        roof.walkable = false;
        world.add_layer(roof);
        let upper = world.add_layer(Layer::new("upper"));
        let id = world.spawn_actor(ground, Actor::new("p", DVec2::ZERO)).unwrap();

        let ctx = world.event_context(id, EventKind::Notice, DVec2::ZERO);
        world.fire(LAYER_UP_HANDLER, ctx.clone());
        assert_eq!(world.actor(id).unwrap().layer(), upper);
        world.fire(LAYER_UP_HANDLER, ctx.clone());
        assert_eq!(world.actor(id).unwrap().layer(), upper);
        world.fire(LAYER_DOWN_HANDLER, ctx);
        assert_eq!(world.actor(id).unwrap().layer(), ground);
    }

    #[test]
    fn test_missing_handler_is_noop() {
        let (mut world, ground, _) = two_layer_world();
        let id = world.spawn_actor(ground, Actor::new("p", DVec2::ZERO)).unwrap();
        let ctx = world.event_context(id, EventKind::Notice, DVec2::ZERO);
        world.fire("nobody_home", ctx);
        assert_eq!(world.pending_events(), 0);
    }

    #[test]
    fn test_interact_fires_trigger_then_actor() {
        let (mut world, ground, _) = two_layer_world();
        world
            .layer_mut(ground)
            .unwrap()
            .add_trigger(RectEvent::new("sign", Rect::new(16.0, 0.0, 16.0, 16.0)));
        let player = world
            .spawn_actor(ground, Actor::new("hero", DVec2::new(8.0, 8.0)).with_facing(0.0))
            .unwrap();
        world
            .spawn_actor(ground, Actor::new("cat", DVec2::new(26.0, 8.0)))
            .unwrap();

        let log = Rc::new(RefCell::new(Vec::new()));
        for name in ["sign", "cat"] {
            let log = Rc::clone(&log);
            world.handlers.register(name, move |_, ctx| {
                log.borrow_mut().push((name, ctx.kind.clone()));
            });
        }

        assert_eq!(world.interact(player), 2);
        let log = log.borrow();
        assert_eq!(log[0], ("sign", EventKind::Trigger { trigger: 0 }));
        assert!(matches!(log[1], ("cat", EventKind::Interact { .. })));
    }

    #[test]
    fn test_interact_skips_trigger_without_handler() {
        let (mut world, ground, _) = two_layer_world();
        world
            .layer_mut(ground)
            .unwrap()
            .add_trigger(RectEvent::new("sign", Rect::new(16.0, 0.0, 16.0, 16.0)));
        let player = world
            .spawn_actor(ground, Actor::new("hero", DVec2::new(8.0, 8.0)))
            .unwrap();
        assert_eq!(world.interact(player), 0);
    }

    #[test]
    fn test_stun_wraps_current_behavior() {
        let (mut world, ground, _) = two_layer_world();
        let id = world.spawn_actor(ground, Actor::new("npc", DVec2::ZERO)).unwrap();
        assert!(world.assign_behavior(id, "wander"));
        world.stun(id, 1.0);
        assert!(matches!(world.actor(id).unwrap().behavior(), Some(Behavior::Stun(_))));
        assert!(!world.assign_behavior(id, "moonwalk"));
    }
}
