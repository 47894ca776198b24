//! Slide resolution: moving an actor against obstructions and other actors
//!
//! Each call projects the actor along the remaining part of its request,
//! collects every constraint the projected circle violates, pushes any actor
//! it ran into, and shifts the projection out of whatever is still in the
//! way. The corrected projection is committed and the loop repeats with the
//! unused fraction until the request is spent or the iteration cap is hit.
//! Running out of iterations just means the actor stops short this frame.

use std::cmp::Ordering;

use glam::DVec2;

use super::actor::{ActorId, Animation};
use super::collision::{Body, Contact, body_contact, line_contact, push_factor};
use super::handlers::EventKind;
use super::layer::LayerId;
use super::world::World;
use crate::consts::{MAX_PUSH_DEPTH, MAX_SLIDE_ITERATIONS, NEAR_ACTOR_FACTOR, TRAVEL_COMPLETE};
use crate::{normalize_heading, tile_coord, vec_to_heading};

/// Result of a movement request
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveOutcome {
    /// Where the actor ended up
    pub position: DVec2,
    /// Net displacement was non-zero
    pub moved: bool,
    /// A non-zero request produced no net displacement
    pub stuck: bool,
}

impl World {
    /// Walk an actor by `delta`.
    ///
    /// Faces the actor along the request, resolves the slide, marks the actor
    /// as having moved this frame if it did, and switches its animation
    /// between walking and standing. Handlers raised along the way run before
    /// this returns.
    pub fn move_actor(&mut self, id: ActorId, delta: DVec2) -> MoveOutcome {
        let Some(actor) = self.actor_mut(id) else {
            log::debug!("move request for missing actor {id}");
            return MoveOutcome::default();
        };
        if delta != DVec2::ZERO {
            actor.facing = normalize_heading(vec_to_heading(delta));
        }

        let outcome = self.slide(id, delta);

        if let Some(actor) = self.actor_mut(id) {
            if outcome.moved {
                actor.moved_last_frame = true;
                actor.animation = Animation::Walk;
            } else {
                actor.animation = Animation::Stand;
            }
        }
        outcome
    }

    /// Resolve a displacement for an actor without touching its facing,
    /// animation or motion flag. Handlers raised along the way run before
    /// this returns.
    pub fn slide(&mut self, id: ActorId, delta: DVec2) -> MoveOutcome {
        let Some(start) = self.actor(id).map(|a| a.position) else {
            return MoveOutcome::default();
        };

        self.move_depth += 1;
        self.slide_actor(id, delta, 0);
        self.move_depth -= 1;

        let position = self.actor(id).map_or(start, |a| a.position);
        let moved = position != start;
        if self.move_depth == 0 {
            self.flush_events();
        }
        MoveOutcome {
            position,
            moved,
            stuck: !moved && delta != DVec2::ZERO,
        }
    }

    pub(crate) fn slide_actor(&mut self, id: ActorId, delta: DVec2, depth: u32) {
        if delta == DVec2::ZERO {
            return;
        }
        let Some(actor) = self.actor(id) else {
            return;
        };
        let layer = actor.layer;
        let start = actor.position;
        let respects = actor.respects_obstructions;
        let triggers = actor.triggers_events;

        let zones_before = if triggers {
            self.layer(layer)
                .map(|l| l.event_zones_at(start))
                .unwrap_or_default()
        } else {
            Vec::new()
        };

        if respects {
            self.resolve(id, layer, delta, depth);
        } else if let Some(actor) = self.actor_mut(id) {
            actor.position = start + delta;
        }

        if triggers {
            self.raise_movement_events(id, layer, &zones_before, start);
        }
    }

    /// The iterative correction loop
    fn resolve(&mut self, id: ActorId, layer: LayerId, delta: DVec2, depth: u32) {
        let requested = delta.length();
        let mut travelled = 0.0;
        let mut iter = 0;

        while travelled < TRAVEL_COMPLETE && iter < MAX_SLIDE_ITERATIONS {
            iter += 1;
            let mut travel_multiplier: f64 = 1.0;

            let Some(me) = self.actor(id) else {
                return;
            };
            let origin = me.position;
            let radius = me.radius;
            let strength = me.push_strength;
            let solid = me.solid;

            let mut projected = origin + delta * (1.0 - travelled);
            let contacts = self.contacts(id, layer, origin, projected, radius, solid);

            for contact in contacts {
                let mut contact = contact;
                if let Some(other) = contact.actor {
                    let Some(weight) = self.actor(other).map(|a| a.push_weight) else {
                        continue;
                    };
                    let (d, dir) = contact.shape.separation(projected);
                    let factor = push_factor(weight, strength);
                    travel_multiplier = travel_multiplier.max(1.0 / factor);

                    if !self.push_actor(other, id, -dir * (radius - d) * factor, depth) {
                        continue;
                    }
                    // The push may have cleared the way
                    match self
                        .body(other)
                        .and_then(|b| body_contact(&b, origin, projected, radius))
                    {
                        Some(c) => contact = c,
                        None => continue,
                    }
                }

                let (d, dir) = contact.shape.separation(projected);
                if radius - d > 0.0 {
                    projected += dir * (radius - d);
                }
            }

            let moved = origin.distance(projected);
            if moved == 0.0 {
                break;
            }
            travelled += moved / requested * travel_multiplier;
            if let Some(me) = self.actor_mut(id) {
                me.position = projected;
            }
        }

        if iter >= MAX_SLIDE_ITERATIONS && travelled < TRAVEL_COMPLETE {
            log::trace!("slide for {id} stopped after {iter} iterations at {travelled:.3}");
        }
    }

    /// Every violated constraint at `projected`, in resolution order
    fn contacts(
        &self,
        id: ActorId,
        layer: LayerId,
        origin: DVec2,
        projected: DVec2,
        radius: f64,
        solid: bool,
    ) -> Vec<Contact> {
        let Some(layer) = self.layer(layer) else {
            return Vec::new();
        };

        let mut contacts: Vec<Contact> = layer
            .obstructions()
            .filter(|o| o.active)
            .filter_map(|o| line_contact(origin, projected, radius, o.a(), o.b()))
            .collect();

        if solid {
            for &other in layer.actors() {
                if other == id {
                    continue;
                }
                let Some(body) = self.body(other) else {
                    continue;
                };
                if !self.actor(other).is_some_and(|a| a.solid) {
                    continue;
                }
                if projected.distance(body.position) > (body.radius + radius) * NEAR_ACTOR_FACTOR {
                    continue;
                }
                if let Some(c) = body_contact(&body, origin, projected, radius) {
                    if c.distance < radius {
                        contacts.push(c);
                    }
                }
            }
        }

        contacts.sort_by(|a, b| a.order.partial_cmp(&b.order).unwrap_or(Ordering::Equal));
        contacts
    }

    fn body(&self, id: ActorId) -> Option<Body> {
        self.actor(id).map(|a| Body {
            id,
            position: a.position,
            radius: a.radius,
            stationary: a.is_stationary(),
        })
    }

    /// Push `target` by `delta` on behalf of `pusher`.
    /// Returns false when the target's push gate vetoed it.
    fn push_actor(&mut self, target: ActorId, pusher: ActorId, delta: DVec2, depth: u32) -> bool {
        let Some(actor) = self.actor_mut(target) else {
            return true;
        };

        if let Some(mut gate) = actor.push_gate.take() {
            let allow = gate(pusher);
            if let Some(actor) = self.actor_mut(target) {
                if actor.push_gate.is_none() {
                    actor.push_gate = Some(gate);
                }
            }
            if !allow {
                log::trace!("push of {target} by {pusher} vetoed");
                return false;
            }
        }

        if self.actor(target).is_none_or(|a| a.push_weight.is_infinite()) {
            return true;
        }
        if depth + 1 > MAX_PUSH_DEPTH {
            log::trace!("push chain too deep at {target}");
            return true;
        }
        self.slide_actor(target, delta, depth + 1);
        true
    }

    /// Queue zone enter/exit and tile events after a slide
    fn raise_movement_events(
        &mut self,
        id: ActorId,
        layer: LayerId,
        zones_before: &[usize],
        start: DVec2,
    ) {
        let tile_size = self.tile_size();
        let Some(position) = self.actor(id).map(|a| a.position) else {
            return;
        };
        let Some(lyr) = self.layer(layer) else {
            return;
        };

        let mut raised: Vec<(String, EventKind)> = Vec::new();
        let zones_after = lyr.event_zones_at(position);
        let zones = lyr.zones();

        for &z in zones_after.iter().filter(|z| !zones_before.contains(z)) {
            let zone = &zones[z];
            if let Some(name) = zone.events.as_ref().and_then(|e| e.on_enter.clone()) {
                raised.push((
                    name,
                    EventKind::ZoneEnter {
                        zone: zone.name.clone(),
                    },
                ));
            }
        }
        for &z in zones_before.iter().filter(|z| !zones_after.contains(z)) {
            let Some(zone) = zones.get(z) else {
                continue;
            };
            if let Some(name) = zone.events.as_ref().and_then(|e| e.on_exit.clone()) {
                raised.push((
                    name,
                    EventKind::ZoneExit {
                        zone: zone.name.clone(),
                    },
                ));
            }
        }

        if tile_coord(start, tile_size) != tile_coord(position, tile_size) {
            for (i, ev) in lyr.events.iter().enumerate() {
                if ev.active && ev.rect.contains(position) && self.has_handler(&ev.name) {
                    raised.push((ev.name.clone(), EventKind::Tile { event: i }));
                }
            }
        }

        for (name, kind) in raised {
            let ctx = self.event_context(id, kind, position);
            self.fire(&name, ctx);
        }
    }
}
