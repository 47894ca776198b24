//! Fixed timestep simulation tick
//!
//! Advances every actor one frame, then applies the player's input.

use std::collections::HashSet;

use glam::DVec2;

use super::actor::ActorId;
use super::behavior::BehaviorStep;
use super::layer::LayerId;
use super::world::World;

/// Input commands for a single tick
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Horizontal axis, -1 (left) to 1 (right)
    pub move_x: f64,
    /// Vertical axis, -1 (up) to 1 (down)
    pub move_y: f64,
    /// Interact with whatever the player faces
    pub confirm: bool,
}

impl TickInput {
    /// Movement direction with the deadzone applied and length capped at 1
    pub fn direction(&self, deadzone: f64) -> DVec2 {
        let v = DVec2::new(self.move_x, self.move_y);
        let magnitude = v.length();
        if magnitude < deadzone {
            DVec2::ZERO
        } else if magnitude > 1.0 {
            v / magnitude
        } else {
            v
        }
    }
}

/// Advance the world by one fixed timestep
pub fn tick(world: &mut World, input: &TickInput, dt: f64) {
    update_actors(world, dt);

    // Player input is suspended while a pursuit or script holds the controls
    if world.controls_locked() {
        return;
    }
    let Some(player) = world.player() else {
        return;
    };
    let Some(speed) = world.actor(player).map(|a| a.speed) else {
        return;
    };

    let dir = input.direction(world.settings().deadzone);
    world.move_actor(player, dir * speed * dt);

    if input.confirm {
        world.interact(player);
    }
}

/// Classify every actor as stationary or moving and step its behavior.
///
/// Layers are visited in order and actors in their layer's list order. An
/// actor moved onto a later layer during the frame is not updated twice.
pub fn update_actors(world: &mut World, dt: f64) {
    let mut updated: HashSet<ActorId> = HashSet::new();

    for layer in 0..world.layers().len() {
        let ids: Vec<ActorId> = world
            .layer(LayerId(layer))
            .map(|l| l.actors().to_vec())
            .unwrap_or_default();

        for id in ids {
            if !updated.insert(id) {
                continue;
            }
            update_actor(world, id, dt);
        }
    }
}

fn update_actor(world: &mut World, id: ActorId, dt: f64) {
    let Some(actor) = world.actor_mut(id) else {
        // Destroyed earlier this frame
        return;
    };
    actor.stationary = !actor.moved_last_frame;
    actor.moved_last_frame = false;

    let Some(mut behavior) = actor.behavior.take() else {
        return;
    };
    let step = behavior.step(id, world, dt);
    let next = match step {
        BehaviorStep::Continue => Some(behavior),
        BehaviorStep::Replace(next) => {
            log::debug!("actor {id}: {} -> {}", behavior.name(), next.name());
            Some(next)
        }
        BehaviorStep::Done => None,
    };

    let Some(actor) = world.actor_mut(id) else {
        // Destroyed by its own step
        if let Some(mut next) = next {
            next.abandon(id, world);
        }
        return;
    };

    // Something installed during the step (a stun, a script) wins
    let (installed, dropped) = match (actor.behavior.take(), next) {
        (Some(mut installed), Some(prev)) => {
            let dropped = installed.adopt_resume(prev);
            (Some(installed), dropped)
        }
        (Some(installed), None) => (Some(installed), None),
        (None, next) => (next, None),
    };
    actor.behavior = installed;
    if let Some(mut dropped) = dropped {
        dropped.abandon(id, world);
    }
}
