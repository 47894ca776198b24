//! Actor behaviors
//!
//! Each behavior is a resumable state machine stepped once per frame by
//! [`crate::sim::tick`]. A step issues at most one movement request and
//! reports whether the behavior keeps running, hands over to another
//! behavior, or has finished.
//!
//! Pursuits (guards and their wandering variants) share a single
//! [`AlertGate`]: an actor that spots the player locks the controls and then
//! polls the gate every frame until it is free.

use std::collections::HashMap;
use std::fmt;

use glam::DVec2;
use rand::Rng;
use rand_pcg::Pcg32;

use super::actor::{ActorId, Animation};
use super::geometry::dist_to_segment;
use super::handlers::EventKind;
use super::world::World;
use crate::{heading_to_vec, normalize_heading, vec_to_heading};

/// Handler fired when a pursuing actor reaches the player
pub const FIGHT_HANDLER: &str = "waitFight";

/// Default vision of a guard, in tiles
const GUARD_VISION: f64 = 3.0;
/// Default sighting radius of a fight wanderer, in tiles
const FIGHT_VISION: f64 = 2.0;

/// Outcome of one behavior step
#[derive(Debug)]
pub enum BehaviorStep {
    Continue,
    /// Swap in another behavior from the next frame
    Replace(Behavior),
    /// Behavior finished; the actor is left without one
    Done,
}

/// Single-slot token held by the actor currently in pursuit
#[derive(Debug, Default)]
pub struct AlertGate {
    holder: Option<ActorId>,
}

impl AlertGate {
    /// Take the gate. Succeeds when it is free or already held by `id`.
    pub fn try_acquire(&mut self, id: ActorId) -> bool {
        match self.holder {
            None => {
                self.holder = Some(id);
                true
            }
            Some(holder) => holder == id,
        }
    }

    /// Release the gate if `id` holds it
    pub fn release(&mut self, id: ActorId) -> bool {
        if self.holder == Some(id) {
            self.holder = None;
            true
        } else {
            false
        }
    }

    pub fn holder(&self) -> Option<ActorId> {
        self.holder
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }
}

/// Per-frame behavior of an actor
#[derive(Debug, Clone)]
pub enum Behavior {
    Stun(Stun),
    Wander(Wander),
    Path(PathWalk),
    TileSteps(TileSteps),
    Guard(Guard),
    FightWander(FightWander),
    GuardWander(GuardWander),
}

impl Behavior {
    pub fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        match self {
            Behavior::Stun(b) => b.step(dt),
            Behavior::Wander(b) => b.step(actor, world, dt),
            Behavior::Path(b) => b.step(actor, world, dt),
            Behavior::TileSteps(b) => b.step(actor, world, dt),
            Behavior::Guard(b) => b.step(actor, world, dt),
            Behavior::FightWander(b) => b.step(actor, world, dt),
            Behavior::GuardWander(b) => b.step(actor, world, dt),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Behavior::Stun(_) => "stun",
            Behavior::Wander(_) => "wander",
            Behavior::Path(_) => "path",
            Behavior::TileSteps(_) => "tile_steps",
            Behavior::Guard(_) => "guard",
            Behavior::FightWander(_) => "fight_wander",
            Behavior::GuardWander(_) => "guard_wander",
        }
    }

    /// Whether this behavior holds the alert gate and is closing in
    pub fn is_chasing(&self) -> bool {
        match self {
            Behavior::Guard(g) => matches!(&g.phase, GuardPhase::Pursuing(p) if p.is_chasing()),
            Behavior::FightWander(f) => f.pursuit.as_ref().is_some_and(Pursuit::is_chasing),
            Behavior::GuardWander(g) => g.pursuit.as_ref().is_some_and(Pursuit::is_chasing),
            _ => false,
        }
    }

    /// A stun installed while `prev` was mid-step resumes `prev` afterwards.
    /// Hands `prev` back when it cannot be adopted.
    pub(crate) fn adopt_resume(&mut self, prev: Behavior) -> Option<Behavior> {
        match self {
            Behavior::Stun(stun) if stun.resume.is_none() => {
                stun.resume = Some(Box::new(prev));
                None
            }
            _ => Some(prev),
        }
    }

    /// Release whatever a pursuit in progress holds: the alert gate, the
    /// control lock and the overridden pace. Call before dropping or
    /// replacing a behavior that has not finished.
    pub fn abandon(&mut self, actor: ActorId, world: &mut World) {
        match self {
            Behavior::Stun(stun) => {
                if let Some(resume) = stun.resume.as_mut() {
                    resume.abandon(actor, world);
                }
            }
            Behavior::Guard(g) => g.abandon(actor, world),
            Behavior::FightWander(FightWander { pursuit, .. })
            | Behavior::GuardWander(GuardWander { pursuit, .. }) => {
                if let Some(mut pursuit) = pursuit.take() {
                    pursuit.abandon(actor, world);
                }
            }
            Behavior::Wander(_) | Behavior::Path(_) | Behavior::TileSteps(_) => {}
        }
    }

    /// Walk a list of `(heading, distance)` legs
    pub fn path(steps: Vec<(f64, f64)>) -> Self {
        Behavior::Path(PathWalk::new(steps))
    }

    /// Walk one tile per heading
    pub fn tile_steps(headings: Vec<f64>) -> Self {
        Behavior::TileSteps(TileSteps::new(headings))
    }
}

// ============================================================================
// Stun
// ============================================================================

#[derive(Debug, Clone)]
pub struct Stun {
    seconds: f64,
    elapsed: f64,
    resume: Option<Box<Behavior>>,
}

impl Stun {
    pub fn new(seconds: f64, resume: Option<Behavior>) -> Self {
        Self {
            seconds,
            elapsed: 0.0,
            resume: resume.map(Box::new),
        }
    }

    pub fn remaining(&self) -> f64 {
        (self.seconds - self.elapsed).max(0.0)
    }

    fn step(&mut self, dt: f64) -> BehaviorStep {
        self.elapsed += dt;
        if self.elapsed < self.seconds {
            return BehaviorStep::Continue;
        }
        match self.resume.take() {
            Some(behavior) => BehaviorStep::Replace(*behavior),
            None => BehaviorStep::Done,
        }
    }
}

// ============================================================================
// Wandering
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stride {
    North,
    East,
    South,
    West,
    Wait,
}

impl Stride {
    fn from_index(i: u32) -> Self {
        match i {
            0 => Stride::North,
            1 => Stride::East,
            2 => Stride::South,
            3 => Stride::West,
            _ => Stride::Wait,
        }
    }

    fn dir(self) -> DVec2 {
        match self {
            Stride::North => DVec2::NEG_Y,
            Stride::East => DVec2::X,
            Stride::South => DVec2::Y,
            Stride::West => DVec2::NEG_X,
            Stride::Wait => DVec2::ZERO,
        }
    }
}

/// Random cardinal walks of one to four tiles
#[derive(Debug, Clone)]
struct Roam {
    stride: Stride,
    remaining: f64,
    rng: Pcg32,
}

impl Roam {
    fn new(rng: Pcg32) -> Self {
        Self {
            stride: Stride::Wait,
            remaining: 0.0,
            rng,
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) {
        if self.remaining <= 0.0 {
            self.stride = Stride::from_index(self.rng.random_range(0..5));
            self.remaining = (self.rng.random::<f64>() * 3.0 + 1.0) * world.tile_size().x;
        }
        let Some(speed) = world.actor(actor).map(|a| a.speed) else {
            return;
        };

        let outcome = world.move_actor(actor, self.stride.dir() * speed * dt);
        if !outcome.moved && self.stride != Stride::Wait {
            // Blocked: either stand out the rest of the leg or pick a new one
            if self.rng.random_bool(0.5) {
                self.stride = Stride::Wait;
            } else {
                self.remaining = 0.0;
            }
        } else {
            self.remaining -= speed * dt;
        }
    }
}

#[derive(Debug, Clone)]
pub struct Wander {
    roam: Roam,
}

impl Wander {
    pub fn new(rng: Pcg32) -> Self {
        Self {
            roam: Roam::new(rng),
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        if !world.controls_locked() {
            self.roam.step(actor, world, dt);
        }
        BehaviorStep::Continue
    }
}

// ============================================================================
// Scripted walks
// ============================================================================

/// Walks `(heading, distance)` legs in order. A leg with no distance only
/// turns the actor.
#[derive(Debug, Clone)]
pub struct PathWalk {
    steps: Vec<(f64, f64)>,
    index: usize,
    travelled: f64,
}

impl PathWalk {
    pub fn new(steps: Vec<(f64, f64)>) -> Self {
        Self {
            steps,
            index: 0,
            travelled: 0.0,
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        let Some(speed) = world.actor(actor).map(|a| a.speed) else {
            return BehaviorStep::Done;
        };

        while let Some(&(heading, distance)) = self.steps.get(self.index) {
            if distance <= 0.0 {
                if let Some(a) = world.actor_mut(actor) {
                    a.facing = normalize_heading(heading);
                }
                self.index += 1;
                continue;
            }

            let left = distance - self.travelled;
            let frame_dist = (speed * dt).min(left);
            world.move_actor(actor, heading_to_vec(heading) * frame_dist);
            if frame_dist >= left {
                self.index += 1;
                self.travelled = 0.0;
            } else {
                self.travelled += frame_dist;
            }
            break;
        }

        if self.index >= self.steps.len() {
            BehaviorStep::Done
        } else {
            BehaviorStep::Continue
        }
    }
}

/// One tile per heading. A step that gets stuck is abandoned.
#[derive(Debug, Clone)]
pub struct TileSteps {
    headings: Vec<f64>,
    index: usize,
    /// Direction and destination of the step in progress
    current: Option<(DVec2, DVec2)>,
}

impl TileSteps {
    pub fn new(headings: Vec<f64>) -> Self {
        Self {
            headings,
            index: 0,
            current: None,
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        let tile = world.tile_size();
        let Some((position, speed)) = world.actor(actor).map(|a| (a.position, a.speed)) else {
            return BehaviorStep::Done;
        };

        let (dir, target) = match self.current {
            Some(current) => current,
            None => {
                let Some(&heading) = self.headings.get(self.index) else {
                    return BehaviorStep::Done;
                };
                let mut offset = heading_to_vec(heading) * tile;
                // Drop float noise from cardinal headings
                if offset.x.abs() < 1.0 {
                    offset.x = 0.0;
                }
                if offset.y.abs() < 1.0 {
                    offset.y = 0.0;
                }
                let next = (offset.normalize_or_zero(), position + offset);
                self.current = Some(next);
                next
            }
        };

        if dir == DVec2::ZERO {
            return self.advance();
        }

        let outcome = world.move_actor(actor, dir * speed * dt);
        if outcome.stuck {
            return self.advance();
        }

        let Some(a) = world.actor_mut(actor) else {
            return BehaviorStep::Done;
        };
        let mut arrived = true;
        if dir.x != 0.0 {
            if (dir.x > 0.0 && a.position.x >= target.x) || (dir.x < 0.0 && a.position.x <= target.x) {
                a.position.x = target.x;
            } else {
                arrived = false;
            }
        }
        if dir.y != 0.0 {
            if (dir.y > 0.0 && a.position.y >= target.y) || (dir.y < 0.0 && a.position.y <= target.y) {
                a.position.y = target.y;
            } else {
                arrived = false;
            }
        }

        if arrived {
            self.advance()
        } else {
            BehaviorStep::Continue
        }
    }

    fn advance(&mut self) -> BehaviorStep {
        self.index += 1;
        self.current = None;
        if self.index >= self.headings.len() {
            BehaviorStep::Done
        } else {
            BehaviorStep::Continue
        }
    }
}

// ============================================================================
// Pursuit
// ============================================================================

/// Movement settings overridden for the duration of a pursuit
#[derive(Debug, Clone, Copy, PartialEq)]
struct Pace {
    respects_obstructions: bool,
    speed: f64,
}

impl Pace {
    fn restore(self, actor: ActorId, world: &mut World) {
        if let Some(a) = world.actor_mut(actor) {
            a.respects_obstructions = self.respects_obstructions;
            a.speed = self.speed;
        }
    }
}

#[derive(Debug, Clone)]
enum Approach {
    /// Home in on the player until touching
    Chase,
    /// Walk a fixed tile path
    March(TileSteps),
}

#[derive(Debug, Clone)]
enum PursuitPhase {
    AwaitGate,
    Closing(Pace),
    /// Finished or abandoned; holds nothing
    Over,
}

enum PursuitStep {
    Pending,
    /// Pursuit is over; the pace to put back, if the actor still exists
    Finished(Option<Pace>),
}

#[derive(Debug, Clone)]
struct Pursuit {
    approach: Approach,
    phase: PursuitPhase,
}

impl Pursuit {
    /// Lock the controls and flag the sighting. The gate is taken on step.
    fn start(actor: ActorId, world: &mut World, approach: Approach) -> Self {
        world.lock_controls();
        if let Some(player) = world.player().and_then(|p| world.actor_mut(p)) {
            player.animation = Animation::Stand;
        }
        if let Some(a) = world.actor_mut(actor) {
            a.emote = Some("!".to_string());
        }
        log::debug!("actor {actor} spotted the player");
        Self {
            approach,
            phase: PursuitPhase::AwaitGate,
        }
    }

    fn is_chasing(&self) -> bool {
        matches!(self.phase, PursuitPhase::Closing(_))
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> PursuitStep {
        if matches!(self.phase, PursuitPhase::AwaitGate) {
            if !world.alert_gate_mut().try_acquire(actor) {
                return PursuitStep::Pending;
            }
            let chase_speed = world.settings().chase_speed;
            let Some(a) = world.actor_mut(actor) else {
                return self.finish(actor, world);
            };
            let pace = Pace {
                respects_obstructions: a.respects_obstructions,
                speed: a.speed,
            };
            a.respects_obstructions = false;
            a.speed = chase_speed;
            self.phase = PursuitPhase::Closing(pace);
        }

        let reached = match &mut self.approach {
            Approach::Chase => chase_player(actor, world, dt),
            Approach::March(steps) => matches!(steps.step(actor, world, dt), BehaviorStep::Done),
        };
        if reached {
            self.finish(actor, world)
        } else {
            PursuitStep::Pending
        }
    }

    fn finish(&mut self, actor: ActorId, world: &mut World) -> PursuitStep {
        let position = match world.actor_mut(actor) {
            Some(a) => {
                a.emote = None;
                Some(a.position)
            }
            None => None,
        };
        if let Some(position) = position {
            let ctx = world.event_context(actor, EventKind::Fight, position);
            world.fire(FIGHT_HANDLER, ctx);
        }
        world.alert_gate_mut().release(actor);
        world.unlock_controls();

        let pace = match std::mem::replace(&mut self.phase, PursuitPhase::Over) {
            PursuitPhase::Closing(pace) if world.contains(actor) => Some(pace),
            _ => None,
        };
        PursuitStep::Finished(pace)
    }

    /// Undo `start` without fighting
    fn abandon(&mut self, actor: ActorId, world: &mut World) {
        match std::mem::replace(&mut self.phase, PursuitPhase::Over) {
            PursuitPhase::Over => return,
            PursuitPhase::AwaitGate => {}
            PursuitPhase::Closing(pace) => pace.restore(actor, world),
        }
        if let Some(a) = world.actor_mut(actor) {
            a.emote = None;
        }
        world.alert_gate_mut().release(actor);
        world.unlock_controls();
        log::debug!("actor {actor} abandoned its pursuit");
    }
}

/// Move toward the player. Returns true once touching, or when there is no
/// player to chase.
fn chase_player(actor: ActorId, world: &mut World, dt: f64) -> bool {
    let Some(me) = world.actor(actor) else {
        return true;
    };
    let Some(player) = world.player().and_then(|p| world.actor(p)) else {
        return true;
    };
    let gap = player.position.distance(me.position) - player.radius - me.radius;
    if gap <= 0.0 {
        return true;
    }

    let heading = vec_to_heading(player.position - me.position);
    let speed = me.speed;
    world.move_actor(actor, heading_to_vec(heading) * speed * dt);
    false
}

/// The player's position and radius, if it shares the actor's layer
fn visible_player(actor: ActorId, world: &World) -> Option<(DVec2, f64)> {
    let me = world.actor(actor)?;
    let player_id = world.player().filter(|&p| p != actor)?;
    let player = world.actor(player_id)?;
    (player.layer() == me.layer()).then_some((player.position, player.radius))
}

fn sighted_on_segment(actor: ActorId, world: &World, from: DVec2, to: DVec2) -> bool {
    visible_player(actor, world).is_some_and(|(p, r)| dist_to_segment(p, from, to) < r)
}

/// A registered handler named by the actor's `notice` parameter
fn notice_handler(actor: ActorId, world: &World) -> Option<String> {
    let name = world.actor(actor)?.param_str("notice")?;
    world.handlers.contains(name).then(|| name.to_string())
}

/// Fire the notice handler the first time the player is seen
fn notice(actor: ActorId, world: &mut World, handler: &str, latched: &mut bool) {
    if *latched {
        return;
    }
    *latched = true;
    if let Some(position) = world.actor(actor).map(|a| a.position) {
        let ctx = world.event_context(actor, EventKind::Notice, position);
        world.fire(handler, ctx);
    }
}

// ============================================================================
// Guards
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Post {
    origin: DVec2,
    vision_end: DVec2,
}

#[derive(Debug, Clone)]
enum GuardPhase {
    Watching,
    Pursuing(Pursuit),
    Returning { walk: PathWalk, pace: Pace },
}

/// Stands facing `direction`, chases the player on sight, then walks back
#[derive(Debug, Clone)]
pub struct Guard {
    direction: f64,
    post: Option<Post>,
    noticed: bool,
    phase: GuardPhase,
}

impl Guard {
    pub fn new(direction: f64) -> Self {
        Self {
            direction: normalize_heading(direction),
            post: None,
            noticed: false,
            phase: GuardPhase::Watching,
        }
    }

    pub fn direction(&self) -> f64 {
        self.direction
    }

    fn take_post(&mut self, actor: ActorId, world: &mut World) -> Option<Post> {
        if let Some(post) = self.post {
            return Some(post);
        }
        let tile = world.tile_size();
        let a = world.actor_mut(actor)?;
        a.facing = self.direction;
        a.animation = Animation::Stand;
        let vision = a.param_f64("vision").unwrap_or(GUARD_VISION);
        let post = Post {
            origin: a.position,
            vision_end: a.position + heading_to_vec(self.direction) * vision * tile,
        };
        self.post = Some(post);
        Some(post)
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        let Some(post) = self.take_post(actor, world) else {
            return BehaviorStep::Done;
        };

        match &mut self.phase {
            GuardPhase::Watching => {
                if !sighted_on_segment(actor, world, post.origin, post.vision_end) {
                    self.noticed = false;
                    return BehaviorStep::Continue;
                }
                if let Some(handler) = notice_handler(actor, world) {
                    notice(actor, world, &handler, &mut self.noticed);
                    return BehaviorStep::Continue;
                }
                let mut pursuit = Pursuit::start(actor, world, Approach::Chase);
                match pursuit.step(actor, world, dt) {
                    PursuitStep::Pending => self.phase = GuardPhase::Pursuing(pursuit),
                    PursuitStep::Finished(pace) => return self.head_home(actor, world, post, pace),
                }
            }
            GuardPhase::Pursuing(pursuit) => {
                if let PursuitStep::Finished(pace) = pursuit.step(actor, world, dt) {
                    return self.head_home(actor, world, post, pace);
                }
            }
            GuardPhase::Returning { walk, pace } => {
                if matches!(walk.step(actor, world, dt), BehaviorStep::Done) {
                    let pace = *pace;
                    pace.restore(actor, world);
                    if let Some(a) = world.actor_mut(actor) {
                        a.animation = Animation::Stand;
                        a.facing = self.direction;
                    }
                    self.phase = GuardPhase::Watching;
                }
            }
        }
        BehaviorStep::Continue
    }

    fn abandon(&mut self, actor: ActorId, world: &mut World) {
        match std::mem::replace(&mut self.phase, GuardPhase::Watching) {
            GuardPhase::Watching => {}
            GuardPhase::Pursuing(mut pursuit) => pursuit.abandon(actor, world),
            GuardPhase::Returning { pace, .. } => pace.restore(actor, world),
        }
    }

    fn head_home(
        &mut self,
        actor: ActorId,
        world: &mut World,
        post: Post,
        pace: Option<Pace>,
    ) -> BehaviorStep {
        let (Some(pace), Some(position)) = (pace, world.actor(actor).map(|a| a.position)) else {
            return BehaviorStep::Done;
        };
        let offset = post.origin - position;
        let walk = PathWalk::new(vec![(vec_to_heading(offset), offset.length())]);
        self.phase = GuardPhase::Returning { walk, pace };
        BehaviorStep::Continue
    }
}

/// Wanders until the player comes within a radius, then chases
#[derive(Debug, Clone)]
pub struct FightWander {
    roam: Roam,
    pursuit: Option<Pursuit>,
    noticed: bool,
}

impl FightWander {
    pub fn new(rng: Pcg32) -> Self {
        Self {
            roam: Roam::new(rng),
            pursuit: None,
            noticed: false,
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        if let Some(pursuit) = &mut self.pursuit {
            if let PursuitStep::Finished(pace) = pursuit.step(actor, world, dt) {
                self.pursuit = None;
                match pace {
                    Some(pace) => pace.restore(actor, world),
                    None => return BehaviorStep::Done,
                }
            }
            return BehaviorStep::Continue;
        }
        if world.controls_locked() {
            return BehaviorStep::Continue;
        }

        let tile = world.tile_size();
        let Some(me) = world.actor(actor) else {
            return BehaviorStep::Done;
        };
        let origin = me.position;
        let vision = me.param_f64("vision").unwrap_or(FIGHT_VISION) * tile.x;
        let sighted =
            visible_player(actor, world).is_some_and(|(p, _)| p.distance_squared(origin) <= vision * vision);

        if !sighted {
            self.noticed = false;
            self.roam.step(actor, world, dt);
            return BehaviorStep::Continue;
        }
        if let Some(handler) = notice_handler(actor, world) {
            notice(actor, world, &handler, &mut self.noticed);
            return BehaviorStep::Continue;
        }

        let mut pursuit = Pursuit::start(actor, world, Approach::Chase);
        match pursuit.step(actor, world, dt) {
            PursuitStep::Pending => self.pursuit = Some(pursuit),
            PursuitStep::Finished(Some(pace)) => pace.restore(actor, world),
            PursuitStep::Finished(None) => return BehaviorStep::Done,
        }
        BehaviorStep::Continue
    }
}

/// Wanders with a facing vision segment; on sight marches straight ahead
#[derive(Debug, Clone)]
pub struct GuardWander {
    roam: Roam,
    pursuit: Option<Pursuit>,
    noticed: bool,
}

impl GuardWander {
    pub fn new(rng: Pcg32) -> Self {
        Self {
            roam: Roam::new(rng),
            pursuit: None,
            noticed: false,
        }
    }

    fn step(&mut self, actor: ActorId, world: &mut World, dt: f64) -> BehaviorStep {
        if let Some(pursuit) = &mut self.pursuit {
            if let PursuitStep::Finished(pace) = pursuit.step(actor, world, dt) {
                self.pursuit = None;
                match pace {
                    Some(pace) => pace.restore(actor, world),
                    None => return BehaviorStep::Done,
                }
            }
            return BehaviorStep::Continue;
        }
        if world.controls_locked() {
            return BehaviorStep::Continue;
        }

        let tile = world.tile_size();
        let Some(me) = world.actor(actor) else {
            return BehaviorStep::Done;
        };
        let origin = me.position;
        let facing = me.facing;
        let vision = me.param_f64("vision").unwrap_or(GUARD_VISION);
        let vision_end = origin + heading_to_vec(facing) * vision * tile;

        if !sighted_on_segment(actor, world, origin, vision_end) {
            self.noticed = false;
            self.roam.step(actor, world, dt);
            return BehaviorStep::Continue;
        }
        if let Some(handler) = notice_handler(actor, world) {
            notice(actor, world, &handler, &mut self.noticed);
            return BehaviorStep::Continue;
        }

        let steps = vec![facing; vision.ceil().max(0.0) as usize];
        let mut pursuit = Pursuit::start(actor, world, Approach::March(TileSteps::new(steps)));
        match pursuit.step(actor, world, dt) {
            PursuitStep::Pending => self.pursuit = Some(pursuit),
            PursuitStep::Finished(Some(pace)) => pace.restore(actor, world),
            PursuitStep::Finished(None) => return BehaviorStep::Done,
        }
        BehaviorStep::Continue
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Builds a behavior from the actor's RNG
pub type BehaviorFactory = fn(Pcg32) -> Behavior;

/// Behaviors addressable by name from map data
#[derive(Clone)]
pub struct BehaviorRegistry {
    factories: HashMap<String, BehaviorFactory>,
}

impl BehaviorRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("wander", |rng| Behavior::Wander(Wander::new(rng)));
        registry.register("guard_right", |_| Behavior::Guard(Guard::new(0.0)));
        registry.register("guard_down", |_| Behavior::Guard(Guard::new(90.0)));
        registry.register("guard_left", |_| Behavior::Guard(Guard::new(180.0)));
        registry.register("guard_up", |_| Behavior::Guard(Guard::new(270.0)));
        registry.register("fight_wander", |rng| Behavior::FightWander(FightWander::new(rng)));
        registry.register("guard_wander", |rng| Behavior::GuardWander(GuardWander::new(rng)));
        registry
    }

    pub fn register(&mut self, name: impl Into<String>, factory: BehaviorFactory) {
        self.factories.insert(name.into(), factory);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(&self, name: &str, rng: Pcg32) -> Option<Behavior> {
        self.factories.get(name).map(|factory| factory(rng))
    }
}

impl Default for BehaviorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for BehaviorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("BehaviorRegistry").field("names", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::sim::actor::Actor;
    use crate::sim::layer::{Layer, LayerId};

    const DT: f64 = 1.0 / 60.0;

    fn open_world() -> (World, LayerId) {
        let mut world = World::default();
        let layer = world.add_layer(Layer::new("field"));
        (world, layer)
    }

    fn step_for(world: &mut World, id: ActorId, behavior: &mut Behavior, frames: usize) -> BehaviorStep {
        let mut last = BehaviorStep::Continue;
        for _ in 0..frames {
            last = behavior.step(id, world, DT);
            if !matches!(last, BehaviorStep::Continue) {
                break;
            }
        }
        last
    }

    #[test]
    fn test_alert_gate_is_exclusive() {
        let (mut world, layer) = open_world();
        let a = world.spawn_actor(layer, Actor::new("a", DVec2::ZERO)).unwrap();
        let b = world.spawn_actor(layer, Actor::new("b", DVec2::ZERO)).unwrap();
        let mut gate = AlertGate::default();
        assert!(gate.try_acquire(a));
        assert!(gate.try_acquire(a));
        assert!(!gate.try_acquire(b));
        assert!(!gate.release(b));
        assert!(gate.release(a));
        assert!(gate.try_acquire(b));
        assert_eq!(gate.holder(), Some(b));
    }

    #[test]
    fn test_stun_resumes_previous_behavior() {
        let mut stun = Behavior::Stun(Stun::new(0.5, Some(Behavior::path(vec![(0.0, 10.0)]))));
        let (mut world, layer) = open_world();
        let id = world.spawn_actor(layer, Actor::new("npc", DVec2::ZERO)).unwrap();
        match step_for(&mut world, id, &mut stun, 60) {
            BehaviorStep::Replace(b) => assert_eq!(b.name(), "path"),
            other => panic!("expected replace, got {other:?}"),
        }
        assert_eq!(world.actor(id).unwrap().position, DVec2::ZERO);
    }

    #[test]
    fn test_stun_without_resume_finishes() {
        let (mut world, layer) = open_world();
        let id = world.spawn_actor(layer, Actor::new("npc", DVec2::ZERO)).unwrap();
        let mut stun = Behavior::Stun(Stun::new(0.1, None));
        assert!(matches!(step_for(&mut world, id, &mut stun, 60), BehaviorStep::Done));
    }

    #[test]
    fn test_adopt_resume_only_fills_empty_stun() {
        let mut stun = Behavior::Stun(Stun::new(1.0, None));
        assert!(stun.adopt_resume(Behavior::path(vec![])).is_none());
        let rejected = stun.adopt_resume(Behavior::tile_steps(vec![]));
        assert_eq!(rejected.map(|b| b.name()), Some("tile_steps"));
        let mut walk = Behavior::path(vec![]);
        assert!(walk.adopt_resume(Behavior::tile_steps(vec![])).is_some());
        let Behavior::Stun(inner) = &stun else {
            panic!("not a stun");
        };
        assert_eq!(inner.resume.as_ref().unwrap().name(), "path");
    }

    #[test]
    fn test_path_walks_legs_exactly() {
        let (mut world, layer) = open_world();
        let id = world.spawn_actor(layer, Actor::new("npc", DVec2::ZERO)).unwrap();
        let mut walk = Behavior::path(vec![(0.0, 20.0), (90.0, 0.0), (90.0, 10.0)]);
        assert!(matches!(step_for(&mut world, id, &mut walk, 120), BehaviorStep::Done));
        let p = world.actor(id).unwrap().position;
        assert!((p.x - 20.0).abs() < 1e-6, "x = {}", p.x);
        assert!((p.y - 10.0).abs() < 1e-6, "y = {}", p.y);
    }

    #[test]
    fn test_tile_steps_land_on_tile() {
        let (mut world, layer) = open_world();
        let id = world
            .spawn_actor(layer, Actor::new("npc", DVec2::new(8.0, 8.0)))
            .unwrap();
        let mut steps = Behavior::tile_steps(vec![0.0, 0.0, 90.0]);
        assert!(matches!(step_for(&mut world, id, &mut steps, 120), BehaviorStep::Done));
        assert_eq!(world.actor(id).unwrap().position, DVec2::new(40.0, 24.0));
    }

    #[test]
    fn test_wander_is_deterministic_and_respects_lock() {
        let run = |locked: bool| {
            let (mut world, layer) = open_world();
            let id = world
                .spawn_actor(layer, Actor::new("npc", DVec2::new(100.0, 100.0)))
                .unwrap();
            if locked {
                world.lock_controls();
            }
            let mut wander = world.behaviors.create("wander", world.behavior_rng(id)).unwrap();
            step_for(&mut world, id, &mut wander, 300);
            world.actor(id).unwrap().position
        };
        assert_eq!(run(false), run(false));
        assert_eq!(run(true), DVec2::new(100.0, 100.0));
    }

    fn guard_scene() -> (World, ActorId, ActorId) {
        let (mut world, layer) = open_world();
        let player = world
            .spawn_actor(layer, Actor::new("hero", DVec2::new(100.0, 100.0)))
            .unwrap();
        world.set_player(Some(player));
        let guard = world
            .spawn_actor(layer, Actor::new("guard", DVec2::new(52.0, 100.0)))
            .unwrap();
        (world, player, guard)
    }

    #[test]
    fn test_guard_chases_fights_and_returns() {
        let (mut world, player, guard) = guard_scene();
        let fights = Rc::new(Cell::new(0));
        let seen = Rc::clone(&fights);
        world.handlers.register(FIGHT_HANDLER, move |world: &mut World, ctx| {
            seen.set(seen.get() + 1);
            // Win the fight: send the player out of sight
            if let Some(p) = world.player() {
                world.place_actor(p, DVec2::new(100.0, 400.0), world.actor(ctx.actor).unwrap().layer()).unwrap();
            }
        });

        let mut behavior = world.behaviors.create("guard_right", world.behavior_rng(guard)).unwrap();
        behavior.step(guard, &mut world, DT);
        assert!(world.controls_locked());
        assert!(behavior.is_chasing());
        assert_eq!(world.alert_gate().holder(), Some(guard));
        assert_eq!(world.actor(guard).unwrap().emote.as_deref(), Some("!"));
        assert!(!world.actor(guard).unwrap().respects_obstructions);

        step_for(&mut world, guard, &mut behavior, 200);
        assert_eq!(fights.get(), 1);
        assert!(!world.controls_locked());
        assert!(!world.alert_gate().is_held());

        let g = world.actor(guard).unwrap();
        assert!((g.position - DVec2::new(52.0, 100.0)).length() < 1e-6);
        assert_eq!(g.facing, 0.0);
        assert!(g.respects_obstructions);
        assert!(g.emote.is_none());
        assert_eq!(world.actor(player).unwrap().position, DVec2::new(100.0, 400.0));
    }

    #[test]
    fn test_replacing_a_pursuit_releases_gate_and_controls() {
        let (mut world, _, guard) = guard_scene();
        let mut behavior = world.behaviors.create("guard_right", world.behavior_rng(guard)).unwrap();
        behavior.step(guard, &mut world, DT);
        assert!(behavior.is_chasing());
        world.set_behavior(guard, Some(behavior));
        assert!(world.controls_locked());

        world.set_behavior(guard, Some(Behavior::path(vec![])));
        assert!(!world.controls_locked());
        assert!(!world.alert_gate().is_held());
        let g = world.actor(guard).unwrap();
        assert!(g.respects_obstructions);
        assert!(g.emote.is_none());
        assert_eq!(g.behavior().map(Behavior::name), Some("path"));
    }

    #[test]
    fn test_reassigning_a_waiting_guard_drops_only_its_lock() {
        let (mut world, _, west) = guard_scene();
        let layer = world.actor(west).unwrap().layer();
        let east = world
            .spawn_actor(layer, Actor::new("guard", DVec2::new(148.0, 100.0)))
            .unwrap();
        let mut chaser = world.behaviors.create("guard_right", world.behavior_rng(west)).unwrap();
        let mut waiter = world.behaviors.create("guard_left", world.behavior_rng(east)).unwrap();
        chaser.step(west, &mut world, DT);
        waiter.step(east, &mut world, DT);
        assert_eq!(world.alert_gate().holder(), Some(west));
        assert!(!waiter.is_chasing());
        world.set_behavior(west, Some(chaser));
        world.set_behavior(east, Some(waiter));

        assert!(world.assign_behavior(east, "wander"));
        assert!(world.controls_locked());
        assert_eq!(world.alert_gate().holder(), Some(west));

        world.set_behavior(west, None);
        assert!(!world.controls_locked());
        assert!(!world.alert_gate().is_held());
    }

    #[test]
    fn test_destroying_a_stunned_pursuer_releases_controls() {
        let (mut world, _, guard) = guard_scene();
        let mut behavior = world.behaviors.create("guard_right", world.behavior_rng(guard)).unwrap();
        behavior.step(guard, &mut world, DT);
        world.set_behavior(guard, Some(behavior));
        world.stun(guard, 5.0);
        // A stun only pauses the pursuit
        assert!(world.controls_locked());
        assert_eq!(world.alert_gate().holder(), Some(guard));

        world.destroy_actor(guard).unwrap();
        assert!(!world.controls_locked());
        assert!(!world.alert_gate().is_held());
    }

    #[test]
    fn test_guard_notice_handler_replaces_pursuit() {
        let (mut world, _, guard) = guard_scene();
        world
            .actor_mut(guard)
            .unwrap()
            .params
            .insert("notice".into(), serde_json::json!("hail"));
        let calls = Rc::new(Cell::new(0));
        let seen = Rc::clone(&calls);
        world.handlers.register("hail", move |_, ctx| {
            assert_eq!(ctx.kind, EventKind::Notice);
            seen.set(seen.get() + 1);
        });

        let mut behavior = Behavior::Guard(Guard::new(0.0));
        step_for(&mut world, guard, &mut behavior, 30);
        assert_eq!(calls.get(), 1);
        assert!(!world.controls_locked());
        assert!(!world.alert_gate().is_held());
        assert_eq!(world.actor(guard).unwrap().position, DVec2::new(52.0, 100.0));
    }

    #[test]
    fn test_guard_ignores_player_on_other_layer() {
        let (mut world, player, guard) = guard_scene();
        let upper = world.add_layer(Layer::new("upper"));
        world.place_actor(player, DVec2::new(100.0, 100.0), upper).unwrap();
        let mut behavior = Behavior::Guard(Guard::new(0.0));
        step_for(&mut world, guard, &mut behavior, 10);
        assert!(!world.controls_locked());
    }

    #[test]
    fn test_guard_wander_marches_vision_tiles() {
        let (mut world, layer) = open_world();
        let player = world
            .spawn_actor(layer, Actor::new("hero", DVec2::new(100.0, 100.0)))
            .unwrap();
        world.set_player(Some(player));
        let id = world
            .spawn_actor(
                layer,
                Actor::new("sentry", DVec2::new(60.0, 100.0)).with_param("vision", serde_json::json!(2.5)),
            )
            .unwrap();

        let mut behavior = world.behaviors.create("guard_wander", world.behavior_rng(id)).unwrap();
        behavior.step(id, &mut world, DT);
        assert!(behavior.is_chasing());
        for _ in 0..200 {
            behavior.step(id, &mut world, DT);
            if !behavior.is_chasing() {
                break;
            }
        }
        // ceil(2.5) tiles straight ahead, through the player
        assert_eq!(world.actor(id).unwrap().position, DVec2::new(108.0, 100.0));
        assert!(!world.controls_locked());
    }

    #[test]
    fn test_fight_wander_sights_within_radius() {
        let (mut world, layer) = open_world();
        let player = world
            .spawn_actor(layer, Actor::new("hero", DVec2::new(100.0, 100.0)))
            .unwrap();
        world.set_player(Some(player));
        let id = world
            .spawn_actor(layer, Actor::new("slime", DVec2::new(100.0, 130.0)))
            .unwrap();
        let mut behavior = world.behaviors.create("fight_wander", world.behavior_rng(id)).unwrap();
        behavior.step(id, &mut world, DT);
        assert!(behavior.is_chasing());
        for _ in 0..60 {
            behavior.step(id, &mut world, DT);
            if !behavior.is_chasing() {
                break;
            }
        }
        let gap = world.actor(id).unwrap().position.distance(DVec2::new(100.0, 100.0));
        assert!(gap <= 16.0 + 1e-9);
        assert!(!behavior.is_chasing());
        assert!(world.actor(id).unwrap().respects_obstructions);
    }

    #[test]
    fn test_registry_names() {
        let registry = BehaviorRegistry::with_builtins();
        for name in ["wander", "guard_right", "guard_down", "guard_left", "guard_up", "fight_wander", "guard_wander"] {
            assert!(registry.contains(name), "{name}");
        }
        let rng = Pcg32::new(1, 1);
        let Some(Behavior::Guard(g)) = registry.create("guard_up", rng) else {
            panic!("guard_up");
        };
        assert_eq!(g.direction(), 270.0);
        assert!(registry.create("moonwalk", Pcg32::new(1, 1)).is_none());
    }
}
