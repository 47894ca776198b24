//! Deterministic simulation module
//!
//! All movement and behavior logic lives here. This module must stay pure
//! and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (layer order, then each layer's actor list)
//! - No rendering or platform dependencies

pub mod actor;
pub mod behavior;
pub mod boundary;
pub mod collision;
pub mod geometry;
pub mod handlers;
pub mod layer;
pub mod obstruction;
pub mod slide;
pub mod tick;
pub mod world;
pub mod zone;

pub use actor::{Actor, ActorId, Animation};
pub use behavior::{AlertGate, Behavior, BehaviorRegistry, BehaviorStep, FIGHT_HANDLER};
pub use boundary::BoundaryBuilder;
pub use geometry::{Polygon, Rect};
pub use handlers::{EventContext, EventKind, HandlerTable};
pub use layer::{Layer, LayerId};
pub use obstruction::{Obstruction, ObstructionId};
pub use slide::MoveOutcome;
pub use tick::{TickInput, tick};
pub use world::{LAYER_DOWN_HANDLER, LAYER_UP_HANDLER, World};
pub use zone::{RectEvent, WALKABLE_FLAG, Zone, ZoneEvents};
