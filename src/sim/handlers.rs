//! Named event handlers
//!
//! Zones, tile events, triggers and actors name the handler they fire. The
//! table maps those names to closures; a name with no entry is a no-op.

use std::collections::HashMap;
use std::fmt;

use glam::DVec2;

use super::actor::ActorId;
use super::world::World;

/// What raised a handler invocation
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    /// The actor moved into a zone carrying an `onEnter` hook
    ZoneEnter { zone: String },
    /// The actor left a zone carrying an `onExit` hook
    ZoneExit { zone: String },
    /// The actor stepped into a new tile inside a tile event's rectangle
    Tile { event: usize },
    /// The actor interacted with a trigger
    Trigger { trigger: usize },
    /// The actor interacted with another actor
    Interact { target: ActorId },
    /// A pursuing actor reached its quarry
    Fight,
    /// A watching actor spotted the player and hands off to a script
    Notice,
}

/// Arguments passed to a handler
#[derive(Debug, Clone, PartialEq)]
pub struct EventContext {
    /// The actor that caused the event
    pub actor: ActorId,
    pub kind: EventKind,
    /// World position the event was raised at
    pub position: DVec2,
    /// Tile containing `position`
    pub tile: (i64, i64),
}

pub type Handler = Box<dyn FnMut(&mut World, &EventContext)>;

/// Name -> handler mapping
#[derive(Default)]
pub struct HandlerTable {
    handlers: HashMap<String, Handler>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the handler for `name`
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl FnMut(&mut World, &EventContext) + 'static,
    ) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.handlers.remove(name).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Check a handler out for the duration of a call
    pub(crate) fn take(&mut self, name: &str) -> Option<Handler> {
        self.handlers.remove(name)
    }

    /// Return a checked-out handler unless the call registered a replacement
    pub(crate) fn restore(&mut self, name: &str, handler: Handler) {
        self.handlers.entry(name.to_string()).or_insert(handler);
    }
}

impl fmt::Debug for HandlerTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerTable").field("names", &names).finish()
    }
}
