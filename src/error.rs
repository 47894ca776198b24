//! Errors for load-time and handle operations
//!
//! Per-frame movement never fails; these only surface from loading
//! configuration or map definitions and from addressing actors or layers
//! that do not exist.

use crate::sim::{ActorId, LayerId};

/// Error type for world construction and actor management
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unknown layer: {0}")]
    UnknownLayer(String),
    #[error("Layer index out of range: {0:?}")]
    LayerOutOfRange(LayerId),
    #[error("Actor {0} no longer exists")]
    StaleActor(ActorId),
    #[error("Actor key already in use: {0}")]
    DuplicateKey(String),
    #[error("Unknown actor key: {0}")]
    UnknownActor(String),
}
