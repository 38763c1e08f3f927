//! Batch commands
//!
//! Construction and destruction requests submitted as one unit.
//! A batch always yields exactly one `CommandResponse` per `Command`, in order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{ActorId, Transform};

/// Spawn request: blueprint selector plus placement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnCommand {
    /// Blueprint id, e.g. "vehicle.audi.tt"
    pub blueprint: String,

    /// Attribute overrides applied to the blueprint before spawning
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,

    /// Placement (relative to `parent` when present)
    pub transform: Transform,

    /// Parent actor (pedestrian controllers attach to their pedestrian)
    #[serde(default)]
    pub parent: Option<ActorId>,

    /// Enable autopilot on this traffic-manager port right after spawning
    #[serde(default)]
    pub autopilot_port: Option<u16>,
}

impl SpawnCommand {
    pub fn new(blueprint: impl Into<String>, transform: Transform) -> Self {
        Self {
            blueprint: blueprint.into(),
            attributes: BTreeMap::new(),
            transform,
            parent: None,
            autopilot_port: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_parent(mut self, parent: ActorId) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_autopilot(mut self, tm_port: u16) -> Self {
        self.autopilot_port = Some(tm_port);
        self
    }

    /// Attribute override, if set
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Batch command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    Spawn(SpawnCommand),
    Destroy(ActorId),
}

/// Per-command batch result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandResponse {
    /// Command applied; carries the affected actor
    Ok(ActorId),
    /// Command rejected by the simulator
    Failed(String),
}

impl CommandResponse {
    pub fn actor_id(&self) -> Option<ActorId> {
        match self {
            Self::Ok(id) => Some(*id),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Failed(message) => Some(message),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}
