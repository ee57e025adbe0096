//! Common components used by agents and trigger entities.

use pherotrail_logic::Vec3;
use serde::{Deserialize, Serialize};

/// Where an entity is and which way it faces.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    /// Unit facing direction, interpolated toward the movement direction.
    pub heading: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            heading: Vec3::FORWARD,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }
}

/// Tag carried by entities that spatial queries can find.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// A navigating peer agent.
    Agent,
    /// A "detect" object that disables agents coming near it.
    Trigger,
}

/// Identity of a trigger entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TriggerId(pub u32);

/// Marker component for trigger entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Trigger(pub TriggerId);
