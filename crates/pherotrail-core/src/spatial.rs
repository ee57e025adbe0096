//! Spatial queries - the seam to the host's physics engine.
//!
//! Agents never look at the world directly to find neighbours. They ask a
//! `SpatialIndex` for every entity with a given tag inside a radius. Hosts
//! with their own physics bind an implementation; otherwise the engine
//! captures a `SnapshotIndex` of the ECS world at the start of each tick,
//! so every agent in a tick sees the same positions and speeds.

use hecs::World;
use pherotrail_logic::Vec3;
use serde::{Deserialize, Serialize};

use crate::components::{Agent, EntityTag, Speed, Transform, Trigger};

/// One entity returned by a spatial query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialHit {
    /// Tag-scoped id: an `AgentId` for agents, a `TriggerId` for triggers.
    pub id: u32,
    pub position: Vec3,
    /// Zero for entities that do not move.
    pub speed: f32,
}

/// Radius queries by tag (abstracts a physics overlap-sphere query).
pub trait SpatialIndex {
    /// Every entity carrying `tag` within Euclidean `radius` of `position`.
    fn query(&self, position: Vec3, radius: f32, tag: EntityTag) -> Vec<SpatialHit>;
}

/// Brute-force index over a frozen copy of the world.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIndex {
    entries: Vec<(EntityTag, SpatialHit)>,
}

impl SnapshotIndex {
    /// Capture every agent and trigger, ordered by tag then id.
    pub fn capture(world: &World) -> Self {
        let mut entries = Vec::new();

        for (_, (agent, transform, speed)) in world.query::<(&Agent, &Transform, &Speed)>().iter() {
            entries.push((
                EntityTag::Agent,
                SpatialHit {
                    id: agent.0 .0,
                    position: transform.position,
                    speed: speed.current,
                },
            ));
        }

        for (_, (trigger, transform)) in world.query::<(&Trigger, &Transform)>().iter() {
            entries.push((
                EntityTag::Trigger,
                SpatialHit {
                    id: trigger.0 .0,
                    position: transform.position,
                    speed: 0.0,
                },
            ));
        }

        entries.sort_by_key(|(tag, hit)| (*tag, hit.id));
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add an entry by hand, for hosts that feed positions themselves.
    pub fn insert(&mut self, tag: EntityTag, hit: SpatialHit) {
        let at = self
            .entries
            .partition_point(|(t, h)| (*t, h.id) < (tag, hit.id));
        self.entries.insert(at, (tag, hit));
    }
}

impl SpatialIndex for SnapshotIndex {
    fn query(&self, position: Vec3, radius: f32, tag: EntityTag) -> Vec<SpatialHit> {
        let radius_sq = radius * radius;
        self.entries
            .iter()
            .filter(|(t, hit)| *t == tag && hit.position.distance_squared(&position) <= radius_sq)
            .map(|(_, hit)| *hit)
            .collect()
    }
}
