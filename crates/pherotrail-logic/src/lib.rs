//! Pure navigation logic for pherotrail.
//!
//! Everything in this crate is independent of the ECS world and of any host
//! engine. Functions take plain data and return results, so the waypoint,
//! pheromone and steering rules can be unit-tested on their own and reused
//! by any simulation loop.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`avoidance`] | Right-hand-priority lateral steering from peer speeds |
//! | [`config`] | Tuning parameters for agents, avoidance and pheromones |
//! | [`error`] | `NavError`, shared by every fallible operation |
//! | [`geometry`] | `Vec3` math, heading interpolation, displacement capping |
//! | [`pheromone`] | Per-agent decaying trails with a shared strength scalar |
//! | [`speed`] | Cargo-load speed reduction |
//! | [`waypoints`] | Ordered waypoint routes with local pheromone strength |

pub mod avoidance;
pub mod config;
pub mod error;
pub mod geometry;
pub mod pheromone;
pub mod speed;
pub mod waypoints;

pub use error::NavError;
pub use geometry::Vec3;

/// Stable identity of a navigating agent.
///
/// Allocated in ascending order by the simulation root; every cross-agent
/// pass iterates in `AgentId` order so results are reproducible.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent#{}", self.0)
    }
}
