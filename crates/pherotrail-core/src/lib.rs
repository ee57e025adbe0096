//! Pherotrail Core - Multi-Agent Waypoint Navigation Engine
//!
//! An ECS-based simulation of agents walking out and back along waypoint
//! routes, laying pheromone trails on the way out and side-stepping each
//! other by relative speed.
//!
//! # Architecture
//!
//! The simulation uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: Navigating agents and trigger objects
//! - **Components**: Pure data attached to entities (Transform, Navigator, Speed, etc.)
//! - **Systems**: Trigger, avoidance and navigation passes run in ascending agent order
//!
//! Pure rules (geometry, trails, steering) live in `pherotrail-logic`.
//!
//! # Example
//!
//! ```rust,no_run
//! use pherotrail_core::prelude::*;
//!
//! let mut engine = NavigationEngine::default();
//! let route = WaypointGraph::new([Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap();
//! let route = engine.add_route(route);
//! engine.spawn_agent(route).unwrap();
//! engine.set_handoff(|agent: AgentId, secs: f32| println!("{} done in {:.1}s", agent, secs));
//!
//! loop {
//!     engine.update(1.0 / 60.0); // 60 FPS
//! }
//! ```

pub mod components;
pub mod config;
pub mod engine;
pub mod events;
pub mod scenario;
pub mod spatial;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{AgentSpawn, AgentView, NavigationEngine};
    pub use crate::events::{HandOff, NavEvent};
    pub use crate::spatial::{SpatialHit, SpatialIndex};
    pub use pherotrail_logic::config::{NavConfig, TripCycle};
    pub use pherotrail_logic::waypoints::WaypointGraph;
    pub use pherotrail_logic::{AgentId, NavError, Vec3};
}
