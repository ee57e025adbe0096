//! Systems - logic that operates on components
//!
//! Every system takes the tick's agent order (ascending `AgentId`) so that
//! results never depend on ECS archetype iteration order.

mod avoidance;
mod navigation;
mod trigger;

pub use avoidance::*;
pub use navigation::*;
pub use trigger::*;
