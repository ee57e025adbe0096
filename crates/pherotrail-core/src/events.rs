//! Navigation events and the hand-off collaborator.

use pherotrail_logic::AgentId;
use serde::{Deserialize, Serialize};

use crate::components::TriggerId;

/// Something that happened to an agent during a tick.
///
/// Collected by the engine in the order they occur; hosts drain them with
/// [`crate::engine::NavigationEngine::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NavEvent {
    /// Arrived at route waypoint `index` on the forward leg.
    WaypointReached { agent: AgentId, index: usize },
    /// Reached the last waypoint and turned around.
    ReturnStarted { agent: AgentId },
    /// Back at the origin after a full round trip.
    RoundTripComplete { agent: AgentId, elapsed: f32 },
    /// A trigger entity came within range and disabled the agent.
    Interrupted {
        agent: AgentId,
        trigger: TriggerId,
        elapsed: f32,
    },
    /// Origin wait finished; a new loop begins.
    LoopRestarted { agent: AgentId },
    /// The hand-off collaborator was signalled.
    HandedOff { agent: AgentId, elapsed: f32 },
}

impl NavEvent {
    pub fn agent(&self) -> AgentId {
        match *self {
            NavEvent::WaypointReached { agent, .. }
            | NavEvent::ReturnStarted { agent }
            | NavEvent::RoundTripComplete { agent, .. }
            | NavEvent::Interrupted { agent, .. }
            | NavEvent::LoopRestarted { agent }
            | NavEvent::HandedOff { agent, .. } => agent,
        }
    }

    /// Trip time to hand off, for events that end a trip.
    pub fn finished_trip(&self) -> Option<f32> {
        match *self {
            NavEvent::RoundTripComplete { elapsed, .. } | NavEvent::Interrupted { elapsed, .. } => {
                Some(elapsed)
            }
            _ => None,
        }
    }
}

/// External collaborator taking over once an agent's trip is over.
pub trait HandOff {
    fn on_round_trip_complete(&mut self, agent: AgentId, elapsed_seconds: f32);
}

impl<F> HandOff for F
where
    F: FnMut(AgentId, f32),
{
    fn on_round_trip_complete(&mut self, agent: AgentId, elapsed_seconds: f32) {
        self(agent, elapsed_seconds)
    }
}

/// A hand-off waiting for its delay to run out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct PendingHandOff {
    pub agent: AgentId,
    pub elapsed: f32,
    pub remaining: f32,
}
