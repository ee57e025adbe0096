//! Agent components - identity, navigation state, speed and steering.

use pherotrail_logic::config::NavConfig;
use pherotrail_logic::{AgentId, Vec3};
use serde::{Deserialize, Serialize};

/// Marker component carrying the agent's stable id.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Agent(pub AgentId);

/// Index of a waypoint route registered on the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RouteId(pub u32);

/// Navigation state machine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NavState {
    /// Walking forward toward route waypoint `index`.
    Seeking(usize),
    /// Walking back toward recorded path position `index`.
    Returning(usize),
    /// Back at the origin, counting down before the next loop.
    WaitingAtOrigin { remaining: f32 },
    /// Finished or interrupted; never moves again.
    Disabled,
}

impl NavState {
    /// True while the agent walks (seeking or returning).
    pub fn is_moving(&self) -> bool {
        matches!(self, NavState::Seeking(_) | NavState::Returning(_))
    }

    pub fn is_disabled(&self) -> bool {
        matches!(self, NavState::Disabled)
    }
}

/// Per-agent navigation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Navigator {
    pub route: RouteId,
    pub state: NavState,
    /// Positions recorded on each forward arrival; replayed backwards.
    pub path_history: Vec<Vec3>,
    /// Seconds spent on the current trip.
    pub elapsed: f32,
    /// Completed round trips.
    pub trips: u32,
    pub config: NavConfig,
}

impl Navigator {
    pub fn new(route: RouteId, config: NavConfig) -> Self {
        Self {
            route,
            state: NavState::Seeking(0),
            path_history: Vec::new(),
            elapsed: 0.0,
            trips: 0,
            config,
        }
    }

    /// Reset to the start of a fresh loop.
    pub fn begin_loop(&mut self) {
        self.state = NavState::Seeking(0);
        self.path_history.clear();
        self.elapsed = 0.0;
    }
}

/// Current and nominal movement speed in units per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Speed {
    pub current: f32,
    /// Speed restored when no faster peer is around (after cargo reduction).
    pub nominal: f32,
}

impl Speed {
    pub fn new(nominal: f32) -> Self {
        Self {
            current: nominal,
            nominal,
        }
    }
}

/// Lateral steering written by the avoidance pass, read by navigation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Steering(pub Vec3);

/// Units of cargo carried; slows the agent down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cargo(pub u32);
