//! Tuning parameters for navigation, avoidance and pheromone trails.
//!
//! All structs are `#[serde(default)]`, so a partial document only
//! overrides the fields it names.

use serde::{Deserialize, Serialize};

use crate::error::NavError;

/// How the shared trail strength decays each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayMode {
    /// Decay once per tick while any trail is tracked.
    #[default]
    PerTick,
    /// Decay once per tracked trail point per tick. Longer trails decay
    /// faster; kept for compatibility with recorded runs.
    PerPoint,
}

/// What an agent does after returning to the first waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripCycle {
    /// Disable after a single round trip.
    #[default]
    Once,
    /// Wait at the origin, then start the next loop.
    Repeat { wait_seconds: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PheromoneConfig {
    pub initial_strength: f32,
    /// Upper bound for reinforcement.
    pub max_strength: f32,
    /// Strength lost per second.
    pub decay_rate: f32,
    /// Strength added per accepted deposit.
    pub reinforcement: f32,
    /// Minimum distance from the previous deposit before a new one is kept.
    pub min_deposit_distance: f32,
    pub decay_mode: DecayMode,
    /// Local strength added to a waypoint each time an agent reaches it.
    pub waypoint_deposit: f32,
    pub waypoint_decay_rate: f32,
}

impl Default for PheromoneConfig {
    fn default() -> Self {
        Self {
            initial_strength: 1.0,
            max_strength: 1.0,
            decay_rate: 0.05,
            reinforcement: 0.0,
            min_deposit_distance: 0.1,
            decay_mode: DecayMode::PerTick,
            waypoint_deposit: 1.0,
            waypoint_decay_rate: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceConfig {
    /// Peers farther than this are ignored.
    pub detection_radius: f32,
    /// Lateral push at one unit of distance; scales with `1 / distance`.
    pub sidestep_distance: f32,
    /// Speed an agent drops to while yielding to a faster peer.
    pub slow_speed: f32,
}

impl Default for AvoidanceConfig {
    fn default() -> Self {
        Self {
            detection_radius: 5.0,
            sidestep_distance: 3.0,
            slow_speed: 2.0,
        }
    }
}

/// Per-agent navigation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavConfig {
    /// Distance at which a waypoint (or recorded path point) counts as reached.
    pub waypoint_reach_threshold: f32,
    /// Nominal speed in units per second.
    pub move_speed: f32,
    /// Hard floor for the current speed.
    pub min_speed: f32,
    /// Heading interpolation rate, fraction per second.
    pub rotation_speed: f32,
    /// Cap on per-tick displacement.
    pub movement_radius: f32,
    /// A trigger entity inside this radius disables the agent.
    pub trigger_radius: f32,
    /// Percent of nominal speed lost per unit of cargo.
    pub reduction_percent: f32,
    /// Seconds between finishing a trip and signalling the hand-off target.
    pub handoff_delay: f32,
    pub trip_cycle: TripCycle,
    pub avoidance: AvoidanceConfig,
    pub pheromone: PheromoneConfig,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            waypoint_reach_threshold: 0.5,
            move_speed: 5.0,
            min_speed: 1.0,
            rotation_speed: 5.0,
            movement_radius: 1.0,
            trigger_radius: 5.0,
            reduction_percent: 10.0,
            handoff_delay: 0.0,
            trip_cycle: TripCycle::Once,
            avoidance: AvoidanceConfig::default(),
            pheromone: PheromoneConfig::default(),
        }
    }
}

impl NavConfig {
    /// Reject values that would make ticking meaningless (NaN, negative radii, ...).
    pub fn validate(&self) -> Result<(), NavError> {
        let non_negative = [
            ("move_speed", self.move_speed),
            ("min_speed", self.min_speed),
            ("rotation_speed", self.rotation_speed),
            ("trigger_radius", self.trigger_radius),
            ("reduction_percent", self.reduction_percent),
            ("handoff_delay", self.handoff_delay),
            ("avoidance.detection_radius", self.avoidance.detection_radius),
            ("avoidance.sidestep_distance", self.avoidance.sidestep_distance),
            ("avoidance.slow_speed", self.avoidance.slow_speed),
            ("pheromone.initial_strength", self.pheromone.initial_strength),
            ("pheromone.max_strength", self.pheromone.max_strength),
            ("pheromone.decay_rate", self.pheromone.decay_rate),
            ("pheromone.reinforcement", self.pheromone.reinforcement),
            ("pheromone.min_deposit_distance", self.pheromone.min_deposit_distance),
            ("pheromone.waypoint_deposit", self.pheromone.waypoint_deposit),
            ("pheromone.waypoint_decay_rate", self.pheromone.waypoint_decay_rate),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(NavError::config(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }

        let positive = [
            ("waypoint_reach_threshold", self.waypoint_reach_threshold),
            ("movement_radius", self.movement_radius),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(NavError::config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }

        if let TripCycle::Repeat { wait_seconds } = self.trip_cycle {
            if !wait_seconds.is_finite() || wait_seconds < 0.0 {
                return Err(NavError::config("trip_cycle wait_seconds must be >= 0"));
            }
        }
        Ok(())
    }
}
