//! Per-agent pheromone trails.
//!
//! Each agent owns an ordered list of deposited positions; every deposit is
//! a two-point segment. Trail strength is one scalar shared by the whole
//! field: it decays every tick, never drops below zero, and only rises when
//! a deposit reinforces it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{DecayMode, PheromoneConfig};
use crate::geometry::Vec3;
use crate::AgentId;

/// One drawable piece of a trail. Older pieces fade toward zero alpha.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailSegment {
    pub from: Vec3,
    pub to: Vec3,
    pub alpha: f32,
}

/// Registry of every agent's trail plus the shared strength scalar.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PheromoneField {
    trails: BTreeMap<AgentId, Vec<Vec3>>,
    strength: f32,
    max_strength: f32,
    decay_rate: f32,
    reinforcement: f32,
    min_deposit_distance: f32,
    mode: DecayMode,
}

impl PheromoneField {
    pub fn new(config: &PheromoneConfig) -> Self {
        Self {
            trails: BTreeMap::new(),
            strength: config.initial_strength.max(0.0),
            max_strength: config.max_strength,
            decay_rate: config.decay_rate,
            reinforcement: config.reinforcement,
            min_deposit_distance: config.min_deposit_distance,
            mode: config.decay_mode,
        }
    }

    /// Append the segment `from -> to` to `agent`'s trail.
    ///
    /// Dropped when `to` is closer than the minimum deposit distance to the
    /// agent's previous deposit (or to `from` on an empty trail).
    pub fn deposit(&mut self, agent: AgentId, from: Vec3, to: Vec3) {
        let anchor = self
            .trails
            .get(&agent)
            .and_then(|t| t.last().copied())
            .unwrap_or(from);
        if anchor.distance(&to) < self.min_deposit_distance {
            return;
        }

        let trail = self.trails.entry(agent).or_default();
        trail.push(from);
        trail.push(to);

        if self.reinforcement > 0.0 {
            self.strength = (self.strength + self.reinforcement)
                .min(self.max_strength)
                .max(self.strength);
        }
    }

    /// Decay the shared strength for one tick of `dt` seconds.
    ///
    /// Nothing decays while no trail is tracked, and a zero `dt` is a no-op.
    pub fn decay_tick(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        let steps = match self.mode {
            DecayMode::PerTick => usize::from(!self.trails.is_empty()),
            DecayMode::PerPoint => self.trails.values().map(Vec::len).sum(),
        };
        if steps == 0 {
            return;
        }
        self.strength = (self.strength - self.decay_rate * dt * steps as f32).max(0.0);
    }

    /// Read-only view of an agent's deposited positions (empty if unknown).
    pub fn trail_of(&self, agent: AgentId) -> &[Vec3] {
        self.trails.get(&agent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of deposits accepted for `agent`.
    pub fn deposit_count(&self, agent: AgentId) -> usize {
        self.trail_of(agent).len() / 2
    }

    /// Consecutive trail segments with alpha fading from 1 at the oldest
    /// point toward 0 at the newest.
    pub fn segments_of(&self, agent: AgentId) -> Vec<TrailSegment> {
        let points = self.trail_of(agent);
        let len = points.len() as f32;
        points
            .windows(2)
            .enumerate()
            .map(|(i, pair)| TrailSegment {
                from: pair[0],
                to: pair[1],
                alpha: (1.0 - i as f32 / len).clamp(0.0, 1.0),
            })
            .collect()
    }

    pub fn strength(&self) -> f32 {
        self.strength
    }

    pub fn mode(&self) -> DecayMode {
        self.mode
    }

    pub fn tracked_agents(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.trails.keys().copied()
    }

    /// Drop an agent's trail, e.g. when it is despawned.
    pub fn forget(&mut self, agent: AgentId) {
        self.trails.remove(&agent);
    }

    pub fn clear(&mut self) {
        self.trails.clear();
    }
}

impl Default for PheromoneField {
    fn default() -> Self {
        Self::new(&PheromoneConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: AgentId = AgentId(1);
    const B: AgentId = AgentId(2);

    fn x(v: f32) -> Vec3 {
        Vec3::new(v, 0.0, 0.0)
    }

    #[test]
    fn test_deposit_appends_two_points() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(5.0));
        assert_eq!(field.trail_of(A), &[x(0.0), x(5.0)]);
        assert_eq!(field.deposit_count(A), 1);
        assert!(field.trail_of(B).is_empty());
    }

    #[test]
    fn test_deposit_below_threshold_dropped() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(0.05));
        assert!(field.trail_of(A).is_empty());

        field.deposit(A, x(0.0), x(5.0));
        // Too close to the last deposit at 5.0
        field.deposit(A, x(5.0), x(5.05));
        assert_eq!(field.deposit_count(A), 1);
    }

    #[test]
    fn test_decay_zero_dt_is_noop() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(5.0));
        let before = field.strength();
        field.decay_tick(0.0);
        assert_eq!(field.strength(), before);
    }

    #[test]
    fn test_no_decay_without_trails() {
        let mut field = PheromoneField::default();
        field.decay_tick(1.0);
        assert_eq!(field.strength(), 1.0);
    }

    #[test]
    fn test_per_tick_decay_ignores_trail_length() {
        let mut field = PheromoneField::default();
        for i in 0..10 {
            field.deposit(A, x(i as f32), x(i as f32 + 1.0));
        }
        field.decay_tick(1.0);
        assert!((field.strength() - 0.95).abs() < 1e-6);
    }

    #[test]
    fn test_per_point_decay_scales_with_points() {
        let config = PheromoneConfig {
            decay_mode: DecayMode::PerPoint,
            ..PheromoneConfig::default()
        };
        let mut field = PheromoneField::new(&config);
        field.deposit(A, x(0.0), x(1.0));
        field.deposit(B, x(0.0), x(1.0));
        // 4 tracked points
        field.decay_tick(1.0);
        assert!((field.strength() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_strength_floors_at_zero_and_is_monotonic() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(1.0));
        let mut last = field.strength();
        for _ in 0..100 {
            field.decay_tick(0.5);
            assert!(field.strength() <= last);
            assert!(field.strength() >= 0.0);
            last = field.strength();
        }
        assert_eq!(field.strength(), 0.0);
    }

    #[test]
    fn test_reinforcement_capped() {
        let config = PheromoneConfig {
            initial_strength: 0.5,
            reinforcement: 0.3,
            max_strength: 1.0,
            ..PheromoneConfig::default()
        };
        let mut field = PheromoneField::new(&config);
        field.deposit(A, x(0.0), x(1.0));
        assert!((field.strength() - 0.8).abs() < 1e-6);
        field.deposit(A, x(1.0), x(2.0));
        assert_eq!(field.strength(), 1.0);
    }

    #[test]
    fn test_segments_fade() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(1.0));
        field.deposit(A, x(1.0), x(2.0));
        let segments = field.segments_of(A);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].alpha, 1.0);
        assert!(segments[2].alpha < segments[0].alpha);
        assert!(segments.iter().all(|s| s.alpha > 0.0));
    }

    #[test]
    fn test_forget() {
        let mut field = PheromoneField::default();
        field.deposit(A, x(0.0), x(1.0));
        field.deposit(B, x(0.0), x(1.0));
        field.forget(A);
        assert_eq!(field.tracked_agents().collect::<Vec<_>>(), vec![B]);
    }
}
