//! Ordered waypoint routes.
//!
//! A `WaypointGraph` is the fixed sequence of points an agent walks out and
//! back along. Positions never change after construction; each waypoint
//! also carries a local pheromone strength that arriving agents reinforce
//! and the simulation decays every tick.

use serde::{Deserialize, Serialize};

use crate::error::NavError;
use crate::geometry::Vec3;

/// A fixed point on a route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    position: Vec3,
    /// Local pheromone strength, always >= 0.
    pheromone: f32,
}

impl Waypoint {
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            pheromone: 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn pheromone(&self) -> f32 {
        self.pheromone
    }

    fn decay(&mut self, decay_rate: f32, dt: f32) {
        self.pheromone = (self.pheromone - decay_rate * dt).max(0.0);
    }
}

/// Ordered, non-empty sequence of waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointGraph {
    waypoints: Vec<Waypoint>,
}

impl WaypointGraph {
    /// Build a route from positions. Fails on an empty or non-finite route.
    pub fn new(positions: impl IntoIterator<Item = Vec3>) -> Result<Self, NavError> {
        let waypoints: Vec<Waypoint> = positions.into_iter().map(Waypoint::new).collect();
        if waypoints.is_empty() {
            return Err(NavError::config("waypoint route is empty"));
        }
        if let Some(i) = waypoints.iter().position(|w| !w.position.is_finite()) {
            return Err(NavError::config(format!("waypoint {} is not finite", i)));
        }
        Ok(Self { waypoints })
    }

    pub fn count(&self) -> usize {
        self.waypoints.len()
    }

    pub fn last_index(&self) -> usize {
        self.waypoints.len() - 1
    }

    pub fn waypoint_at(&self, index: usize) -> Result<Vec3, NavError> {
        self.get(index).map(|w| w.position)
    }

    pub fn strength_at(&self, index: usize) -> Result<f32, NavError> {
        self.get(index).map(|w| w.pheromone)
    }

    /// Add pheromone to one waypoint.
    pub fn reinforce(&mut self, index: usize, amount: f32) -> Result<(), NavError> {
        let count = self.waypoints.len();
        let waypoint = self
            .waypoints
            .get_mut(index)
            .ok_or(NavError::IndexOutOfRange { index, count })?;
        waypoint.pheromone += amount.max(0.0);
        Ok(())
    }

    /// Decay every waypoint's local pheromone, floored at zero.
    pub fn decay(&mut self, decay_rate: f32, dt: f32) {
        for waypoint in &mut self.waypoints {
            waypoint.decay(decay_rate, dt);
        }
    }

    /// All positions in route order, for path visualization.
    pub fn positions(&self) -> Vec<Vec3> {
        self.waypoints.iter().map(|w| w.position).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.waypoints.iter()
    }

    fn get(&self, index: usize) -> Result<&Waypoint, NavError> {
        self.waypoints.get(index).ok_or(NavError::IndexOutOfRange {
            index,
            count: self.waypoints.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> WaypointGraph {
        WaypointGraph::new((0..n).map(|i| Vec3::new(i as f32 * 10.0, 0.0, 0.0))).unwrap()
    }

    #[test]
    fn test_empty_route_rejected() {
        let err = WaypointGraph::new(Vec::new()).unwrap_err();
        assert!(matches!(err, NavError::Configuration(_)));
    }

    #[test]
    fn test_non_finite_rejected() {
        let err = WaypointGraph::new(vec![Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, NavError::Configuration(_)));
    }

    #[test]
    fn test_waypoint_at_and_count() {
        let route = line(3);
        assert_eq!(route.count(), 3);
        assert_eq!(route.last_index(), 2);
        assert_eq!(route.waypoint_at(2).unwrap(), Vec3::new(20.0, 0.0, 0.0));
    }

    #[test]
    fn test_out_of_range_fails_fast() {
        let route = line(2);
        assert_eq!(
            route.waypoint_at(2),
            Err(NavError::IndexOutOfRange { index: 2, count: 2 })
        );
        let mut route = route;
        assert!(route.reinforce(5, 1.0).is_err());
    }

    #[test]
    fn test_local_pheromone_decays_to_zero() {
        let mut route = line(2);
        route.reinforce(1, 1.0).unwrap();
        route.decay(0.5, 1.0);
        assert!((route.strength_at(1).unwrap() - 0.5).abs() < 1e-6);
        route.decay(0.5, 10.0);
        assert_eq!(route.strength_at(1).unwrap(), 0.0);
        assert_eq!(route.strength_at(0).unwrap(), 0.0);
    }
}
