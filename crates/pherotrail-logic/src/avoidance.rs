//! Local avoidance steering with right-hand priority.
//!
//! For every peer in range the agent compares speeds. A faster peer makes
//! the agent yield: it slows down and slides to its left. A slower (or
//! equally fast) peer lets it keep nominal speed and pass on the right.
//! The lateral push is `sidestep_distance / distance`, so closer peers
//! push harder, and contributions from several peers add up.
//!
//! All comparisons use the speeds sampled at the start of the tick. The
//! resulting [`AvoidanceAdjustment`] is applied afterwards, so the order in
//! which peers are visited never changes the outcome.

use serde::{Deserialize, Serialize};

use crate::config::AvoidanceConfig;
use crate::geometry::Vec3;
use crate::AgentId;

/// A nearby agent as seen at the start of the tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeerSample {
    pub id: AgentId,
    pub position: Vec3,
    pub speed: f32,
}

/// The steering agent's own state at the start of the tick.
#[derive(Debug, Clone, Copy)]
pub struct SteeringInput {
    pub id: AgentId,
    pub position: Vec3,
    pub speed: f32,
    pub nominal_speed: f32,
    pub min_speed: f32,
}

/// Result of the avoidance pass for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AvoidanceAdjustment {
    /// Summed lateral contribution, added to the seek direction.
    pub steering: Vec3,
    /// Speed to use for this tick.
    pub speed: f32,
    /// True when at least one faster peer was in range.
    pub yielding: bool,
}

/// Which side a single peer pushes the agent toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassSide {
    Left,
    Right,
}

/// Side taken against one peer: a strictly faster peer claims the right lane.
pub fn pass_side(own_speed: f32, peer_speed: f32) -> PassSide {
    if peer_speed > own_speed {
        PassSide::Left
    } else {
        PassSide::Right
    }
}

/// Lateral contribution of a single peer at `offset` (peer minus self).
///
/// Returns `None` for peers out of range, on top of the agent, or straight
/// above or below it (no horizontal perpendicular).
pub fn peer_contribution(
    offset: Vec3,
    side: PassSide,
    config: &AvoidanceConfig,
) -> Option<Vec3> {
    let distance = offset.length();
    if distance <= f32::EPSILON || distance > config.detection_radius {
        return None;
    }
    let right = Vec3::right_of(&(offset * (1.0 / distance)));
    if right == Vec3::ZERO {
        return None;
    }
    let scale = config.sidestep_distance / distance;
    Some(match side {
        PassSide::Right => right * scale,
        PassSide::Left => -right * scale,
    })
}

/// Compute the steering vector and tick speed for `own` against `peers`.
///
/// `peers` may contain the agent itself; it is skipped by id.
pub fn compute_avoidance(
    own: &SteeringInput,
    peers: &[PeerSample],
    config: &AvoidanceConfig,
) -> AvoidanceAdjustment {
    let mut steering = Vec3::ZERO;
    let mut yielding = false;

    for peer in peers.iter().filter(|p| p.id != own.id) {
        let side = pass_side(own.speed, peer.speed);
        if let Some(push) = peer_contribution(peer.position - own.position, side, config) {
            steering += push;
            yielding |= side == PassSide::Left;
        }
    }

    let speed = if yielding {
        config.slow_speed.max(own.min_speed)
    } else {
        own.nominal_speed.max(own.min_speed)
    };

    AvoidanceAdjustment {
        steering,
        speed,
        yielding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(id: u32, x: f32, speed: f32) -> SteeringInput {
        SteeringInput {
            id: AgentId(id),
            position: Vec3::new(x, 0.0, 0.0),
            speed,
            nominal_speed: speed,
            min_speed: 1.0,
        }
    }

    fn sample(s: &SteeringInput) -> PeerSample {
        PeerSample {
            id: s.id,
            position: s.position,
            speed: s.speed,
        }
    }

    #[test]
    fn test_head_on_faster_takes_right() {
        let config = AvoidanceConfig::default();
        let a = input(1, 0.0, 10.0);
        let b = input(2, 4.0, 5.0);
        let peers = [sample(&a), sample(&b)];

        let adj_a = compute_avoidance(&a, &peers, &config);
        let adj_b = compute_avoidance(&b, &peers, &config);

        let a_right = Vec3::right_of(&(b.position - a.position));
        let b_right = Vec3::right_of(&(a.position - b.position));
        assert!(adj_a.steering.dot(&a_right) > 0.0, "faster agent passes right");
        assert!(adj_b.steering.dot(&b_right) < 0.0, "slower agent yields left");
        assert!(!adj_a.yielding);
        assert!(adj_b.yielding);
    }

    #[test]
    fn test_swapping_speeds_swaps_sides() {
        let config = AvoidanceConfig::default();
        let a = input(1, 0.0, 5.0);
        let b = input(2, 4.0, 10.0);
        let peers = [sample(&a), sample(&b)];

        let adj_a = compute_avoidance(&a, &peers, &config);
        let a_right = Vec3::right_of(&(b.position - a.position));
        assert!(adj_a.steering.dot(&a_right) < 0.0);
        assert!(adj_a.yielding);
    }

    #[test]
    fn test_equal_speed_defaults_to_right() {
        assert_eq!(pass_side(5.0, 5.0), PassSide::Right);
        assert_eq!(pass_side(5.0, 5.1), PassSide::Left);
    }

    #[test]
    fn test_yield_speed_respects_min_speed() {
        let config = AvoidanceConfig {
            slow_speed: 0.2,
            ..AvoidanceConfig::default()
        };
        let a = input(1, 0.0, 3.0);
        let fast = PeerSample {
            id: AgentId(2),
            position: Vec3::new(2.0, 0.0, 0.0),
            speed: 9.0,
        };
        let adj = compute_avoidance(&a, &[fast], &config);
        assert_eq!(adj.speed, 1.0);
    }

    #[test]
    fn test_push_scales_inverse_distance() {
        let config = AvoidanceConfig::default();
        let near = peer_contribution(Vec3::new(1.0, 0.0, 0.0), PassSide::Right, &config).unwrap();
        let far = peer_contribution(Vec3::new(3.0, 0.0, 0.0), PassSide::Right, &config).unwrap();
        assert!((near.length() - 3.0).abs() < 1e-5);
        assert!((far.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_out_of_range_and_degenerate_ignored() {
        let config = AvoidanceConfig::default();
        assert!(peer_contribution(Vec3::new(6.0, 0.0, 0.0), PassSide::Right, &config).is_none());
        assert!(peer_contribution(Vec3::ZERO, PassSide::Right, &config).is_none());
        assert!(peer_contribution(Vec3::new(0.0, 2.0, 0.0), PassSide::Right, &config).is_none());
    }

    #[test]
    fn test_contributions_sum_and_order_independent() {
        let config = AvoidanceConfig::default();
        let own = input(1, 0.0, 5.0);
        let p1 = PeerSample {
            id: AgentId(2),
            position: Vec3::new(2.0, 0.0, 1.0),
            speed: 8.0,
        };
        let p2 = PeerSample {
            id: AgentId(3),
            position: Vec3::new(-1.0, 0.0, 3.0),
            speed: 2.0,
        };
        let forward = compute_avoidance(&own, &[p1, p2], &config);
        let reversed = compute_avoidance(&own, &[p2, p1], &config);
        assert!((forward.steering - reversed.steering).length() < 1e-5);
        assert_eq!(forward.speed, reversed.speed);
        assert!(forward.yielding);
    }

    #[test]
    fn test_no_peers_restores_nominal() {
        let config = AvoidanceConfig::default();
        let mut own = input(1, 0.0, 2.0);
        own.nominal_speed = 6.0;
        let adj = compute_avoidance(&own, &[], &config);
        assert_eq!(adj.steering, Vec3::ZERO);
        assert_eq!(adj.speed, 6.0);
    }
}
