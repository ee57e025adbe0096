//! Avoidance system - computes lateral steering and tick speed for every
//! walking agent, then applies all results at once.

use hecs::{Entity, World};
use pherotrail_logic::avoidance::{compute_avoidance, AvoidanceAdjustment, PeerSample, SteeringInput};
use pherotrail_logic::{AgentId, Vec3};

use crate::components::{EntityTag, Navigator, Speed, Steering, Transform};
use crate::spatial::SpatialIndex;

/// Run the avoidance pass.
///
/// Phase one reads only tick-start values (the index and the untouched
/// components); phase two writes `Steering` and `Speed`. Agents that are not
/// walking get zero steering and keep their speed.
pub fn avoidance_system(world: &mut World, order: &[(AgentId, Entity)], index: &dyn SpatialIndex) {
    let mut adjustments: Vec<(Entity, Option<AvoidanceAdjustment>)> =
        Vec::with_capacity(order.len());

    for &(id, entity) in order {
        let Ok((nav, transform, speed)) =
            world.query_one_mut::<(&Navigator, &Transform, &Speed)>(entity)
        else {
            continue;
        };
        if !nav.state.is_moving() {
            adjustments.push((entity, None));
            continue;
        }

        let peers: Vec<PeerSample> = index
            .query(
                transform.position,
                nav.config.avoidance.detection_radius,
                EntityTag::Agent,
            )
            .into_iter()
            .map(|hit| PeerSample {
                id: AgentId(hit.id),
                position: hit.position,
                speed: hit.speed,
            })
            .collect();

        let own = SteeringInput {
            id,
            position: transform.position,
            speed: speed.current,
            nominal_speed: speed.nominal,
            min_speed: nav.config.min_speed,
        };
        let adjustment = compute_avoidance(&own, &peers, &nav.config.avoidance);
        if adjustment.yielding {
            log::debug!("{} yielding at speed {:.2}", id, adjustment.speed);
        }
        adjustments.push((entity, Some(adjustment)));
    }

    for (entity, adjustment) in adjustments {
        let Ok((steering, speed)) = world.query_one_mut::<(&mut Steering, &mut Speed)>(entity)
        else {
            continue;
        };
        match adjustment {
            Some(adj) => {
                steering.0 = adj.steering;
                speed.current = adj.speed;
            }
            None => steering.0 = Vec3::ZERO,
        }
    }
}
