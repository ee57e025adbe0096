//! Trigger system - disables agents that come near a trigger entity

use hecs::{Entity, World};
use pherotrail_logic::AgentId;

use crate::components::{EntityTag, NavState, Navigator, Transform, TriggerId};
use crate::events::NavEvent;
use crate::spatial::SpatialIndex;

/// Disable every non-disabled agent with a trigger inside its `trigger_radius`.
///
/// Runs before movement, so an interrupted agent does not move that tick.
pub fn trigger_system(
    world: &mut World,
    order: &[(AgentId, Entity)],
    index: &dyn SpatialIndex,
    events: &mut Vec<NavEvent>,
) {
    for &(id, entity) in order {
        let Ok((nav, transform)) = world.query_one_mut::<(&mut Navigator, &Transform)>(entity)
        else {
            continue;
        };
        if nav.state.is_disabled() {
            continue;
        }

        let hits = index.query(transform.position, nav.config.trigger_radius, EntityTag::Trigger);
        if let Some(hit) = hits.first() {
            nav.state = NavState::Disabled;
            log::info!(
                "{} interrupted by trigger {} after {:.2}s",
                id,
                hit.id,
                nav.elapsed
            );
            events.push(NavEvent::Interrupted {
                agent: id,
                trigger: TriggerId(hit.id),
                elapsed: nav.elapsed,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Agent, RouteId, Speed, Trigger};
    use crate::spatial::SnapshotIndex;
    use pherotrail_logic::config::NavConfig;
    use pherotrail_logic::Vec3;

    fn spawn_agent(world: &mut World, id: u32, x: f32) -> Entity {
        world.spawn((
            Agent(AgentId(id)),
            Transform::at(Vec3::new(x, 0.0, 0.0)),
            Speed::new(5.0),
            Navigator::new(RouteId(0), NavConfig::default()),
        ))
    }

    #[test]
    fn test_trigger_in_range_disables() {
        let mut world = World::new();
        let near = spawn_agent(&mut world, 1, 0.0);
        let far = spawn_agent(&mut world, 2, 50.0);
        world.spawn((Trigger(TriggerId(7)), Transform::at(Vec3::new(3.0, 0.0, 0.0))));

        let index = SnapshotIndex::capture(&world);
        let order = vec![(AgentId(1), near), (AgentId(2), far)];
        let mut events = Vec::new();
        trigger_system(&mut world, &order, &index, &mut events);

        assert!(world.get::<&Navigator>(near).unwrap().state.is_disabled());
        assert!(!world.get::<&Navigator>(far).unwrap().state.is_disabled());
        assert_eq!(
            events,
            vec![NavEvent::Interrupted {
                agent: AgentId(1),
                trigger: TriggerId(7),
                elapsed: 0.0,
            }]
        );
    }

    #[test]
    fn test_disabled_agent_not_interrupted_twice() {
        let mut world = World::new();
        let e = spawn_agent(&mut world, 1, 0.0);
        world.get::<&mut Navigator>(e).unwrap().state = NavState::Disabled;
        world.spawn((Trigger(TriggerId(0)), Transform::at(Vec3::ZERO)));

        let index = SnapshotIndex::capture(&world);
        let mut events = Vec::new();
        trigger_system(&mut world, &[(AgentId(1), e)], &index, &mut events);
        assert!(events.is_empty());
    }
}
