//! Navigation system - moves agents along their routes and drives the
//! seek / return / wait state machine.

use hecs::{Entity, World};
use pherotrail_logic::config::TripCycle;
use pherotrail_logic::geometry::{capped_step, turn_toward};
use pherotrail_logic::pheromone::PheromoneField;
use pherotrail_logic::waypoints::WaypointGraph;
use pherotrail_logic::{AgentId, NavError, Vec3};

use crate::components::{NavState, Navigator, Speed, Steering, Transform};
use crate::events::NavEvent;

/// Shared mutable state a navigation step writes into.
pub struct TickContext<'a> {
    pub dt: f32,
    pub field: &'a mut PheromoneField,
    pub events: &'a mut Vec<NavEvent>,
}

/// Advance every agent by one tick, in `order`.
///
/// A failing agent is logged and skipped; the rest keep ticking. With
/// `spatial_bound == false` walking agents stay inert.
pub fn navigation_system(
    world: &mut World,
    order: &[(AgentId, Entity)],
    routes: &mut [WaypointGraph],
    spatial_bound: bool,
    ctx: &mut TickContext<'_>,
) {
    for &(id, entity) in order {
        let Ok((nav, transform, speed, steering)) = world
            .query_one_mut::<(&mut Navigator, &mut Transform, &Speed, Option<&Steering>)>(entity)
        else {
            continue;
        };

        let result = if nav.state.is_moving() && !spatial_bound {
            Err(NavError::UnboundDependency("spatial index"))
        } else {
            let steering = steering.map(|s| s.0).unwrap_or(Vec3::ZERO);
            match routes.get_mut(nav.route.0 as usize) {
                Some(route) => step_agent(id, nav, transform, speed, steering, route, ctx),
                None => Err(NavError::config(format!("unknown route {}", nav.route.0))),
            }
        };

        if let Err(e) = result {
            log::warn!("{} skipped this tick: {}", id, e);
        }
    }
}

/// One tick of one agent: wait timers, motion, then arrival handling.
pub fn step_agent(
    id: AgentId,
    nav: &mut Navigator,
    transform: &mut Transform,
    speed: &Speed,
    steering: Vec3,
    route: &mut WaypointGraph,
    ctx: &mut TickContext<'_>,
) -> Result<(), NavError> {
    match nav.state {
        NavState::Disabled => return Ok(()),
        NavState::WaitingAtOrigin { remaining } => {
            let remaining = remaining - ctx.dt;
            if remaining <= 0.0 {
                nav.begin_loop();
                log::debug!("{} starting loop {}", id, nav.trips + 1);
                ctx.events.push(NavEvent::LoopRestarted { agent: id });
            } else {
                nav.state = NavState::WaitingAtOrigin { remaining };
            }
            return Ok(());
        }
        NavState::Seeking(_) | NavState::Returning(_) => {}
    }

    let target = current_target(nav, route)?;
    nav.elapsed += ctx.dt;

    // never step past the target
    let remaining = transform.position.distance(&target);
    let max_step = nav.config.movement_radius.min(remaining);
    let direction = (target - transform.position).normalize() + steering;
    let step = capped_step(direction, speed.current, ctx.dt, max_step);
    transform.position += step;
    transform.heading = turn_toward(transform.heading, step, nav.config.rotation_speed, ctx.dt);

    if transform.position.distance(&target) <= nav.config.waypoint_reach_threshold {
        arrive(id, nav, transform.position, route, ctx)?;
    }
    Ok(())
}

/// Position the agent is currently walking toward.
pub fn current_target(nav: &Navigator, route: &WaypointGraph) -> Result<Vec3, NavError> {
    match nav.state {
        NavState::Seeking(index) => route.waypoint_at(index),
        NavState::Returning(index) => {
            nav.path_history
                .get(index)
                .copied()
                .ok_or(NavError::IndexOutOfRange {
                    index,
                    count: nav.path_history.len(),
                })
        }
        NavState::WaitingAtOrigin { .. } | NavState::Disabled => {
            Err(NavError::config("agent has no target while idle"))
        }
    }
}

fn arrive(
    id: AgentId,
    nav: &mut Navigator,
    position: Vec3,
    route: &mut WaypointGraph,
    ctx: &mut TickContext<'_>,
) -> Result<(), NavError> {
    match nav.state {
        NavState::Seeking(index) => {
            let last = route.last_index();
            if index > last {
                return Err(NavError::IndexOutOfRange {
                    index,
                    count: route.count(),
                });
            }

            let previous = nav.path_history.last().copied();
            nav.path_history.push(position);
            route.reinforce(index, nav.config.pheromone.waypoint_deposit)?;
            if let Some(from) = previous {
                ctx.field.deposit(id, from, position);
            }
            log::debug!("{} reached waypoint {}/{}", id, index, last);
            ctx.events.push(NavEvent::WaypointReached { agent: id, index });

            if index == last {
                nav.state = NavState::Returning(nav.path_history.len() - 1);
                ctx.events.push(NavEvent::ReturnStarted { agent: id });
            } else {
                nav.state = NavState::Seeking(index + 1);
            }
        }
        NavState::Returning(0) => {
            nav.trips += 1;
            let elapsed = nav.elapsed;
            log::info!("{} completed round trip {} in {:.2}s", id, nav.trips, elapsed);
            ctx.events.push(NavEvent::RoundTripComplete { agent: id, elapsed });
            nav.state = match nav.config.trip_cycle {
                TripCycle::Once => NavState::Disabled,
                TripCycle::Repeat { wait_seconds } => NavState::WaitingAtOrigin {
                    remaining: wait_seconds,
                },
            };
        }
        NavState::Returning(index) => {
            nav.state = NavState::Returning(index - 1);
        }
        NavState::WaitingAtOrigin { .. } | NavState::Disabled => {}
    }
    Ok(())
}
