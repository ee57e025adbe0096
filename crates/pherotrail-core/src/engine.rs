//! Navigation engine - main entry point for running the simulation

use std::collections::BTreeMap;

use hecs::{Entity, World};
use pherotrail_logic::config::NavConfig;
use pherotrail_logic::pheromone::{PheromoneField, TrailSegment};
use pherotrail_logic::speed::laden_speed;
use pherotrail_logic::waypoints::WaypointGraph;
use pherotrail_logic::{AgentId, NavError, Vec3};

use crate::components::*;
use crate::events::{HandOff, NavEvent, PendingHandOff};
use crate::spatial::{SnapshotIndex, SpatialIndex};
use crate::systems::*;

/// Where agents get their neighbour queries from.
pub enum SpatialBinding {
    /// Snapshot the ECS world at the start of every tick.
    World,
    /// A host-provided index (e.g. backed by a physics engine).
    External(Box<dyn SpatialIndex>),
    /// Nothing bound; walking agents stay inert and a warning is logged.
    Unbound,
}

/// Parameters for spawning one agent.
#[derive(Debug, Clone, Copy)]
pub struct AgentSpawn {
    pub route: RouteId,
    /// Start position; defaults to the route's first waypoint.
    pub position: Option<Vec3>,
    /// Per-agent tuning; defaults to the engine config.
    ///
    /// Only the navigation, avoidance and deposit-amount fields apply per
    /// agent. Trail decay (`pheromone.decay_mode`, `decay_rate`,
    /// `min_deposit_distance`, `waypoint_decay_rate`) belongs to the shared
    /// field and always follows the engine config.
    pub config: Option<NavConfig>,
    pub cargo: u32,
}

impl AgentSpawn {
    pub fn on(route: RouteId) -> Self {
        Self {
            route,
            position: None,
            config: None,
            cargo: 0,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_config(mut self, config: NavConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_cargo(mut self, cargo: u32) -> Self {
        self.cargo = cargo;
        self
    }
}

/// Read-only copy of one agent's state.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentView {
    pub id: AgentId,
    pub route: RouteId,
    pub state: NavState,
    pub position: Vec3,
    pub heading: Vec3,
    pub speed: f32,
    pub nominal_speed: f32,
    pub elapsed: f32,
    pub trips: u32,
    pub cargo: u32,
    pub path_history: Vec<Vec3>,
}

/// Main simulation engine
pub struct NavigationEngine {
    /// ECS world containing agents and triggers
    pub world: World,
    /// Shared pheromone trail registry
    field: PheromoneField,
    /// Registered routes, indexed by `RouteId`
    routes: Vec<WaypointGraph>,
    /// Default tuning for spawned agents and waypoint decay
    config: NavConfig,
    spatial: SpatialBinding,
    handoff: Option<Box<dyn HandOff>>,
    pending: Vec<PendingHandOff>,
    events: Vec<NavEvent>,

    // Stable iteration order
    agents: BTreeMap<AgentId, Entity>,
    triggers: BTreeMap<TriggerId, Entity>,
    next_agent: u32,
    next_trigger: u32,

    // Timing
    sim_time: f64,
    tick_count: u64,
    time_scale: f32,
}

impl NavigationEngine {
    /// Create an empty engine. Fails if `config` does not validate.
    pub fn new(config: NavConfig) -> Result<Self, NavError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: NavConfig) -> Self {
        Self {
            world: World::new(),
            field: PheromoneField::new(&config.pheromone),
            routes: Vec::new(),
            config,
            spatial: SpatialBinding::World,
            handoff: None,
            pending: Vec::new(),
            events: Vec::new(),
            agents: BTreeMap::new(),
            triggers: BTreeMap::new(),
            next_agent: 0,
            next_trigger: 0,
            sim_time: 0.0,
            tick_count: 0,
            time_scale: 1.0,
        }
    }

    pub fn config(&self) -> &NavConfig {
        &self.config
    }

    /// Register a route agents can be spawned on.
    pub fn add_route(&mut self, route: WaypointGraph) -> RouteId {
        let id = RouteId(self.routes.len() as u32);
        self.routes.push(route);
        id
    }

    pub fn route(&self, id: RouteId) -> Option<&WaypointGraph> {
        self.routes.get(id.0 as usize)
    }

    /// Spawn an agent on its first waypoint with the engine's config.
    pub fn spawn_agent(&mut self, route: RouteId) -> Result<AgentId, NavError> {
        self.spawn(AgentSpawn::on(route))
    }

    /// Spawn an agent. Nothing is created if the route is unknown or the
    /// config does not validate.
    pub fn spawn(&mut self, spawn: AgentSpawn) -> Result<AgentId, NavError> {
        let config = spawn.config.unwrap_or(self.config);
        config.validate()?;
        let route = self
            .route(spawn.route)
            .ok_or_else(|| NavError::config(format!("unknown route {}", spawn.route.0)))?;
        let position = match spawn.position {
            Some(p) if !p.is_finite() => {
                return Err(NavError::config("spawn position is not finite"));
            }
            Some(p) => p,
            None => route.waypoint_at(0)?,
        };

        let nominal = laden_speed(
            config.move_speed,
            spawn.cargo,
            config.reduction_percent,
            config.min_speed,
        );
        let id = AgentId(self.next_agent);
        self.next_agent += 1;

        let entity = self.world.spawn((
            Agent(id),
            Transform::at(position),
            Speed::new(nominal),
            Steering::default(),
            Cargo(spawn.cargo),
            Navigator::new(spawn.route, config),
        ));
        self.agents.insert(id, entity);
        log::info!(
            "spawned {} on route {} at speed {:.2}",
            id,
            spawn.route.0,
            nominal
        );
        Ok(id)
    }

    /// Remove an agent together with its trail and any pending hand-off.
    pub fn despawn_agent(&mut self, id: AgentId) -> bool {
        let Some(entity) = self.agents.remove(&id) else {
            return false;
        };
        if let Err(e) = self.world.despawn(entity) {
            log::warn!("{} had no entity to despawn: {}", id, e);
        }
        self.field.forget(id);
        self.pending.retain(|p| p.agent != id);
        true
    }

    /// Change an agent's load and recompute its nominal speed.
    pub fn set_cargo(&mut self, id: AgentId, cargo: u32) -> Result<(), NavError> {
        let entity = self.agent_entity(id)?;
        let (nav, speed, load) = self
            .world
            .query_one_mut::<(&Navigator, &mut Speed, &mut Cargo)>(entity)
            .map_err(|_| NavError::config(format!("{} has no navigator", id)))?;
        load.0 = cargo;
        speed.nominal = laden_speed(
            nav.config.move_speed,
            cargo,
            nav.config.reduction_percent,
            nav.config.min_speed,
        );
        speed.current = speed.nominal;
        Ok(())
    }

    pub fn spawn_trigger(&mut self, position: Vec3) -> TriggerId {
        let id = TriggerId(self.next_trigger);
        self.next_trigger += 1;
        let entity = self.world.spawn((Trigger(id), Transform::at(position)));
        self.triggers.insert(id, entity);
        id
    }

    pub fn move_trigger(&mut self, id: TriggerId, position: Vec3) -> Result<(), NavError> {
        let entity = *self
            .triggers
            .get(&id)
            .ok_or_else(|| NavError::config(format!("unknown trigger {}", id.0)))?;
        let mut transform = self
            .world
            .get::<&mut Transform>(entity)
            .map_err(|_| NavError::config(format!("trigger {} has no transform", id.0)))?;
        transform.position = position;
        Ok(())
    }

    pub fn despawn_trigger(&mut self, id: TriggerId) -> bool {
        match self.triggers.remove(&id) {
            Some(entity) => self.world.despawn(entity).is_ok(),
            None => false,
        }
    }

    /// Use a host-provided spatial index instead of the world snapshot.
    pub fn bind_spatial_index(&mut self, index: Box<dyn SpatialIndex>) {
        self.spatial = SpatialBinding::External(index);
    }

    /// Snapshot the ECS world every tick (the default).
    pub fn use_world_index(&mut self) {
        self.spatial = SpatialBinding::World;
    }

    pub fn unbind_spatial_index(&mut self) {
        self.spatial = SpatialBinding::Unbound;
    }

    pub fn set_handoff(&mut self, handoff: impl HandOff + 'static) {
        self.handoff = Some(Box::new(handoff));
    }

    pub fn clear_handoff(&mut self) {
        self.handoff = None;
    }

    /// Take every event recorded since the last drain.
    pub fn drain_events(&mut self) -> Vec<NavEvent> {
        std::mem::take(&mut self.events)
    }

    /// Update the simulation by delta_seconds
    pub fn update(&mut self, delta_seconds: f32) {
        let dt = delta_seconds * self.time_scale;
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.sim_time += dt as f64;
        self.tick_count += 1;

        let order: Vec<(AgentId, Entity)> = self.agents.iter().map(|(id, e)| (*id, *e)).collect();
        let first_event = self.events.len();

        // Snapshot (or external index)
        let snapshot;
        let index: Option<&dyn SpatialIndex> = match &self.spatial {
            SpatialBinding::World => {
                snapshot = SnapshotIndex::capture(&self.world);
                Some(&snapshot as &dyn SpatialIndex)
            }
            SpatialBinding::External(index) => Some(&**index),
            SpatialBinding::Unbound => None,
        };

        // Trigger and avoidance passes read the tick-start index
        if let Some(index) = index {
            trigger_system(&mut self.world, &order, index, &mut self.events);
            avoidance_system(&mut self.world, &order, index);
        }

        let mut ctx = TickContext {
            dt,
            field: &mut self.field,
            events: &mut self.events,
        };
        navigation_system(
            &mut self.world,
            &order,
            &mut self.routes,
            index.is_some(),
            &mut ctx,
        );

        // Pheromone decay, once per tick
        self.field.decay_tick(dt);
        for route in &mut self.routes {
            route.decay(self.config.pheromone.waypoint_decay_rate, dt);
        }

        self.schedule_handoffs(first_event, dt);
        self.fire_handoffs();
    }

    /// Count down existing hand-offs, then queue one for every trip that
    /// ended this tick.
    fn schedule_handoffs(&mut self, first_event: usize, dt: f32) {
        for pending in &mut self.pending {
            pending.remaining -= dt;
        }

        for event in &self.events[first_event..] {
            let Some(elapsed) = event.finished_trip() else {
                continue;
            };
            let agent = event.agent();
            let delay = self
                .agents
                .get(&agent)
                .and_then(|&e| self.world.get::<&Navigator>(e).ok().map(|n| n.config.handoff_delay))
                .unwrap_or(self.config.handoff_delay);
            self.pending.push(PendingHandOff {
                agent,
                elapsed,
                remaining: delay,
            });
        }
    }

    fn fire_handoffs(&mut self) {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|p| p.remaining <= 0.0);
        self.pending = waiting;

        for pending in due {
            match self.handoff.as_mut() {
                Some(target) => {
                    target.on_round_trip_complete(pending.agent, pending.elapsed);
                    log::info!(
                        "{} handed off after {:.2}s",
                        pending.agent,
                        pending.elapsed
                    );
                    self.events.push(NavEvent::HandedOff {
                        agent: pending.agent,
                        elapsed: pending.elapsed,
                    });
                }
                None => log::warn!(
                    "{} finished its trip: {}",
                    pending.agent,
                    NavError::UnboundDependency("hand-off target")
                ),
            }
        }
    }

    fn agent_entity(&self, id: AgentId) -> Result<Entity, NavError> {
        self.agents
            .get(&id)
            .copied()
            .ok_or_else(|| NavError::config(format!("unknown {}", id)))
    }

    /// Snapshot of one agent, or `None` if it does not exist.
    pub fn agent(&self, id: AgentId) -> Option<AgentView> {
        let entity = *self.agents.get(&id)?;
        let mut query = self
            .world
            .query_one::<(&Navigator, &Transform, &Speed, Option<&Cargo>)>(entity)
            .ok()?;
        let (nav, transform, speed, cargo) = query.get()?;
        Some(AgentView {
            id,
            route: nav.route,
            state: nav.state,
            position: transform.position,
            heading: transform.heading,
            speed: speed.current,
            nominal_speed: speed.nominal,
            elapsed: nav.elapsed,
            trips: nav.trips,
            cargo: cargo.map(|c| c.0).unwrap_or(0),
            path_history: nav.path_history.clone(),
        })
    }

    pub fn agent_state(&self, id: AgentId) -> Option<NavState> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<&Navigator>(entity).ok().map(|n| n.state)
    }

    pub fn agent_position(&self, id: AgentId) -> Option<Vec3> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<&Transform>(entity).ok().map(|t| t.position)
    }

    pub fn agent_speed(&self, id: AgentId) -> Option<f32> {
        let entity = *self.agents.get(&id)?;
        self.world.get::<&Speed>(entity).ok().map(|s| s.current)
    }

    /// Agent ids in ascending order.
    pub fn agent_ids(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Agents that are not disabled.
    pub fn active_count(&self) -> usize {
        self.world
            .query::<&Navigator>()
            .iter()
            .filter(|(_, nav)| !nav.state.is_disabled())
            .count()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }

    pub fn field(&self) -> &PheromoneField {
        &self.field
    }

    pub fn trail_of(&self, id: AgentId) -> &[Vec3] {
        self.field.trail_of(id)
    }

    pub fn segments_of(&self, id: AgentId) -> Vec<TrailSegment> {
        self.field.segments_of(id)
    }

    /// Set time scale (1.0 = real-time, 2.0 = 2x speed, etc.)
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Simulated seconds since start
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }
}

impl Default for NavigationEngine {
    fn default() -> Self {
        Self::build(NavConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pherotrail_logic::config::TripCycle;
    use std::cell::RefCell;
    use std::rc::Rc;

    const DT: f32 = 1.0 / 16.0;

    fn scenario_config() -> NavConfig {
        NavConfig {
            waypoint_reach_threshold: 1.0,
            move_speed: 5.0,
            ..NavConfig::default()
        }
    }

    fn straight_route() -> WaypointGraph {
        WaypointGraph::new([Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0)]).unwrap()
    }

    #[test]
    fn test_engine_creation() {
        let engine = NavigationEngine::default();
        assert_eq!(engine.agent_count(), 0);
        assert_eq!(engine.sim_time(), 0.0);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = NavConfig {
            movement_radius: 0.0,
            ..NavConfig::default()
        };
        assert!(NavigationEngine::new(config).is_err());
    }

    #[test]
    fn test_spawn_on_unknown_route_fails() {
        let mut engine = NavigationEngine::default();
        assert!(matches!(
            engine.spawn_agent(RouteId(3)),
            Err(NavError::Configuration(_))
        ));
        assert_eq!(engine.agent_count(), 0);
    }

    #[test]
    fn test_reaches_far_waypoint_on_schedule() {
        let mut engine = NavigationEngine::new(scenario_config()).unwrap();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();

        let mut ticks = 0;
        let mut reached = None;
        while reached.is_none() && ticks < 1000 {
            engine.update(DT);
            ticks += 1;
            if engine
                .drain_events()
                .contains(&NavEvent::WaypointReached { agent: id, index: 1 })
            {
                reached = Some(ticks);
            }
        }
        let expected = ((10.0f32 - 1.0) / 5.0 * 16.0).ceil() as i32;
        let reached = reached.expect("agent never reached waypoint 1");
        assert!((reached - expected).abs() <= 1, "reached at tick {}", reached);
    }

    #[test]
    fn test_round_trip_time_matches_ticks() {
        let mut engine = NavigationEngine::new(scenario_config()).unwrap();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        engine.set_handoff(move |agent: AgentId, elapsed: f32| sink.borrow_mut().push((agent, elapsed)));

        let mut ticks = 0u32;
        while engine.active_count() > 0 && ticks < 1000 {
            engine.update(DT);
            ticks += 1;
        }

        assert_eq!(engine.agent_state(id), Some(NavState::Disabled));
        let seen = seen.borrow();
        assert_eq!(seen.len(), 1);
        let (agent, elapsed) = seen[0];
        assert_eq!(agent, id);
        assert!((elapsed - ticks as f32 * DT).abs() <= DT + 1e-4);
        assert_eq!(engine.field().deposit_count(id), 1);
    }

    #[test]
    fn test_unbound_index_keeps_agents_inert() {
        let mut engine = NavigationEngine::default();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();
        engine.unbind_spatial_index();

        for _ in 0..10 {
            engine.update(0.1);
        }
        assert_eq!(engine.agent_position(id), Some(Vec3::ZERO));
        assert_eq!(engine.agent_state(id), Some(NavState::Seeking(0)));

        engine.use_world_index();
        engine.update(0.1);
        assert_ne!(engine.agent_state(id), Some(NavState::Seeking(0)));
    }

    #[test]
    fn test_trigger_interrupts_and_hands_off() {
        let mut engine = NavigationEngine::default();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();

        let calls = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&calls);
        engine.set_handoff(move |_: AgentId, _: f32| *counter.borrow_mut() += 1);
        engine.spawn_trigger(Vec3::new(2.0, 0.0, 0.0));
        engine.update(0.1);

        assert_eq!(engine.agent_state(id), Some(NavState::Disabled));
        assert_eq!(engine.agent_position(id), Some(Vec3::ZERO));
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_delayed_handoff_fires_later() {
        let config = NavConfig {
            handoff_delay: 0.25,
            ..NavConfig::default()
        };
        let mut engine = NavigationEngine::new(config).unwrap();
        let route = engine.add_route(straight_route());
        engine.spawn_agent(route).unwrap();
        engine.set_handoff(|_: AgentId, _: f32| {});
        engine.spawn_trigger(Vec3::ZERO);

        engine.update(0.1);
        let first = engine.drain_events();
        assert!(first.iter().any(|e| matches!(e, NavEvent::Interrupted { .. })));
        assert!(!first.iter().any(|e| matches!(e, NavEvent::HandedOff { .. })));

        engine.update(0.1);
        engine.update(0.1);
        assert!(engine.drain_events().is_empty());
        engine.update(0.1);
        assert!(engine
            .drain_events()
            .iter()
            .any(|e| matches!(e, NavEvent::HandedOff { .. })));
    }

    #[test]
    fn test_repeat_cycle_loops() {
        let config = NavConfig {
            trip_cycle: TripCycle::Repeat { wait_seconds: 0.5 },
            ..scenario_config()
        };
        let mut engine = NavigationEngine::new(config).unwrap();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();

        for _ in 0..400 {
            engine.update(DT);
        }
        let view = engine.agent(id).unwrap();
        assert!(view.trips >= 2, "only {} trips", view.trips);
        assert!(!view.state.is_disabled());
    }

    #[test]
    fn test_cargo_slows_agent() {
        let mut engine = NavigationEngine::default();
        let route = engine.add_route(straight_route());
        let id = engine.spawn(AgentSpawn::on(route).with_cargo(2)).unwrap();
        assert_eq!(engine.agent_speed(id), Some(4.0));

        engine.set_cargo(id, 0).unwrap();
        assert_eq!(engine.agent_speed(id), Some(5.0));
        assert!(engine.set_cargo(AgentId(99), 1).is_err());
    }

    #[test]
    fn test_despawn_forgets_trail() {
        let mut engine = NavigationEngine::new(scenario_config()).unwrap();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();
        for _ in 0..40 {
            engine.update(DT);
        }
        assert!(!engine.trail_of(id).is_empty());

        assert!(engine.despawn_agent(id));
        assert!(engine.trail_of(id).is_empty());
        assert_eq!(engine.agent(id), None);
        assert!(!engine.despawn_agent(id));
    }

    #[test]
    fn test_despawn_after_entity_already_gone() {
        let mut engine = NavigationEngine::new(scenario_config()).unwrap();
        let route = engine.add_route(straight_route());
        let id = engine.spawn_agent(route).unwrap();
        for _ in 0..40 {
            engine.update(DT);
        }
        let entity = engine.agents[&id];
        engine.world.despawn(entity).unwrap();

        assert!(engine.despawn_agent(id));
        assert!(engine.trail_of(id).is_empty());
        assert_eq!(engine.agent_count(), 0);
    }

    #[test]
    fn test_trail_decay_follows_engine_config() {
        let strength_after = |agent_config: Option<NavConfig>| {
            let mut engine = NavigationEngine::new(scenario_config()).unwrap();
            let route = engine.add_route(straight_route());
            let mut spawn = AgentSpawn::on(route);
            if let Some(config) = agent_config {
                spawn = spawn.with_config(config);
            }
            engine.spawn(spawn).unwrap();
            for _ in 0..80 {
                engine.update(DT);
            }
            engine.field().strength()
        };

        let mut fast_decay = scenario_config();
        fast_decay.pheromone.decay_rate = 100.0;
        fast_decay.pheromone.waypoint_decay_rate = 100.0;
        assert_eq!(strength_after(Some(fast_decay)), strength_after(None));
    }

    #[test]
    fn test_time_scale() {
        let mut engine = NavigationEngine::default();
        engine.set_time_scale(2.0);
        engine.update(1.0);
        assert!((engine.sim_time() - 2.0).abs() < 1e-6);

        engine.set_time_scale(0.0);
        engine.update(1.0);
        assert_eq!(engine.tick_count(), 1);
    }
}
