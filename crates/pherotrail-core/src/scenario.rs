//! Scenario setup - routes, convoys and triggers described in JSON.

use pherotrail_logic::config::NavConfig;
use pherotrail_logic::waypoints::WaypointGraph;
use pherotrail_logic::{AgentId, NavError, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::RouteId;
use crate::engine::{AgentSpawn, NavigationEngine};

/// A group of agents sharing one route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConvoySpec {
    /// Index into `ScenarioSpec::routes`.
    pub route: usize,
    pub count: u32,
    /// Relative speed variation, e.g. `0.2` for +-20%.
    #[serde(default)]
    pub speed_jitter: f32,
    /// Max horizontal offset from the route's first waypoint.
    #[serde(default)]
    pub spread: f32,
    #[serde(default)]
    pub cargo: u32,
}

/// Everything needed to build and run one scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    pub name: String,
    /// Fixed tick length in seconds.
    pub dt: f32,
    pub max_ticks: u32,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub config: NavConfig,
    pub routes: Vec<Vec<[f32; 3]>>,
    #[serde(default)]
    pub convoys: Vec<ConvoySpec>,
    #[serde(default)]
    pub triggers: Vec<[f32; 3]>,
}

impl ScenarioSpec {
    pub fn from_json(json: &str) -> Result<Self, NavError> {
        let spec: ScenarioSpec = serde_json::from_str(json)
            .map_err(|e| NavError::config(format!("invalid scenario JSON: {}", e)))?;
        if !spec.dt.is_finite() || spec.dt <= 0.0 {
            return Err(NavError::config("scenario dt must be positive"));
        }
        Ok(spec)
    }

    /// Build an engine with every route, convoy and trigger spawned.
    pub fn build(&self, rng: &mut impl Rng) -> Result<(NavigationEngine, Vec<AgentId>), NavError> {
        let mut engine = NavigationEngine::new(self.config)?;

        let mut route_ids = Vec::with_capacity(self.routes.len());
        for points in &self.routes {
            let route = WaypointGraph::new(points.iter().map(|&[x, y, z]| Vec3::new(x, y, z)))?;
            route_ids.push(engine.add_route(route));
        }

        let mut agents = Vec::new();
        for convoy in &self.convoys {
            let route = *route_ids.get(convoy.route).ok_or(NavError::IndexOutOfRange {
                index: convoy.route,
                count: route_ids.len(),
            })?;
            agents.extend(spawn_convoy(&mut engine, route, convoy, rng)?);
        }

        for &[x, y, z] in &self.triggers {
            engine.spawn_trigger(Vec3::new(x, y, z));
        }

        log::info!(
            "scenario '{}': {} routes, {} agents, {} triggers",
            self.name,
            route_ids.len(),
            agents.len(),
            self.triggers.len()
        );
        Ok((engine, agents))
    }
}

/// Spawn `convoy.count` agents around the start of `route` with jittered
/// nominal speeds.
pub fn spawn_convoy(
    engine: &mut NavigationEngine,
    route: RouteId,
    convoy: &ConvoySpec,
    rng: &mut impl Rng,
) -> Result<Vec<AgentId>, NavError> {
    if !(0.0..1.0).contains(&convoy.speed_jitter) {
        return Err(NavError::config("speed_jitter must be in [0, 1)"));
    }
    if !convoy.spread.is_finite() || convoy.spread < 0.0 {
        return Err(NavError::config("spread must be >= 0"));
    }
    let start = engine
        .route(route)
        .ok_or_else(|| NavError::config(format!("unknown route {}", route.0)))?
        .waypoint_at(0)?;
    let base = *engine.config();

    let mut spawned = Vec::with_capacity(convoy.count as usize);
    for _ in 0..convoy.count {
        let offset = Vec3::new(
            rng.gen_range(-convoy.spread..=convoy.spread),
            0.0,
            rng.gen_range(-convoy.spread..=convoy.spread),
        );
        let factor = 1.0 + rng.gen_range(-convoy.speed_jitter..=convoy.speed_jitter);
        let config = NavConfig {
            move_speed: (base.move_speed * factor).max(base.min_speed),
            ..base
        };
        let id = engine.spawn(
            AgentSpawn::on(route)
                .at(start + offset)
                .with_config(config)
                .with_cargo(convoy.cargo),
        )?;
        spawned.push(id);
    }
    Ok(spawned)
}
