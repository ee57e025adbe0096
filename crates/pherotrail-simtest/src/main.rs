//! Pherotrail Headless Simulation Harness
//!
//! Runs the JSON scenarios in `data/scenarios.json` through the navigation
//! engine and checks trail, timing and avoidance invariants.
//! Runs entirely in-process with no physics engine and no rendering.
//!
//! Usage:
//!   cargo run -p pherotrail-simtest
//!   cargo run -p pherotrail-simtest -- --verbose
//!
//! `RUST_LOG` overrides the log level (default `warn`, `info` with `--verbose`).

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use pherotrail_core::config::load_config;
use pherotrail_core::prelude::*;
use pherotrail_core::scenario::ScenarioSpec;
use pherotrail_logic::avoidance::{compute_avoidance, PeerSample, SteeringInput};
use pherotrail_logic::config::AvoidanceConfig;
use pherotrail_logic::pheromone::PheromoneField;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

// ── Scenario file ───────────────────────────────────────────────────────
const SCENARIOS_JSON: &str = include_str!("../../../data/scenarios.json");

#[derive(Debug, Deserialize)]
struct ScenarioFile {
    scenarios: Vec<ScenarioSpec>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

/// Hand-offs recorded by a scenario run: (agent, reported seconds, engine tick).
type HandOffLog = Rc<RefCell<Vec<(AgentId, f32, u64)>>>;

/// Everything observed while running one scenario.
struct RunLog {
    ticks: u32,
    events: Vec<(u64, NavEvent)>,
    handoffs: Vec<(AgentId, f32, u64)>,
    index_violations: Vec<String>,
    strength_violations: Vec<String>,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    init_logging(verbose);
    println!("=== Pherotrail Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Scenario file
    let scenarios = match serde_json::from_str::<ScenarioFile>(SCENARIOS_JSON) {
        Ok(file) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: !file.scenarios.is_empty(),
                detail: format!("{} scenarios loaded", file.scenarios.len()),
            });
            file.scenarios
        }
        Err(e) => {
            results.push(TestResult {
                name: "scenarios_parse".into(),
                passed: false,
                detail: format!("JSON parse error: {}", e),
            });
            Vec::new()
        }
    };

    // 2. Scenario runs
    for spec in &scenarios {
        results.extend(validate_scenario(spec, verbose));
    }

    // 3. Config loading
    results.extend(validate_config_loading(verbose));

    // 4. Pure logic spot checks
    results.extend(validate_pure_logic(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

// ── 2. Scenarios ────────────────────────────────────────────────────────

fn validate_scenario(spec: &ScenarioSpec, verbose: bool) -> Vec<TestResult> {
    println!("--- Scenario: {} ---", spec.name);
    let mut results = Vec::new();
    let prefix = spec.name.as_str();

    if !spec.dt.is_finite() || spec.dt <= 0.0 {
        results.push(TestResult {
            name: format!("{}_dt", prefix),
            passed: false,
            detail: format!("dt must be positive, got {}", spec.dt),
        });
        return results;
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let (mut engine, agents) = match spec.build(&mut rng) {
        Ok(built) => built,
        Err(e) => {
            results.push(TestResult {
                name: format!("{}_build", prefix),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };
    results.push(TestResult {
        name: format!("{}_build", prefix),
        passed: !agents.is_empty(),
        detail: format!("{} agents, {} triggers", agents.len(), engine.trigger_count()),
    });

    let log = run(&mut engine, &agents, spec);

    results.push(TestResult {
        name: format!("{}_index_in_range", prefix),
        passed: log.index_violations.is_empty(),
        detail: summarize(&log.index_violations, "indices within route bounds every tick"),
    });
    results.push(TestResult {
        name: format!("{}_strength_monotonic", prefix),
        passed: log.strength_violations.is_empty(),
        detail: summarize(&log.strength_violations, "strength non-increasing and >= 0"),
    });

    // Deposits happen only on the forward leg: at most count-1 per started loop
    let mut over_deposit = Vec::new();
    for &id in &agents {
        let Some(view) = engine.agent(id) else {
            continue;
        };
        let count = engine.route(view.route).map(|r| r.count()).unwrap_or(0);
        let loops = view.trips as usize + 1;
        let deposits = engine.field().deposit_count(id);
        if deposits > count.saturating_sub(1) * loops {
            over_deposit.push(format!("{}: {} deposits over {} loops", id, deposits, loops));
        }
    }
    results.push(TestResult {
        name: format!("{}_forward_deposits_only", prefix),
        passed: over_deposit.is_empty(),
        detail: summarize(&over_deposit, "deposits bounded by forward advances"),
    });

    // Every finished trip is handed off exactly once, after the configured delay
    let mut finished: BTreeMap<AgentId, u64> = BTreeMap::new();
    for (_, event) in log.events.iter().filter(|(_, e)| e.finished_trip().is_some()) {
        *finished.entry(event.agent()).or_insert(0) += 1;
    }
    let mut handed: BTreeMap<AgentId, u64> = BTreeMap::new();
    for (agent, _, _) in &log.handoffs {
        *handed.entry(*agent).or_insert(0) += 1;
    }
    let pending_ok = finished.iter().all(|(agent, n)| {
        let got = handed.get(agent).copied().unwrap_or(0);
        got == *n || got + 1 == *n
    });
    results.push(TestResult {
        name: format!("{}_handoff_per_trip", prefix),
        passed: pending_ok && handed.keys().all(|a| finished.contains_key(a)),
        detail: format!(
            "{} trips finished, {} hand-offs",
            finished.values().sum::<u64>(),
            log.handoffs.len()
        ),
    });

    match prefix {
        "single_lane" => results.extend(check_single_lane(&engine, &agents, &log, spec)),
        "tripwire" => results.extend(check_tripwire(&engine, &agents, &log, spec)),
        _ => {
            let trips: u32 = agents
                .iter()
                .filter_map(|id| engine.agent(*id))
                .map(|v| v.trips)
                .sum();
            results.push(TestResult {
                name: format!("{}_progress", prefix),
                passed: trips > 0,
                detail: format!("{} round trips over {} ticks", trips, log.ticks),
            });
        }
    }

    if verbose {
        println!("  Final agent states:");
        for id in &agents {
            if let Some(view) = engine.agent(*id) {
                println!(
                    "    {:9} {:?} trips={} speed={:.2} trail={}",
                    id.to_string(),
                    view.state,
                    view.trips,
                    view.speed,
                    engine.field().deposit_count(*id)
                );
            }
        }
        println!("  Trail strength: {:.3}", engine.field().strength());
    }

    results
}

/// Tick a scenario to completion (or `max_ticks`), checking invariants as it goes.
fn run(engine: &mut NavigationEngine, agents: &[AgentId], spec: &ScenarioSpec) -> RunLog {
    let handoffs: HandOffLog = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&handoffs);
    let clock = Rc::new(RefCell::new(0u64));
    let tick_now = Rc::clone(&clock);
    engine.set_handoff(move |agent: AgentId, secs: f32| {
        sink.borrow_mut().push((agent, secs, *tick_now.borrow()));
    });

    let mut log = RunLog {
        ticks: 0,
        events: Vec::new(),
        handoffs: Vec::new(),
        index_violations: Vec::new(),
        strength_violations: Vec::new(),
    };
    let mut last_strength = engine.field().strength();
    let mut idle_ticks = 0;

    while log.ticks < spec.max_ticks {
        *clock.borrow_mut() = engine.tick_count() + 1;
        engine.update(spec.dt);
        log.ticks += 1;
        let tick = engine.tick_count();
        log.events
            .extend(engine.drain_events().into_iter().map(|e| (tick, e)));

        for &id in agents {
            let Some(view) = engine.agent(id) else {
                continue;
            };
            let count = engine.route(view.route).map(|r| r.count()).unwrap_or(0);
            let ok = match view.state {
                NavState::Seeking(i) => i < count,
                NavState::Returning(i) => i < count && i < view.path_history.len(),
                NavState::WaitingAtOrigin { .. } | NavState::Disabled => true,
            };
            if !ok {
                log.index_violations
                    .push(format!("tick {}: {} in {:?}", tick, id, view.state));
            }
        }

        let strength = engine.field().strength();
        if strength > last_strength || strength < 0.0 {
            log.strength_violations
                .push(format!("tick {}: {} -> {}", tick, last_strength, strength));
        }
        last_strength = strength;

        // stop a little after everyone is done so delayed hand-offs fire
        if engine.active_count() == 0 {
            idle_ticks += 1;
            let delay_ticks = (engine.config().handoff_delay / spec.dt).ceil() as u32;
            if idle_ticks > delay_ticks + 1 {
                break;
            }
        }
    }

    log.handoffs = handoffs.borrow().clone();
    engine.clear_handoff();
    log
}

fn check_single_lane(
    engine: &NavigationEngine,
    agents: &[AgentId],
    log: &RunLog,
    spec: &ScenarioSpec,
) -> Vec<TestResult> {
    let mut results = Vec::new();
    let Some(&id) = agents.first() else {
        return results;
    };
    let Some(route) = engine.route(RouteId(0)) else {
        return results;
    };

    // ticks to the far waypoint: ceil((distance - threshold) / speed * framerate)
    let far = route.waypoint_at(route.last_index()).unwrap_or(Vec3::ZERO);
    let start = route.waypoint_at(0).unwrap_or(Vec3::ZERO);
    let framerate = 1.0 / spec.dt;
    let expected = ((far.distance(&start) - spec.config.waypoint_reach_threshold)
        / spec.config.move_speed
        * framerate)
        .ceil() as i64;
    let reached = log.events.iter().find_map(|(tick, e)| match e {
        NavEvent::WaypointReached { agent, index } if *agent == id && *index == route.last_index() => {
            Some(*tick as i64)
        }
        _ => None,
    });
    results.push(TestResult {
        name: "single_lane_reach_timing".into(),
        passed: reached.is_some_and(|t| (t - expected).abs() <= 1),
        detail: format!("reached at tick {:?}, expected {}", reached, expected),
    });

    // reported trip time equals ticks x dt within one tick
    let completed = log.events.iter().find_map(|(tick, e)| match e {
        NavEvent::RoundTripComplete { agent, elapsed } if *agent == id => Some((*tick, *elapsed)),
        _ => None,
    });
    results.push(TestResult {
        name: "single_lane_trip_time".into(),
        passed: completed.is_some_and(|(tick, secs)| (secs - tick as f32 * spec.dt).abs() <= spec.dt + 1e-3),
        detail: match completed {
            Some((tick, secs)) => format!("{:.3}s reported over {} ticks", secs, tick),
            None => "round trip never completed".into(),
        },
    });

    results.push(TestResult {
        name: "single_lane_deposits".into(),
        passed: engine.field().deposit_count(id) == route.count() - 1,
        detail: format!(
            "{} deposits for {} waypoints",
            engine.field().deposit_count(id),
            route.count()
        ),
    });

    results
}

fn check_tripwire(
    engine: &NavigationEngine,
    agents: &[AgentId],
    log: &RunLog,
    spec: &ScenarioSpec,
) -> Vec<TestResult> {
    let mut results = Vec::new();

    let interrupted: Vec<(u64, AgentId)> = log
        .events
        .iter()
        .filter_map(|(tick, e)| match e {
            NavEvent::Interrupted { agent, .. } => Some((*tick, *agent)),
            _ => None,
        })
        .collect();
    results.push(TestResult {
        name: "tripwire_all_interrupted".into(),
        passed: interrupted.len() == agents.len() && engine.active_count() == 0,
        detail: format!("{}/{} agents interrupted", interrupted.len(), agents.len()),
    });

    // hand-off fires no earlier than handoff_delay after the interrupt
    let delay_ticks = (spec.config.handoff_delay / spec.dt).floor() as u64;
    let early: Vec<String> = interrupted
        .iter()
        .filter_map(|(tick, agent)| {
            let fired = log.handoffs.iter().find(|(a, _, _)| a == agent)?.2;
            (fired < tick + delay_ticks).then(|| format!("{} at {} < {}", agent, fired, tick + delay_ticks))
        })
        .collect();
    results.push(TestResult {
        name: "tripwire_handoff_delay".into(),
        passed: early.is_empty() && log.handoffs.len() == interrupted.len(),
        detail: summarize(&early, "every hand-off waited out the delay"),
    });

    results
}

fn summarize(problems: &[String], ok: &str) -> String {
    match problems.first() {
        None => ok.to_string(),
        Some(first) => format!("{} problems, first: {}", problems.len(), first),
    }
}

// ── 3. Config loading ───────────────────────────────────────────────────

fn validate_config_loading(_verbose: bool) -> Vec<TestResult> {
    println!("--- Config Loading ---");
    let mut results = Vec::new();

    let partial = load_config(r#"{ "move_speed": 7.5, "avoidance": { "detection_radius": 3.0 } }"#);
    results.push(TestResult {
        name: "config_partial_override".into(),
        passed: partial.as_ref().is_ok_and(|c| {
            c.move_speed == 7.5
                && c.avoidance.detection_radius == 3.0
                && c.avoidance.sidestep_distance == AvoidanceConfig::default().sidestep_distance
        }),
        detail: format!("{:?}", partial.map(|c| (c.move_speed, c.avoidance.detection_radius))),
    });

    let rejected = load_config(r#"{ "waypoint_reach_threshold": 0.0 }"#);
    results.push(TestResult {
        name: "config_rejects_zero_threshold".into(),
        passed: matches!(rejected, Err(NavError::Configuration(_))),
        detail: match rejected {
            Ok(_) => "accepted".into(),
            Err(e) => e.to_string(),
        },
    });

    let empty_route = WaypointGraph::new(Vec::new());
    results.push(TestResult {
        name: "config_rejects_empty_route".into(),
        passed: matches!(empty_route, Err(NavError::Configuration(_))),
        detail: "empty waypoint route".into(),
    });

    results
}

// ── 4. Pure logic ───────────────────────────────────────────────────────

fn validate_pure_logic(_verbose: bool) -> Vec<TestResult> {
    println!("--- Pure Logic ---");
    let mut results = Vec::new();

    let mut field = PheromoneField::default();
    field.deposit(AgentId(0), Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
    let before = field.strength();
    field.decay_tick(0.0);
    results.push(TestResult {
        name: "logic_zero_dt_decay".into(),
        passed: field.strength() == before,
        detail: format!("{} -> {}", before, field.strength()),
    });

    // Head-on: A (10) steers right, B (5) steers left; swapping swaps sides
    let config = AvoidanceConfig::default();
    let side = |speed_a: f32, speed_b: f32| {
        let a = SteeringInput {
            id: AgentId(0),
            position: Vec3::ZERO,
            speed: speed_a,
            nominal_speed: speed_a,
            min_speed: 1.0,
        };
        let b = SteeringInput {
            id: AgentId(1),
            position: Vec3::new(3.0, 0.0, 0.0),
            speed: speed_b,
            nominal_speed: speed_b,
            min_speed: 1.0,
        };
        let peers = [a, b].map(|s| PeerSample {
            id: s.id,
            position: s.position,
            speed: s.speed,
        });
        let a_right = Vec3::right_of(&(b.position - a.position).normalize());
        let b_right = Vec3::right_of(&(a.position - b.position).normalize());
        let steer_a = compute_avoidance(&a, &peers, &config).steering;
        let steer_b = compute_avoidance(&b, &peers, &config).steering;
        (steer_a.dot(&a_right) > 0.0, steer_b.dot(&b_right) > 0.0)
    };
    let normal = side(10.0, 5.0);
    let swapped = side(5.0, 10.0);
    results.push(TestResult {
        name: "logic_head_on_sides".into(),
        passed: normal == (true, false) && swapped == (false, true),
        detail: format!("A right/B right: {:?}, swapped: {:?}", normal, swapped),
    });

    results
}
