//! Scenario runner - executes scenarios and checks engine invariants every tick.

use crate::exporter::{SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::world::SimWorld;

use dynamo_core::SimulationEvent;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScenarioMetrics {
    /// Events produced by the engine
    pub events_emitted: u64,

    /// Events that passed the throttle
    pub events_forwarded: u64,

    pub sync_events: u64,
    pub desync_events: u64,
    pub pattern_events: u64,

    /// Reactions fired by the kinetics engine
    pub reactions: u64,

    /// Per-tick invariant checks performed
    pub invariant_checks: u64,
}

impl ScenarioMetrics {
    fn record(&mut self, event: &SimulationEvent) {
        match event {
            SimulationEvent::Sync(_) => self.sync_events += 1,
            SimulationEvent::Desync(_) => self.desync_events += 1,
            SimulationEvent::Pattern(_) => self.pattern_events += 1,
            SimulationEvent::Reaction(_) => self.reactions += 1,
        }
    }
}

/// State captured before the first tick.
struct Baseline {
    populations: (u32, u32),
    border: Vec<(f32, f32)>,
}

impl Baseline {
    fn capture(world: &SimWorld) -> Self {
        Self {
            populations: (world.kinetics.prey(), world.kinetics.predators()),
            border: world.diffusion.field().border(),
        }
    }
}

/// Runs scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Maximum duration in seconds
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            tick_rate_hz: 60,
            max_duration_secs: 10.0,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.execute(scenario, None)
    }

    /// Runs a scenario, capturing a frame every `frame_every` ticks.
    pub fn run_with_export(
        &self,
        scenario: ScenarioId,
        frame_every: u64,
    ) -> (ScenarioResult, SimExport) {
        let mut export = SimExport::new(scenario.name(), self.seed);
        let result = self.execute(scenario, Some((&mut export, frame_every.max(1))));
        export.finalize(result.passed);
        (result, export)
    }

    fn execute(
        &self,
        scenario: ScenarioId,
        mut export: Option<(&mut SimExport, u64)>,
    ) -> ScenarioResult {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let mut config = scenario.config(self.seed);
        config.tick_rate_hz = self.tick_rate_hz;
        config.max_duration_secs = self.max_duration_secs;

        let mut metrics = ScenarioMetrics::default();
        let mut world = match SimWorld::new(config) {
            Ok(world) => world,
            Err(e) => {
                return ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_secs: 0.0,
                    failure_reason: Some(e.to_string()),
                    metrics,
                }
            }
        };

        let baseline = Baseline::capture(&world);
        let target_ticks = (self.max_duration_secs * f64::from(self.tick_rate_hz)) as u64;
        let mut failure: Option<String> = None;
        let mut pending: Vec<SimulationEvent> = Vec::new();

        world.start();

        for tick in 0..target_ticks {
            let event = world.tick();
            if let Some(event) = &event {
                metrics.record(event);
            }

            if failure.is_none() {
                metrics.invariant_checks += 1;
                if let Err(reason) = check_tick(scenario, &world, event.as_ref(), &baseline) {
                    warn!("  Invariant violated at t={:.3}s: {}", world.now_secs(), reason);
                    failure = Some(format!("t={:.3}s: {}", world.now_secs(), reason));
                }
            }

            if let Some((export, frame_every)) = export.as_mut() {
                pending.extend(event);
                if tick % *frame_every == 0 {
                    export.add_frame(SimFrame {
                        time_sec: world.now_secs(),
                        summary: world.summary(),
                        events: std::mem::take(&mut pending),
                    });
                }
            }

            if tick % u64::from(self.tick_rate_hz) == 0 {
                debug!("  t={:.1}s | {:?}", world.now_secs(), world.summary());
            }
        }

        metrics.events_emitted = world.events_emitted();
        metrics.events_forwarded = world.events_forwarded();

        if failure.is_none() {
            failure = check_outcome(scenario, &metrics).err();
        }

        info!(
            "  Events: {} emitted, {} forwarded | sync={} desync={} pattern={} reactions={}",
            metrics.events_emitted,
            metrics.events_forwarded,
            metrics.sync_events,
            metrics.desync_events,
            metrics.pattern_events,
            metrics.reactions
        );

        ScenarioResult {
            scenario,
            seed: self.seed,
            passed: failure.is_none(),
            total_ticks: target_ticks,
            final_time_secs: world.now_secs(),
            failure_reason: failure,
            metrics,
        }
    }
}

/// Invariants that must hold after every tick.
fn check_tick(
    scenario: ScenarioId,
    world: &SimWorld,
    event: Option<&SimulationEvent>,
    baseline: &Baseline,
) -> Result<(), String> {
    match scenario {
        ScenarioId::PredatorPrey => {
            if let Some(SimulationEvent::Reaction(r)) = event {
                let current = (world.kinetics.prey(), world.kinetics.predators());
                if (r.prey, r.predators) != current {
                    return Err(format!(
                        "reaction reported {:?}, engine holds {:?}",
                        (r.prey, r.predators),
                        current
                    ));
                }
            }
        }
        ScenarioId::Extinction => {
            if event.is_some() {
                return Err("reaction fired with zero propensity".to_string());
            }
            let current = (world.kinetics.prey(), world.kinetics.predators());
            if current != baseline.populations {
                return Err(format!("populations changed to {:?}", current));
            }
        }
        ScenarioId::Synchrony | ScenarioId::Incoherence => {
            let r = world.oscillators.order_parameter();
            if !(0.0..=1.0).contains(&r) {
                return Err(format!("order parameter {} outside [0, 1]", r));
            }
            let clusters = world.oscillators.cluster_count();
            let n = world.oscillators.nodes().len();
            if clusters < 1 || clusters > n {
                return Err(format!("cluster count {} outside [1, {}]", clusters, n));
            }
        }
        ScenarioId::Turing | ScenarioId::Quiescent => {
            let field = world.diffusion.field();
            let in_range = |v: &f32| (0.0..=1.0).contains(v);
            if !field.a_grid().iter().all(in_range) || !field.b_grid().iter().all(in_range) {
                return Err("concentration outside [0, 1]".to_string());
            }
            if field.border() != baseline.border {
                return Err("border cells were modified".to_string());
            }

            if scenario == ScenarioId::Quiescent {
                if event.is_some() {
                    return Err("pattern event on a quiescent field".to_string());
                }
                for y in 1..field.height() - 1 {
                    for x in 1..field.width() - 1 {
                        if field.a(x, y) != 1.0 || field.b(x, y) != 0.0 {
                            return Err(format!("cell ({}, {}) left the rest state", x, y));
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

/// Whole-run expectations.
fn check_outcome(scenario: ScenarioId, metrics: &ScenarioMetrics) -> Result<(), String> {
    match scenario {
        ScenarioId::PredatorPrey if metrics.reactions == 0 => Err("no reaction fired".to_string()),
        ScenarioId::Extinction if metrics.reactions > 0 => {
            Err(format!("{} reactions fired", metrics.reactions))
        }
        ScenarioId::Synchrony if metrics.sync_events == 0 => Err("no sync event".to_string()),
        ScenarioId::Incoherence if metrics.desync_events == 0 => {
            Err("no desync event".to_string())
        }
        ScenarioId::Turing if metrics.pattern_events == 0 => Err("no pattern event".to_string()),
        ScenarioId::Quiescent if metrics.pattern_events > 0 => {
            Err(format!("{} pattern events", metrics.pattern_events))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_predator_prey_scenario() {
        let result = ScenarioRunner::new(42).with_duration(1.0).run(ScenarioId::PredatorPrey);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.reactions > 0);
        assert_eq!(result.metrics.reactions, result.metrics.events_emitted);
        assert_eq!(result.total_ticks, 60);
    }

    #[test]
    fn test_extinction_scenario() {
        let result = ScenarioRunner::new(42).with_duration(1.0).run(ScenarioId::Extinction);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.events_emitted, 0);
    }

    #[test]
    fn test_synchrony_scenario() {
        // the opening desync event holds sync back for 3 s
        let result = ScenarioRunner::new(42).with_duration(4.0).run(ScenarioId::Synchrony);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.sync_events, 1);
        assert_eq!(result.metrics.desync_events, 1);
    }

    #[test]
    fn test_incoherence_scenario() {
        let result = ScenarioRunner::new(42).with_duration(1.0).run(ScenarioId::Incoherence);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.sync_events, 0);
    }

    #[test]
    fn test_turing_scenario() {
        let result = ScenarioRunner::new(42).with_duration(0.5).run(ScenarioId::Turing);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert!(result.metrics.pattern_events > 0);
        assert_eq!(result.metrics.invariant_checks, 30);
    }

    #[test]
    fn test_quiescent_scenario() {
        let result = ScenarioRunner::new(42).with_duration(0.5).run(ScenarioId::Quiescent);

        assert!(result.passed, "{:?}", result.failure_reason);
        assert_eq!(result.metrics.pattern_events, 0);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let runner = ScenarioRunner::new(7).with_duration(2.0);

        let a = runner.run(ScenarioId::PredatorPrey);
        let b = runner.run(ScenarioId::PredatorPrey);

        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.final_time_secs, b.final_time_secs);
    }

    #[test]
    fn test_export_collects_frames_and_events() {
        let runner = ScenarioRunner::new(3).with_duration(1.0);
        let (result, export) = runner.run_with_export(ScenarioId::PredatorPrey, 10);

        assert_eq!(export.frames.len(), 6);
        assert_eq!(export.passed, result.passed);
        assert_eq!(export.scenario, "predator_prey");
        // events after the last frame are not exported
        assert!(export.event_count() as u64 <= result.metrics.events_emitted);
        assert!(export.event_count() > 0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(6))]

        #[test]
        fn prop_invariant_scenarios_pass_for_any_seed(seed in any::<u64>()) {
            let runner = ScenarioRunner::new(seed).with_duration(0.5);
            let scenarios = [
                ScenarioId::PredatorPrey,
                ScenarioId::Extinction,
                ScenarioId::Incoherence,
            ];
            for scenario in scenarios {
                let result = runner.run(scenario);
                prop_assert!(
                    result.passed,
                    "{:?} seed={}: {:?}",
                    scenario,
                    seed,
                    result.failure_reason
                );
                prop_assert_eq!(result.total_ticks, 30);
                prop_assert_eq!(result.metrics.invariant_checks, 30);
            }
        }
    }
}
