//! Stochastic predator-prey kinetics (Gillespie SSA).
//!
//! Three reaction channels over prey `X` and predators `Y`:
//!
//! ```text
//! birth      X -> X + 1          rate a*X
//! predation  X -> X - 1, Y -> Y+1 rate b*X*Y
//! death      Y -> Y - 1          rate c*Y
//! ```
//!
//! Waiting times between reactions are exponential with mean `1/total`, so
//! the engine is driven by event time rather than a fixed step. The caller
//! schedules: `schedule_next_event_time` once after construction and after
//! every `fire_next_reaction`, and fires only once its clock has reached the
//! scheduled time. The engine never polls a clock.

use crate::event::{EngineKind, ReactionEvent, ReactionKind};
use crate::params::{lookup, sanitize_named, Engine, ParamError, ParamSpec};
use dynamo_env::{RandomSource, SeededSource};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::debug;

/// Retry delay when every propensity is zero (extinction).
pub const FALLBACK_DELAY_SECS: f64 = 0.25;

/// Time window kept in the population history.
pub const HISTORY_WINDOW_SECS: f64 = 30.0;

/// Maximum number of points kept in the phase-space trajectory.
pub const TRAJECTORY_LEN: usize = 500;

const PARAMS: &[ParamSpec] = &[
    ParamSpec::new("prey", 0.0, 1000.0, 60.0),
    ParamSpec::new("predators", 0.0, 1000.0, 25.0),
    ParamSpec::new("a", 0.01, 2.0, 0.8),
    ParamSpec::new("b", 0.001, 0.1, 0.015),
    ParamSpec::new("c", 0.01, 2.0, 0.6),
    ParamSpec::new("time_scale", 0.01, 10.0, 1.0),
];

/// Configuration for the kinetics engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KineticsParams {
    /// Prey count restored on reset
    pub initial_prey: u32,

    /// Predator count restored on reset
    pub initial_predators: u32,

    /// Prey growth rate
    pub a: f64,

    /// Predation rate
    pub b: f64,

    /// Predator death rate
    pub c: f64,

    /// Multiplier applied to every waiting time
    pub time_scale: f64,
}

impl Default for KineticsParams {
    fn default() -> Self {
        Self {
            initial_prey: 60,
            initial_predators: 25,
            a: 0.8,
            b: 0.015,
            c: 0.6,
            time_scale: 1.0,
        }
    }
}

/// Instantaneous channel rates for a given population state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Propensities {
    pub birth: f64,
    pub predation: f64,
    pub death: f64,
    pub total: f64,
}

impl Propensities {
    /// Pure function of populations and rate constants.
    pub fn compute(prey: u32, predators: u32, a: f64, b: f64, c: f64) -> Self {
        let x = f64::from(prey);
        let y = f64::from(predators);
        let birth = a * x;
        let predation = b * x * y;
        let death = c * y;
        Self {
            birth,
            predation,
            death,
            total: birth + predation + death,
        }
    }

    /// Picks a channel for a uniform draw `u` in `[0, 1)`.
    ///
    /// Boundaries are compared with strict less-than in declaration order,
    /// so a draw landing exactly on a boundary goes to the later channel.
    pub fn select(&self, u: f64) -> ReactionKind {
        let p_birth = self.birth / self.total;
        let p_predation = self.predation / self.total;

        if u < p_birth {
            ReactionKind::PreyBirth
        } else if u < p_birth + p_predation {
            ReactionKind::Predation
        } else {
            ReactionKind::PredatorDeath
        }
    }
}

/// One entry of the rolling population history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub time: f64,
    pub prey: u32,
    pub predators: u32,
}

/// The predator-prey Markov chain.
pub struct KineticsEngine<R = SeededSource> {
    params: KineticsParams,

    /// Prey count (X)
    prey: u32,

    /// Predator count (Y)
    predators: u32,

    /// Last time handed out by `schedule_next_event_time`
    next_event_at: Option<f64>,

    /// Reactions fired since reset
    reactions: u64,

    history: VecDeque<HistorySample>,
    trajectory: VecDeque<(u32, u32)>,

    rng: R,
}

impl KineticsEngine<SeededSource> {
    /// Creates an engine with a deterministic source derived from `seed`.
    pub fn new(params: KineticsParams, seed: u64) -> Self {
        Self::with_source(params, SeededSource::new(seed))
    }
}

impl<R: RandomSource> KineticsEngine<R> {
    /// Creates an engine drawing from the given source.
    pub fn with_source(params: KineticsParams, rng: R) -> Self {
        let params = sanitize(params);
        Self {
            params,
            prey: params.initial_prey,
            predators: params.initial_predators,
            next_event_at: None,
            reactions: 0,
            history: VecDeque::new(),
            trajectory: VecDeque::new(),
            rng,
        }
    }

    /// Current channel rates.
    pub fn compute_propensities(&self) -> Propensities {
        Propensities::compute(
            self.prey,
            self.predators,
            self.params.a,
            self.params.b,
            self.params.c,
        )
    }

    /// Draws the time of the next reaction, relative to `now` (seconds).
    ///
    /// Falls back to `now + FALLBACK_DELAY_SECS` when the chain is extinct so
    /// the driver keeps polling instead of stalling.
    pub fn schedule_next_event_time(&mut self, now: f64) -> f64 {
        let total = self.compute_propensities().total;
        let at = if total <= 0.0 {
            now + FALLBACK_DELAY_SECS
        } else {
            now + self.rng.exponential(1.0 / total) * self.params.time_scale
        };
        self.next_event_at = Some(at);
        at
    }

    /// Fires exactly one reaction, or nothing if every rate is zero.
    pub fn fire_next_reaction(&mut self) -> Option<ReactionEvent> {
        let propensities = self.compute_propensities();
        if propensities.total <= 0.0 {
            return None;
        }

        let kind = propensities.select(self.rng.next_f64());
        match kind {
            ReactionKind::PreyBirth => {
                self.prey = self.prey.saturating_add(1);
            }
            ReactionKind::Predation => {
                self.prey = self.prey.saturating_sub(1);
                self.predators = self.predators.saturating_add(1);
            }
            ReactionKind::PredatorDeath => {
                self.predators = self.predators.saturating_sub(1);
            }
        }
        self.reactions += 1;

        debug!(
            "{} | Prey: {}, Predators: {}",
            kind.name(),
            self.prey,
            self.predators
        );

        Some(ReactionEvent {
            kind,
            prey: self.prey,
            predators: self.predators,
            a: self.params.a,
            b: self.params.b,
            c: self.params.c,
        })
    }

    /// Kicks both populations by a random offset in `[-10, 10)`, keeping at least one of each.
    pub fn deviate(&mut self) {
        let dx = self.rng.range(-10.0, 10.0).floor() as i64;
        let dy = self.rng.range(-10.0, 10.0).floor() as i64;
        self.prey = offset_population(self.prey, dx).max(1);
        self.predators = offset_population(self.predators, dy).max(1);
    }

    /// Jumps to the coexistence equilibrium `X = c/b`, `Y = a/b`.
    pub fn converge(&mut self) {
        self.prey = (self.params.c / self.params.b).floor() as u32;
        self.predators = (self.params.a / self.params.b).floor() as u32;
    }

    /// Overwrites both populations.
    pub fn set_populations(&mut self, prey: u32, predators: u32) {
        self.prey = prey;
        self.predators = predators;
    }

    /// Appends the current state to the rolling history.
    pub fn record(&mut self, now: f64) {
        self.history.push_back(HistorySample {
            time: now,
            prey: self.prey,
            predators: self.predators,
        });
        let cutoff = now - HISTORY_WINDOW_SECS;
        while self.history.front().is_some_and(|s| s.time < cutoff) {
            self.history.pop_front();
        }

        self.trajectory.push_back((self.prey, self.predators));
        if self.trajectory.len() > TRAJECTORY_LEN {
            self.trajectory.pop_front();
        }
    }

    pub fn prey(&self) -> u32 {
        self.prey
    }

    pub fn predators(&self) -> u32 {
        self.predators
    }

    pub fn params(&self) -> &KineticsParams {
        &self.params
    }

    /// Reactions fired since construction or the last reset.
    pub fn reactions(&self) -> u64 {
        self.reactions
    }

    /// Time returned by the most recent schedule call.
    pub fn next_event_at(&self) -> Option<f64> {
        self.next_event_at
    }

    pub fn history(&self) -> &VecDeque<HistorySample> {
        &self.history
    }

    /// Phase-space trajectory `(X, Y)`, oldest first.
    pub fn trajectory(&self) -> &VecDeque<(u32, u32)> {
        &self.trajectory
    }
}

impl<R: RandomSource> Engine for KineticsEngine<R> {
    fn kind(&self) -> EngineKind {
        EngineKind::Kinetics
    }

    fn reset(&mut self) {
        self.prey = self.params.initial_prey;
        self.predators = self.params.initial_predators;
        self.next_event_at = None;
        self.reactions = 0;
        self.history.clear();
        self.trajectory.clear();
    }

    fn event_count(&self) -> u64 {
        self.reactions
    }

    fn parameters(&self) -> &'static [ParamSpec] {
        PARAMS
    }

    fn parameter(&self, name: &str) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        Ok(match spec.name {
            "prey" => f64::from(self.prey),
            "predators" => f64::from(self.predators),
            "a" => self.params.a,
            "b" => self.params.b,
            "c" => self.params.c,
            _ => self.params.time_scale,
        })
    }

    fn set_parameter(&mut self, name: &str, value: f64) -> Result<f64, ParamError> {
        let spec = lookup(PARAMS, name)?;
        let mut applied = spec.apply(value)?;
        match spec.name {
            "prey" => {
                applied = applied.floor();
                self.prey = applied as u32;
            }
            "predators" => {
                applied = applied.floor();
                self.predators = applied as u32;
            }
            "a" => self.params.a = applied,
            "b" => self.params.b = applied,
            "c" => self.params.c = applied,
            _ => self.params.time_scale = applied,
        }
        Ok(applied)
    }
}

fn offset_population(count: u32, delta: i64) -> u32 {
    (i64::from(count) + delta).clamp(0, i64::from(u32::MAX)) as u32
}

/// Clamps configured rates and initial populations into their published ranges.
fn sanitize(mut params: KineticsParams) -> KineticsParams {
    let clamp = |name: &str, value: f64| sanitize_named(PARAMS, name, value);
    params.initial_prey = clamp("prey", f64::from(params.initial_prey)) as u32;
    params.initial_predators = clamp("predators", f64::from(params.initial_predators)) as u32;
    params.a = clamp("a", params.a);
    params.b = clamp("b", params.b);
    params.c = clamp("c", params.c);
    params.time_scale = clamp("time_scale", params.time_scale);
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use dynamo_env::ScriptedSource;
    use proptest::prelude::*;

    fn scripted(values: Vec<f64>) -> KineticsEngine<ScriptedSource> {
        KineticsEngine::with_source(KineticsParams::default(), ScriptedSource::new(values))
    }

    #[test]
    fn test_propensities_reference_state() {
        let engine = KineticsEngine::new(KineticsParams::default(), 42);
        let p = engine.compute_propensities();

        assert_relative_eq!(p.birth, 48.0, epsilon = 1e-9);
        assert_relative_eq!(p.predation, 22.5, epsilon = 1e-9);
        assert_relative_eq!(p.death, 15.0, epsilon = 1e-9);
        assert_relative_eq!(p.total, 85.5, epsilon = 1e-9);
    }

    #[test]
    fn test_draw_of_point_four_is_prey_birth() {
        let mut engine = scripted(vec![0.4]);
        let event = engine.fire_next_reaction().unwrap();

        assert_eq!(event.kind, ReactionKind::PreyBirth);
        assert_eq!((event.prey, event.predators), (61, 25));
        assert_eq!((engine.prey(), engine.predators()), (61, 25));
    }

    #[test]
    fn test_channel_partition() {
        // p_birth = 48/85.5 ~ 0.5614, p_birth + p_pred ~ 0.8246
        let p = Propensities::compute(60, 25, 0.8, 0.015, 0.6);
        assert_eq!(p.select(0.0), ReactionKind::PreyBirth);
        assert_eq!(p.select(0.6), ReactionKind::Predation);
        assert_eq!(p.select(0.9), ReactionKind::PredatorDeath);
    }

    #[test]
    fn test_touching_boundary_goes_to_later_channel() {
        // birth = 1, predation = 0, death = 1 -> boundaries at 0.5 and 0.5
        let p = Propensities::compute(1, 1, 1.0, 0.0, 1.0);
        assert_eq!(p.select(0.5), ReactionKind::PredatorDeath);

        // birth = 1, predation = 1, death = 2 -> boundary at 0.25
        let p = Propensities::compute(1, 1, 1.0, 1.0, 2.0);
        assert_eq!(p.select(0.25), ReactionKind::Predation);
    }

    #[test]
    fn test_predation_and_death_apply() {
        let mut engine = scripted(vec![0.7, 0.95]);
        let first = engine.fire_next_reaction().unwrap();
        assert_eq!(first.kind, ReactionKind::Predation);
        assert_eq!((engine.prey(), engine.predators()), (59, 26));

        let second = engine.fire_next_reaction().unwrap();
        assert_eq!(second.kind, ReactionKind::PredatorDeath);
        assert_eq!((engine.prey(), engine.predators()), (59, 25));
        assert_eq!(engine.event_count(), 2);
    }

    #[test]
    fn test_extinction_fires_nothing() {
        let mut engine = scripted(vec![0.4]);
        engine.set_populations(0, 0);

        assert!(engine.fire_next_reaction().is_none());
        assert_eq!((engine.prey(), engine.predators()), (0, 0));
        assert_eq!(engine.event_count(), 0);
    }

    #[test]
    fn test_extinction_schedules_fallback() {
        let mut engine = scripted(vec![0.4]);
        engine.set_populations(0, 0);

        let at = engine.schedule_next_event_time(10.0);
        assert_relative_eq!(at, 10.0 + FALLBACK_DELAY_SECS);
        assert_eq!(engine.next_event_at(), Some(at));
    }

    #[test]
    fn test_schedule_is_exponential_scaled() {
        let mut params = KineticsParams::default();
        params.time_scale = 2.0;
        let mut engine = KineticsEngine::with_source(params, ScriptedSource::constant(0.5));

        let at = engine.schedule_next_event_time(1.0);
        let expected = 1.0 + -(0.5f64).ln() / 85.5 * 2.0;
        assert_relative_eq!(at, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_predator_only_state_still_dies_out() {
        let mut engine = scripted(vec![0.0]);
        engine.set_populations(0, 1);

        let event = engine.fire_next_reaction().unwrap();
        assert_eq!(event.kind, ReactionKind::PredatorDeath);
        assert_eq!(engine.predators(), 0);
        assert!(engine.fire_next_reaction().is_none());
    }

    #[test]
    fn test_converge_to_equilibrium() {
        let mut engine = KineticsEngine::new(KineticsParams::default(), 1);
        engine.converge();
        // c/b = 40, a/b = 53.33
        assert_eq!((engine.prey(), engine.predators()), (40, 53));
    }

    #[test]
    fn test_deviate_keeps_populations_positive() {
        let mut engine = scripted(vec![0.0, 0.0]);
        engine.set_populations(3, 5);
        engine.deviate();
        // both offsets are -10
        assert_eq!((engine.prey(), engine.predators()), (1, 1));

        let mut engine = scripted(vec![0.99, 0.55]);
        engine.deviate();
        // offsets +9 and +1
        assert_eq!((engine.prey(), engine.predators()), (69, 26));
    }

    #[test]
    fn test_reset_restores_initial_state() {
        let mut engine = KineticsEngine::new(KineticsParams::default(), 3);
        engine.schedule_next_event_time(0.0);
        for _ in 0..50 {
            engine.fire_next_reaction();
        }
        engine.record(1.0);
        engine.reset();

        assert_eq!((engine.prey(), engine.predators()), (60, 25));
        assert_eq!(engine.event_count(), 0);
        assert!(engine.next_event_at().is_none());
        assert!(engine.history().is_empty());
    }

    #[test]
    fn test_history_window_and_trajectory_cap() {
        let mut engine = KineticsEngine::new(KineticsParams::default(), 5);
        for i in 0..600 {
            engine.record(i as f64 * 0.1);
        }

        let oldest = engine.history().front().unwrap().time;
        assert!(oldest >= 59.9 - HISTORY_WINDOW_SECS - 1e-9);
        assert_eq!(engine.trajectory().len(), TRAJECTORY_LEN);
    }

    #[test]
    fn test_set_parameter_clamps() {
        let mut engine = KineticsEngine::new(KineticsParams::default(), 9);

        assert_eq!(engine.set_parameter("b", 5.0), Ok(0.1));
        assert_eq!(engine.set_parameter("prey", -4.0), Ok(0.0));
        assert_eq!(engine.prey(), 0);
        assert_eq!(engine.parameter("b"), Ok(0.1));
        assert!(matches!(
            engine.set_parameter("gamma", 1.0),
            Err(ParamError::Unknown(_))
        ));
    }

    #[test]
    fn test_out_of_range_config_is_clamped() {
        let params = KineticsParams {
            initial_prey: 5000,
            a: f64::NAN,
            b: 3.0,
            time_scale: f64::INFINITY,
            ..KineticsParams::default()
        };
        let mut engine = KineticsEngine::new(params, 4);

        assert_eq!(engine.prey(), 1000);
        assert_eq!(engine.parameter("a"), Ok(0.8));
        assert_eq!(engine.parameter("b"), Ok(0.1));
        assert_eq!(engine.parameter("time_scale"), Ok(1.0));

        engine.reset();
        assert_eq!(engine.prey(), 1000);
    }

    #[test]
    fn test_entropy_source_drives_engine() {
        let mut engine =
            KineticsEngine::with_source(KineticsParams::default(), dynamo_env::EntropySource::new());
        let mut now = engine.schedule_next_event_time(0.0);
        for _ in 0..100 {
            engine.fire_next_reaction();
            let next = engine.schedule_next_event_time(now);
            assert!(next.is_finite() && next >= now);
            now = next;
        }
        assert!(engine.event_count() > 0);
    }

    #[test]
    fn test_seeded_runs_reproducible() {
        let run = |seed| {
            let mut engine = KineticsEngine::new(KineticsParams::default(), seed);
            let mut now = engine.schedule_next_event_time(0.0);
            let mut out = Vec::new();
            for _ in 0..200 {
                out.push(engine.fire_next_reaction());
                now = engine.schedule_next_event_time(now);
            }
            (out, now.to_bits())
        };
        assert_eq!(run(77), run(77));
    }

    proptest! {
        #[test]
        fn prop_populations_never_negative(
            prey in 0u32..50,
            predators in 0u32..50,
            seed in any::<u64>(),
        ) {
            let mut engine = KineticsEngine::new(KineticsParams::default(), seed);
            engine.set_populations(prey, predators);
            let mut now = engine.schedule_next_event_time(0.0);
            for _ in 0..300 {
                let before = (engine.prey(), engine.predators());
                match engine.fire_next_reaction() {
                    Some(event) => {
                        let dx = i64::from(event.prey) - i64::from(before.0);
                        let dy = i64::from(event.predators) - i64::from(before.1);
                        prop_assert!(dx.abs() + dy.abs() <= 2);
                    }
                    None => prop_assert_eq!(before, (engine.prey(), engine.predators())),
                }
                let next = engine.schedule_next_event_time(now);
                prop_assert!(next >= now);
                now = next;
            }
        }
    }
}
