//! SimWorld - drives one active engine on a fixed virtual tick.

use crate::context::SimContext;
use crate::error::SimError;

use dynamo_core::{
    DiffusionEngine, Engine, EngineKind, FieldParams, KineticsEngine, KineticsParams,
    OscillatorEngine, OscillatorParams, SimulationEvent,
};
use dynamo_env::{EventSink, RecordingSink, SeededSource, ThrottledSink};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Which engine a world is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelId {
    Kinetics,
    Oscillators,
    Diffusion,
}

impl ModelId {
    pub fn all() -> [ModelId; 3] {
        [ModelId::Kinetics, ModelId::Oscillators, ModelId::Diffusion]
    }

    pub fn name(&self) -> &'static str {
        match self {
            ModelId::Kinetics => "kinetics",
            ModelId::Oscillators => "oscillators",
            ModelId::Diffusion => "diffusion",
        }
    }

    pub fn kind(&self) -> EngineKind {
        match self {
            ModelId::Kinetics => EngineKind::Kinetics,
            ModelId::Oscillators => EngineKind::Oscillators,
            ModelId::Diffusion => EngineKind::Diffusion,
        }
    }

    /// Extension mixed into the master seed for this model's random stream.
    fn seed_extension(&self) -> u64 {
        match self {
            ModelId::Kinetics => 1,
            ModelId::Oscillators => 2,
            ModelId::Diffusion => 3,
        }
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ModelId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kinetics" | "lotka" | "lotka_volterra" => Ok(ModelId::Kinetics),
            "oscillators" | "kuramoto" => Ok(ModelId::Oscillators),
            "diffusion" | "reaction" | "gray_scott" => Ok(ModelId::Diffusion),
            _ => Err(SimError::UnknownModel(s.to_string())),
        }
    }
}

/// Configuration for a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Engine driven by `tick`
    pub model: ModelId,

    /// Tick rate in Hz
    pub tick_rate_hz: u32,

    /// Maximum simulation duration in seconds (0 = unlimited)
    pub max_duration_secs: f64,

    /// Forward every n-th event to the sink
    pub forward_every: u64,

    /// Stamp the initial random pattern into the field
    pub seed_field: bool,

    pub kinetics: KineticsParams,
    pub oscillators: OscillatorParams,
    pub diffusion: FieldParams,

    /// Parameter overrides for the active model, applied after construction
    pub overrides: BTreeMap<String, f64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            model: ModelId::Oscillators,
            tick_rate_hz: 60,
            max_duration_secs: 60.0,
            forward_every: 10,
            seed_field: true,
            kinetics: KineticsParams::default(),
            oscillators: OscillatorParams::default(),
            diffusion: FieldParams::default(),
            overrides: BTreeMap::new(),
        }
    }
}

impl SimConfig {
    /// Parses a JSON config; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SimError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Virtual time advanced per tick.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }
}

/// Per-model statistics at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ModelSummary {
    Kinetics {
        prey: u32,
        predators: u32,
        reactions: u64,
    },
    Oscillators {
        order_parameter: f32,
        cluster_count: usize,
        mean_phase: f32,
    },
    Diffusion {
        active_regions: usize,
        max_b: f32,
        avg_b: f32,
    },
}

/// The SimWorld - owns all three engines and drives the active one.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: SimContext,

    pub kinetics: KineticsEngine<SeededSource>,
    pub oscillators: OscillatorEngine<SeededSource>,
    pub diffusion: DiffusionEngine<SeededSource>,

    active: ModelId,
    running: bool,

    sink: ThrottledSink<Box<dyn EventSink>>,

    /// Current tick count
    tick_count: u64,

    events_emitted: u64,
    sink_errors: u64,
}

impl SimWorld {
    /// Creates a world that records forwarded messages in memory.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        Self::with_sink(config, Box::new(RecordingSink::new()))
    }

    /// Creates a world forwarding throttled events into `sink`.
    pub fn with_sink(config: SimConfig, sink: Box<dyn EventSink>) -> Result<Self, SimError> {
        let context = SimContext::new(config.seed);

        let kinetics = KineticsEngine::new(
            config.kinetics,
            context.derive_seed(ModelId::Kinetics.seed_extension()),
        );
        let oscillators = OscillatorEngine::new(
            config.oscillators,
            context.derive_seed(ModelId::Oscillators.seed_extension()),
        );
        let field_rng = SeededSource::new(context.derive_seed(ModelId::Diffusion.seed_extension()));
        let diffusion = if config.seed_field {
            DiffusionEngine::with_source(config.diffusion, field_rng)
        } else {
            DiffusionEngine::quiescent(config.diffusion, field_rng)
        };

        let mut world = Self {
            active: config.model,
            sink: ThrottledSink::new(sink, config.forward_every),
            config,
            context,
            kinetics,
            oscillators,
            diffusion,
            running: false,
            tick_count: 0,
            events_emitted: 0,
            sink_errors: 0,
        };

        let overrides = world.config.overrides.clone();
        for (name, value) in &overrides {
            let applied = world.active_engine_mut().set_parameter(name, *value)?;
            debug!("Override {}.{} = {}", world.active, name, applied);
        }

        Ok(world)
    }

    /// Starts stepping; schedules the first reaction at the current time.
    pub fn start(&mut self) {
        let now = self.now_secs();
        self.kinetics.schedule_next_event_time(now);
        self.running = true;
        info!("World started | model={} seed={}", self.active, self.context.seed());
    }

    /// Stops stepping. Engine state is left as is.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Switches the driven model without touching any engine state.
    pub fn set_model(&mut self, model: ModelId) {
        self.active = model;
    }

    pub fn model(&self) -> ModelId {
        self.active
    }

    pub fn now_secs(&self) -> f64 {
        self.context.now_secs()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Events produced by the engines since creation.
    pub fn events_emitted(&self) -> u64 {
        self.events_emitted
    }

    /// Events that made it past the throttle and into the sink.
    pub fn events_forwarded(&self) -> u64 {
        self.sink.forwarded()
    }

    pub fn sink_errors(&self) -> u64 {
        self.sink_errors
    }

    pub fn active_engine(&self) -> &dyn Engine {
        match self.active {
            ModelId::Kinetics => &self.kinetics,
            ModelId::Oscillators => &self.oscillators,
            ModelId::Diffusion => &self.diffusion,
        }
    }

    pub fn active_engine_mut(&mut self) -> &mut dyn Engine {
        match self.active {
            ModelId::Kinetics => &mut self.kinetics,
            ModelId::Oscillators => &mut self.oscillators,
            ModelId::Diffusion => &mut self.diffusion,
        }
    }

    /// Advances virtual time by one tick and, while running, steps the active model.
    pub fn tick(&mut self) -> Option<SimulationEvent> {
        self.context.advance_time(self.config.tick_interval());
        self.tick_count += 1;

        if !self.running {
            return None;
        }

        let now = self.now_secs();
        let event = match self.active {
            ModelId::Diffusion => {
                self.diffusion.step();
                self.diffusion.detect_event(now)
            }
            ModelId::Oscillators => {
                self.oscillators.step(1.0);
                self.oscillators.detect_event(now)
            }
            ModelId::Kinetics => self.tick_kinetics(now),
        };

        if let Some(event) = &event {
            self.events_emitted += 1;
            if let Err(e) = self.sink.emit(event.to_wire()) {
                self.sink_errors += 1;
                warn!("Dropped {} event: {}", event.label(), e);
            }
        }

        event
    }

    // at most one reaction per tick
    fn tick_kinetics(&mut self, now: f64) -> Option<SimulationEvent> {
        let due = match self.kinetics.next_event_at() {
            Some(at) => now >= at,
            None => {
                self.kinetics.schedule_next_event_time(now);
                false
            }
        };
        if !due {
            return None;
        }

        let event = self.kinetics.fire_next_reaction();
        self.kinetics.schedule_next_event_time(now);
        self.kinetics.record(now);
        event.map(SimulationEvent::Reaction)
    }

    /// Runs ticks until the configured duration is reached.
    pub fn run(&mut self) -> Vec<SimulationEvent> {
        let ticks = (self.config.max_duration_secs * f64::from(self.config.tick_rate_hz)) as u64;
        (0..ticks).filter_map(|_| self.tick()).collect()
    }

    /// Statistics of the active model.
    pub fn summary(&self) -> ModelSummary {
        match self.active {
            ModelId::Kinetics => ModelSummary::Kinetics {
                prey: self.kinetics.prey(),
                predators: self.kinetics.predators(),
                reactions: self.kinetics.reactions(),
            },
            ModelId::Oscillators => ModelSummary::Oscillators {
                order_parameter: self.oscillators.order_parameter(),
                cluster_count: self.oscillators.cluster_count(),
                mean_phase: self.oscillators.mean_phase(),
            },
            ModelId::Diffusion => {
                let stats = self.diffusion.stats();
                ModelSummary::Diffusion {
                    active_regions: stats.active_regions,
                    max_b: stats.max_b,
                    avg_b: stats.avg_b,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamo_env::{ChannelSink, EnvError, WireMessage};

    fn config(model: ModelId) -> SimConfig {
        SimConfig {
            model,
            diffusion: FieldParams::with_dimensions(40, 40),
            oscillators: OscillatorParams {
                count: 30,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn emit(&mut self, _msg: WireMessage) -> Result<(), EnvError> {
            Err(EnvError::SinkClosed)
        }
    }

    #[test]
    fn test_idle_world_does_not_step() {
        let mut world = SimWorld::new(config(ModelId::Oscillators)).unwrap();
        let phases: Vec<f32> = world.oscillators.nodes().iter().map(|n| n.phase).collect();

        assert!(world.tick().is_none());
        assert_eq!(world.tick_count(), 1);
        assert!(world.now_secs() > 0.0);

        let after: Vec<f32> = world.oscillators.nodes().iter().map(|n| n.phase).collect();
        assert_eq!(phases, after);
    }

    #[test]
    fn test_only_active_model_steps() {
        let mut world = SimWorld::new(config(ModelId::Diffusion)).unwrap();
        let phases: Vec<f32> = world.oscillators.nodes().iter().map(|n| n.phase).collect();
        let field = world.diffusion.field().clone();

        world.start();
        world.tick();

        assert_ne!(world.diffusion.field(), &field);
        let after: Vec<f32> = world.oscillators.nodes().iter().map(|n| n.phase).collect();
        assert_eq!(phases, after);
        assert_eq!(world.kinetics.reactions(), 0);
    }

    #[test]
    fn test_kinetics_fires_at_most_once_per_tick() {
        let mut world = SimWorld::new(config(ModelId::Kinetics)).unwrap();
        world.start();

        for _ in 0..120 {
            let before = world.kinetics.reactions();
            let event = world.tick();
            let fired = world.kinetics.reactions() - before;
            assert!(fired <= 1);
            assert_eq!(fired == 1, event.is_some());
        }
        assert!(world.kinetics.reactions() > 0);
        assert!(world.kinetics.next_event_at().is_some());
    }

    #[test]
    fn test_throttle_forwards_every_tenth_event() {
        let mut cfg = config(ModelId::Kinetics);
        cfg.max_duration_secs = 5.0;
        let mut world = SimWorld::new(cfg).unwrap();
        world.start();

        let events = world.run();
        assert_eq!(world.events_emitted(), events.len() as u64);
        assert_eq!(world.events_forwarded(), world.events_emitted() / 10);
    }

    #[test]
    fn test_sink_errors_do_not_abort_tick() {
        let mut cfg = config(ModelId::Kinetics);
        cfg.forward_every = 1;
        let mut world = SimWorld::with_sink(cfg, Box::new(FailingSink)).unwrap();
        world.start();

        for _ in 0..120 {
            world.tick();
        }
        assert!(world.events_emitted() > 0);
        assert_eq!(world.sink_errors(), world.events_emitted());
    }

    #[test]
    fn test_switching_model_keeps_state() {
        let mut world = SimWorld::new(config(ModelId::Kinetics)).unwrap();
        world.start();
        for _ in 0..60 {
            world.tick();
        }
        let populations = (world.kinetics.prey(), world.kinetics.predators());

        world.set_model(ModelId::Oscillators);
        world.tick();
        assert!(world.is_running());
        assert_eq!((world.kinetics.prey(), world.kinetics.predators()), populations);
        assert!(matches!(world.summary(), ModelSummary::Oscillators { .. }));
    }

    #[test]
    fn test_stop_halts_stepping() {
        let mut world = SimWorld::new(config(ModelId::Diffusion)).unwrap();
        world.start();
        world.tick();
        world.stop();

        let field = world.diffusion.field().clone();
        assert!(world.tick().is_none());
        assert_eq!(world.diffusion.field(), &field);
    }

    #[test]
    fn test_same_seed_same_events() {
        let run = || {
            let mut cfg = config(ModelId::Kinetics);
            cfg.max_duration_secs = 3.0;
            let mut world = SimWorld::new(cfg).unwrap();
            world.start();
            world.run()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_overrides_are_clamped_and_applied() {
        let mut cfg = config(ModelId::Oscillators);
        cfg.overrides.insert("coupling".to_string(), 9.0);
        let world = SimWorld::new(cfg).unwrap();
        assert_eq!(world.active_engine().parameter("coupling").unwrap(), 5.0);

        let mut cfg = config(ModelId::Oscillators);
        cfg.overrides.insert("bogus".to_string(), 1.0);
        assert!(matches!(SimWorld::new(cfg), Err(SimError::Param(_))));
    }

    #[test]
    fn test_config_from_partial_json() {
        let cfg = SimConfig::from_json(r#"{ "seed": 7, "model": "diffusion" }"#).unwrap();
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.model, ModelId::Diffusion);
        assert_eq!(cfg.tick_rate_hz, 60);
        assert_eq!(cfg.forward_every, 10);

        assert!(SimConfig::from_json("{ not json").is_err());
    }

    #[test]
    fn test_model_from_str() {
        assert_eq!("Kuramoto".parse::<ModelId>().unwrap(), ModelId::Oscillators);
        assert_eq!("gray_scott".parse::<ModelId>().unwrap(), ModelId::Diffusion);
        assert!("fluid".parse::<ModelId>().is_err());
    }

    #[tokio::test]
    async fn test_channel_sink_receives_forwarded_events() {
        let mut cfg = config(ModelId::Kinetics);
        cfg.forward_every = 1;
        let (sink, mut rx) = ChannelSink::new(1024);
        let mut world = SimWorld::with_sink(cfg, Box::new(sink)).unwrap();
        world.start();

        let mut emitted = 0;
        while emitted == 0 {
            if world.tick().is_some() {
                emitted += 1;
            }
        }

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.address, "/event");
        assert_eq!(msg.type_tags(), ",siiifff");
    }
}
