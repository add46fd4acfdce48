//! Scenarios exercising each engine's invariants and event detection.

use crate::error::SimError;
use crate::world::{ModelId, SimConfig};

use dynamo_core::{FieldParams, KineticsParams, OscillatorParams};

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScenarioId {
    /// Default predator-prey chain
    PredatorPrey,

    /// Both populations at zero
    Extinction,

    /// Strongly coupled, noiseless network
    Synchrony,

    /// Uncoupled network with widely spread frequencies
    Incoherence,

    /// Default Gray-Scott field with a seeded pattern
    Turing,

    /// Uniform field with nothing seeded
    Quiescent,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::PredatorPrey,
            ScenarioId::Extinction,
            ScenarioId::Synchrony,
            ScenarioId::Incoherence,
            ScenarioId::Turing,
            ScenarioId::Quiescent,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::PredatorPrey => "predator_prey",
            ScenarioId::Extinction => "extinction",
            ScenarioId::Synchrony => "synchrony",
            ScenarioId::Incoherence => "incoherence",
            ScenarioId::Turing => "turing",
            ScenarioId::Quiescent => "quiescent",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::PredatorPrey => "Default Lotka-Volterra chain, populations stay non-negative",
            ScenarioId::Extinction => "X = Y = 0, no reaction ever fires",
            ScenarioId::Synchrony => "K = 4, zero noise, narrow frequencies: network locks",
            ScenarioId::Incoherence => "K = 0, wide frequencies: network stays incoherent",
            ScenarioId::Turing => "Seeded Gray-Scott field, bounded and with frozen borders",
            ScenarioId::Quiescent => "Unseeded field stays exactly at A = 1, B = 0",
        }
    }

    /// Engine the scenario drives.
    pub fn model(&self) -> ModelId {
        match self {
            ScenarioId::PredatorPrey | ScenarioId::Extinction => ModelId::Kinetics,
            ScenarioId::Synchrony | ScenarioId::Incoherence => ModelId::Oscillators,
            ScenarioId::Turing | ScenarioId::Quiescent => ModelId::Diffusion,
        }
    }

    /// Builds the world configuration for this scenario.
    pub fn config(&self, seed: u64) -> SimConfig {
        let mut config = SimConfig {
            seed,
            model: self.model(),
            ..Default::default()
        };

        match self {
            ScenarioId::PredatorPrey | ScenarioId::Turing => {}
            ScenarioId::Extinction => {
                config.kinetics = KineticsParams {
                    initial_prey: 0,
                    initial_predators: 0,
                    ..Default::default()
                };
            }
            ScenarioId::Synchrony => {
                // radius 2 spans the whole layout: all-to-all
                config.oscillators = OscillatorParams {
                    count: 100,
                    coupling_strength: 4.0,
                    natural_freq_range: 0.1,
                    noise_strength: 0.0,
                    network_radius: 2.0,
                    ..Default::default()
                };
            }
            ScenarioId::Incoherence => {
                config.oscillators = OscillatorParams {
                    coupling_strength: 0.0,
                    natural_freq_range: 2.0,
                    ..Default::default()
                };
            }
            ScenarioId::Quiescent => {
                config.seed_field = false;
                config.diffusion = FieldParams::default();
            }
        }

        config
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "predator_prey" | "predatorprey" | "lotka" => Ok(ScenarioId::PredatorPrey),
            "extinction" => Ok(ScenarioId::Extinction),
            "synchrony" | "sync" => Ok(ScenarioId::Synchrony),
            "incoherence" | "desync" => Ok(ScenarioId::Incoherence),
            "turing" | "pattern" => Ok(ScenarioId::Turing),
            "quiescent" => Ok(ScenarioId::Quiescent),
            _ => Err(SimError::UnknownScenario(s.to_string())),
        }
    }
}
