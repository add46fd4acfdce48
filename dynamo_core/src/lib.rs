//! Dynamo Core - three swappable dynamical-system engines
//!
//! Each engine owns its state, advances on an external tick, and reports
//! discrete "notable events" as the state evolves:
//! 1. **Kinetics**: Gillespie stochastic simulation of a predator-prey chain
//! 2. **Oscillators**: Kuramoto phase dynamics over a small-world graph
//! 3. **Diffusion**: Gray-Scott reaction-diffusion on a double-buffered grid
//!
//! Engines share nothing but the `SimulationEvent` type they emit and the
//! `RandomSource` seam they consume.

pub mod diffusion;
pub mod event;
pub mod kinetics;
pub mod oscillators;
pub mod params;

// Re-export key types for convenience
pub use diffusion::{ConcentrationField, DiffusionEngine, FieldParams, FieldStats};
pub use event::{
    DesyncEvent, EngineKind, PatternEvent, ReactionEvent, ReactionKind, SimulationEvent,
    SyncEvent,
};
pub use kinetics::{KineticsEngine, KineticsParams, Propensities};
pub use oscillators::{OscillatorEngine, OscillatorNode, OscillatorParams};
pub use params::{Engine, ParamError, ParamSpec};
