//! Dynamo Deterministic Simulation Harness
//!
//! Drives the engines from `dynamo_core` on a virtual clock so every run is
//! reproducible from a single 64-bit seed:
//! - **Time**: a `VirtualClock` advanced by exactly one tick interval per tick
//! - **Randomness**: each engine gets its own stream derived from the master seed
//! - **Output**: events are throttled and forwarded through an `EventSink`
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      SimWorld                        │
//! │  SimContext (seed + VirtualClock)                    │
//! │                                                      │
//! │  ┌──────────┐  ┌─────────────┐  ┌───────────┐        │
//! │  │ Kinetics │  │ Oscillators │  │ Diffusion │        │
//! │  └────┬─────┘  └──────┬──────┘  └─────┬─────┘        │
//! │       └─────── active model ──────────┘              │
//! │                      │ SimulationEvent               │
//! │              ThrottledSink (every n-th)              │
//! └──────────────────────┼───────────────────────────────┘
//!                        ▼
//!                  Box<dyn EventSink>
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use dynamo_sim::{ModelId, SimConfig, SimWorld};
//!
//! let config = SimConfig {
//!     seed: 42,
//!     model: ModelId::Kinetics,
//!     ..Default::default()
//! };
//!
//! let mut world = SimWorld::new(config)?;
//! world.start();
//! let events = world.run();
//! # Ok::<(), dynamo_sim::SimError>(())
//! ```

mod context;
mod error;
mod exporter;
mod runner;
mod world;
pub mod scenarios;

pub use context::{SimContext, VirtualClock};
pub use error::SimError;
pub use exporter::{SimExport, SimFrame};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{ModelId, ModelSummary, SimConfig, SimWorld};
