//! Dynamo Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seams that let Dynamo engines run in
//! both **Production** (wall clock, OS entropy, channel forwarding) and
//! **Simulation** (virtual clock, seeded entropy, recording sinks).
//!
//! # Core Concept
//!
//! Engines never reach for hidden globals. Everything that would make a run
//! non-reproducible is injected:
//! - Time (`Clock::now()`)
//! - Randomness (`RandomSource`)
//! - Event delivery (`EventSink`)
//!
//! By deriving all entropy from a single 64-bit seed, any run becomes
//! reproducible via its seed number.
//!
//! # Production seams
//!
//! - `SystemClock` measures wall time; the CLI uses it to report drift
//!   between virtual and wall time during `--realtime` runs.
//! - `EntropySource` is the OS-seeded `RandomSource` for hosts that want
//!   non-reproducible runs. Every engine accepts it through `with_source`.
//! - `ChannelSink` forwards wire messages to a bridge task over a bounded
//!   tokio channel.
//!
//! # Example
//!
//! ```ignore
//! use dynamo_env::{Clock, EventSink, RandomSource};
//!
//! fn drive<C: Clock, S: EventSink>(clock: &C, sink: &mut S) {
//!     let now = clock.now_secs();
//!     if let Some(event) = engine.tick(now) {
//!         let _ = sink.emit(event.to_wire());
//!     }
//! }
//! ```

mod clock;
mod error;
mod random;
mod sink;
mod tokio_impl;
mod types;

pub use clock::Clock;
pub use error::EnvError;
pub use random::{RandomSource, ScriptedSource, SeededSource};
pub use sink::{EventSink, RecordingSink, ThrottledSink};
pub use tokio_impl::{ChannelSink, EntropySource, SystemClock};
pub use types::{WireArg, WireMessage, EVENT_ADDRESS};
