//! Production implementations: wall clock, OS entropy, channel forwarding.

use crate::error::EnvError;
use crate::random::RandomSource;
use crate::sink::EventSink;
use crate::types::WireMessage;
use crate::Clock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Production clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Non-deterministic source seeded from the OS.
///
/// Production counterpart of `SeededSource`; runs are not reproducible.
#[derive(Debug, Clone)]
pub struct EntropySource {
    rng: StdRng,
}

impl EntropySource {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for EntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for EntropySource {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Best-effort forwarder over a bounded tokio channel.
///
/// Never blocks: when the bridge falls behind, messages are dropped and the
/// caller is told via `EnvError::SinkFull`.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<WireMessage>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end for the bridge task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<WireMessage>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Wraps an existing sender.
    pub fn from_sender(tx: mpsc::Sender<WireMessage>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, msg: WireMessage) -> Result<(), EnvError> {
        self.tx.try_send(msg).map_err(|e| match e {
            TrySendError::Full(msg) => EnvError::full(msg.address),
            TrySendError::Closed(_) => EnvError::SinkClosed,
        })
    }
}
