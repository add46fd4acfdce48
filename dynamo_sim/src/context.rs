//! Simulation context: master seed plus a virtual clock.

use dynamo_env::Clock;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Clock that only moves when told to.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone, Default)]
pub struct VirtualClock {
    /// Nanoseconds since simulation start
    time_ns: Arc<Mutex<u64>>,
}

impl VirtualClock {
    pub fn new() -> Self {
        Self::default()
    }

    // a poisoned lock still holds a valid counter
    fn lock(&self) -> MutexGuard<'_, u64> {
        self.time_ns.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.lock();
        *time = time.saturating_add(duration.as_nanos() as u64);
    }

    /// Sets the virtual time to a specific value.
    pub fn set_time(&self, time_ns: u64) {
        *self.lock() = time_ns;
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.lock()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }
}

/// Simulation context backed by deterministic time and seed derivation.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Master seed for this simulation
    seed: u64,

    clock: VirtualClock,
}

impl SimContext {
    /// Creates a new SimContext with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            clock: VirtualClock::new(),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        self.clock.advance_time(duration);
    }

    /// Current virtual time in seconds.
    pub fn now_secs(&self) -> f64 {
        self.clock.now_secs()
    }

    /// Derives an independent sub-seed; distinct extensions never collide.
    pub fn derive_seed(&self, seed_extension: u64) -> u64 {
        self.seed.wrapping_mul(0x517cc1b727220a95) ^ seed_extension
    }
}
