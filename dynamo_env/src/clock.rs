//! Monotonic clock abstraction for Dynamo drivers.

use std::time::Duration;

/// The time source consulted by whatever drives the engines.
///
/// Engines themselves never poll a clock: cool-downs and reaction
/// scheduling take `now` as an argument. The driver reads it from here.
///
/// # Implementations
///
/// - **Production**: `SystemClock` - wraps `std::time::Instant`
/// - **Simulation**: `VirtualClock` (in `dynamo_sim`) - advanced manually
pub trait Clock: Send + Sync {
    /// Returns the monotonic time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Returns `now()` as fractional seconds.
    ///
    /// This is the unit every engine uses for `now` arguments.
    fn now_secs(&self) -> f64 {
        self.now().as_secs_f64()
    }
}
