//! Tunable parameter surface shared by all engines.
//!
//! UI bindings address parameters by name. Values outside the published range
//! are clamped to the nearest bound, never rejected.

use crate::event::EngineKind;
use thiserror::Error;

/// Errors from the by-name parameter interface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("Unknown parameter: {0}")]
    Unknown(String),

    #[error("Non-finite value for parameter: {0}")]
    NonFinite(String),
}

/// A published parameter and its legal range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    /// Affects rendering only, never the dynamics
    pub display_only: bool,
}

impl ParamSpec {
    pub const fn new(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            min,
            max,
            default,
            display_only: false,
        }
    }

    pub const fn display(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            min,
            max,
            default,
            display_only: true,
        }
    }

    /// Clamps `value` into `[min, max]`, rejecting NaN and infinities.
    pub fn apply(&self, value: f64) -> Result<f64, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite(self.name.to_string()));
        }
        Ok(value.clamp(self.min, self.max))
    }

    /// Like `apply`, but a non-finite value falls back to the default.
    pub fn sanitize(&self, value: f64) -> f64 {
        self.apply(value).unwrap_or(self.default)
    }
}

/// Finds `name` in a parameter table.
pub fn lookup<'a>(specs: &'a [ParamSpec], name: &str) -> Result<&'a ParamSpec, ParamError> {
    specs
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| ParamError::Unknown(name.to_string()))
}

/// Clamps a configuration value by name; non-finite values take the default.
pub fn sanitize_named(specs: &[ParamSpec], name: &str, value: f64) -> f64 {
    lookup(specs, name).map_or(value, |spec| spec.sanitize(value))
}

/// Clamps a setter argument by name; non-finite values yield `None`.
pub fn bounded(specs: &[ParamSpec], name: &str, value: f64) -> Option<f64> {
    lookup(specs, name).ok()?.apply(value).ok()
}

/// Operations every engine exposes to drivers and UI bindings.
///
/// Stepping is deliberately not part of this trait: the kinetics engine is
/// event-time gated while the other two are fixed-rate, and the driver owns
/// that difference.
pub trait Engine {
    /// Which engine this is.
    fn kind(&self) -> EngineKind;

    /// Reinitializes all state from configuration.
    fn reset(&mut self);

    /// Events (or reactions) produced since the last reset.
    fn event_count(&self) -> u64;

    /// Published parameter table.
    fn parameters(&self) -> &'static [ParamSpec];

    /// Reads a parameter by name.
    fn parameter(&self, name: &str) -> Result<f64, ParamError>;

    /// Sets a parameter by name, returning the (clamped) value applied.
    fn set_parameter(&mut self, name: &str, value: f64) -> Result<f64, ParamError>;
}
