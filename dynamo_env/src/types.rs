//! Wire representation of emitted events.

use serde::{Deserialize, Serialize};

/// Address every engine event is published under.
pub const EVENT_ADDRESS: &str = "/event";

/// A single typed argument of a wire message.
///
/// Maps one-to-one onto OSC argument types so a bridge can forward the
/// message without inspecting it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum WireArg {
    /// 32-bit integer (`i`)
    Int(i32),
    /// 32-bit float (`f`)
    Float(f32),
    /// String (`s`)
    Str(String),
}

impl WireArg {
    /// Returns the OSC type tag character.
    pub fn type_tag(&self) -> char {
        match self {
            WireArg::Int(_) => 'i',
            WireArg::Float(_) => 'f',
            WireArg::Str(_) => 's',
        }
    }
}

impl From<i32> for WireArg {
    fn from(v: i32) -> Self {
        WireArg::Int(v)
    }
}

impl From<f32> for WireArg {
    fn from(v: f32) -> Self {
        WireArg::Float(v)
    }
}

impl From<&str> for WireArg {
    fn from(v: &str) -> Self {
        WireArg::Str(v.to_string())
    }
}

impl std::fmt::Display for WireArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WireArg::Int(v) => write!(f, "{v}"),
            WireArg::Float(v) => write!(f, "{v:.4}"),
            WireArg::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Address plus ordered argument list, ready for a transport bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    /// OSC-style address, e.g. `/event`
    pub address: String,

    /// Typed arguments in emission order
    pub args: Vec<WireArg>,
}

impl WireMessage {
    /// Creates a message on the given address.
    pub fn new(address: impl Into<String>, args: Vec<WireArg>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }

    /// Returns the OSC type-tag string, e.g. `",ssfiff"`.
    pub fn type_tags(&self) -> String {
        std::iter::once(',')
            .chain(self.args.iter().map(WireArg::type_tag))
            .collect()
    }
}

impl std::fmt::Display for WireMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tags() {
        let msg = WireMessage::new(
            EVENT_ADDRESS,
            vec!["kuramoto".into(), "sync".into(), 0.9f32.into(), 3i32.into()],
        );
        assert_eq!(msg.type_tags(), ",ssfi");
    }

    #[test]
    fn test_display() {
        let msg = WireMessage::new(EVENT_ADDRESS, vec!["lotka".into(), 0i32.into()]);
        assert_eq!(msg.to_string(), "/event lotka 0");
    }
}
