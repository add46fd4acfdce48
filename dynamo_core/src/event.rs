//! Structured events emitted by the engines.
//!
//! Every variant has a stable wire tuple (see `SimulationEvent::to_wire`),
//! which is the only contract the forwarding bridge relies on.

use dynamo_env::{WireArg, WireMessage, EVENT_ADDRESS};
use serde::{Deserialize, Serialize};

/// Identifies which engine produced something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Kinetics,
    Oscillators,
    Diffusion,
}

impl EngineKind {
    /// Source tag used as the first wire argument.
    pub fn source_tag(&self) -> &'static str {
        match self {
            EngineKind::Kinetics => "lotka",
            EngineKind::Oscillators => "kuramoto",
            EngineKind::Diffusion => "reaction",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EngineKind::Kinetics => "kinetics",
            EngineKind::Oscillators => "oscillators",
            EngineKind::Diffusion => "diffusion",
        };
        write!(f, "{name}")
    }
}

/// One of the three predator-prey reaction channels.
///
/// Declaration order is the order channels partition `[0, 1)` in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionKind {
    /// X -> X + 1
    PreyBirth,
    /// X -> X - 1, Y -> Y + 1
    Predation,
    /// Y -> Y - 1
    PredatorDeath,
}

impl ReactionKind {
    /// Stable numeric code carried on the wire.
    pub fn code(&self) -> i32 {
        match self {
            ReactionKind::PreyBirth => 0,
            ReactionKind::Predation => 1,
            ReactionKind::PredatorDeath => 2,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ReactionKind::PreyBirth => "Prey Birth",
            ReactionKind::Predation => "Predation",
            ReactionKind::PredatorDeath => "Predator Death",
        }
    }
}

/// Global synchrony crossed the upper threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEvent {
    pub order_parameter: f32,
    pub cluster_count: usize,
    pub coupling_strength: f32,
    pub natural_freq_range: f32,
}

/// Global synchrony fell below the lower threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesyncEvent {
    pub order_parameter: f32,
    pub coupling_strength: f32,
    pub natural_freq_range: f32,
}

/// The concentration field developed enough structure to report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEvent {
    /// Cells with B above the activity threshold
    pub active_regions: usize,
    pub max_b: f32,
    pub avg_b: f32,
    pub feed_rate: f32,
    pub kill_rate: f32,
}

/// A single reaction fired; populations are the post-reaction values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub kind: ReactionKind,
    pub prey: u32,
    pub predators: u32,
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Anything an engine reports from a single tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimulationEvent {
    Sync(SyncEvent),
    Desync(DesyncEvent),
    Pattern(PatternEvent),
    Reaction(ReactionEvent),
}

impl SimulationEvent {
    /// Engine that produced this event.
    pub fn engine(&self) -> EngineKind {
        match self {
            SimulationEvent::Sync(_) | SimulationEvent::Desync(_) => EngineKind::Oscillators,
            SimulationEvent::Pattern(_) => EngineKind::Diffusion,
            SimulationEvent::Reaction(_) => EngineKind::Kinetics,
        }
    }

    /// Short lowercase label ("sync", "desync", "pattern", "reaction").
    pub fn label(&self) -> &'static str {
        match self {
            SimulationEvent::Sync(_) => "sync",
            SimulationEvent::Desync(_) => "desync",
            SimulationEvent::Pattern(_) => "pattern",
            SimulationEvent::Reaction(_) => "reaction",
        }
    }

    /// Encodes the event as an address + typed argument list.
    ///
    /// ```text
    /// sync     -> /event "kuramoto" "sync"    R clusters K range
    /// desync   -> /event "kuramoto" "desync"  R 0        K range
    /// pattern  -> /event "reaction" "pattern" active maxB avgB f k
    /// reaction -> /event "lotka"    code      X Y a b c
    /// ```
    pub fn to_wire(&self) -> WireMessage {
        let source = WireArg::from(self.engine().source_tag());
        let args = match self {
            SimulationEvent::Sync(e) => vec![
                source,
                "sync".into(),
                e.order_parameter.into(),
                saturating_i32(e.cluster_count).into(),
                e.coupling_strength.into(),
                e.natural_freq_range.into(),
            ],
            SimulationEvent::Desync(e) => vec![
                source,
                "desync".into(),
                e.order_parameter.into(),
                0i32.into(),
                e.coupling_strength.into(),
                e.natural_freq_range.into(),
            ],
            SimulationEvent::Pattern(e) => vec![
                source,
                "pattern".into(),
                saturating_i32(e.active_regions).into(),
                e.max_b.into(),
                e.avg_b.into(),
                e.feed_rate.into(),
                e.kill_rate.into(),
            ],
            SimulationEvent::Reaction(e) => vec![
                source,
                e.kind.code().into(),
                saturating_i32(e.prey as usize).into(),
                saturating_i32(e.predators as usize).into(),
                (e.a as f32).into(),
                (e.b as f32).into(),
                (e.c as f32).into(),
            ],
        };
        WireMessage::new(EVENT_ADDRESS, args)
    }
}

fn saturating_i32(v: usize) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_wire_tuple() {
        let event = SimulationEvent::Sync(SyncEvent {
            order_parameter: 0.9,
            cluster_count: 4,
            coupling_strength: 1.5,
            natural_freq_range: 0.5,
        });
        let msg = event.to_wire();

        assert_eq!(msg.address, "/event");
        assert_eq!(msg.type_tags(), ",ssfiff");
        assert_eq!(msg.args[0], WireArg::Str("kuramoto".into()));
        assert_eq!(msg.args[3], WireArg::Int(4));
    }

    #[test]
    fn test_desync_reports_zero_clusters() {
        let event = SimulationEvent::Desync(DesyncEvent {
            order_parameter: 0.1,
            coupling_strength: 0.0,
            natural_freq_range: 2.0,
        });
        let msg = event.to_wire();
        assert_eq!(msg.args[1], WireArg::Str("desync".into()));
        assert_eq!(msg.args[3], WireArg::Int(0));
    }

    #[test]
    fn test_pattern_wire_tuple() {
        let event = SimulationEvent::Pattern(PatternEvent {
            active_regions: 1200,
            max_b: 0.9,
            avg_b: 0.05,
            feed_rate: 0.055,
            kill_rate: 0.062,
        });
        let msg = event.to_wire();
        assert_eq!(msg.type_tags(), ",ssiffff");
        assert_eq!(msg.args[0], WireArg::Str("reaction".into()));
        assert_eq!(msg.args[2], WireArg::Int(1200));
    }

    #[test]
    fn test_reaction_wire_tuple() {
        let event = SimulationEvent::Reaction(ReactionEvent {
            kind: ReactionKind::Predation,
            prey: 59,
            predators: 26,
            a: 0.8,
            b: 0.015,
            c: 0.6,
        });
        let msg = event.to_wire();
        assert_eq!(msg.type_tags(), ",siiifff");
        assert_eq!(msg.args[1], WireArg::Int(1));
        assert_eq!(msg.args[2], WireArg::Int(59));
        assert_eq!(msg.args[3], WireArg::Int(26));
    }

    #[test]
    fn test_event_engine_and_label() {
        let event = SimulationEvent::Reaction(ReactionEvent {
            kind: ReactionKind::PreyBirth,
            prey: 1,
            predators: 0,
            a: 1.0,
            b: 1.0,
            c: 1.0,
        });
        assert_eq!(event.engine(), EngineKind::Kinetics);
        assert_eq!(event.label(), "reaction");
    }

    #[test]
    fn test_serde_tagging() {
        let event = SimulationEvent::Desync(DesyncEvent {
            order_parameter: 0.2,
            coupling_strength: 0.5,
            natural_freq_range: 0.5,
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "desync");

        let back: SimulationEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
