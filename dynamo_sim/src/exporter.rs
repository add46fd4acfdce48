//! JSON exporter for offline inspection of a scenario run.

use crate::error::SimError;
use crate::world::ModelSummary;

use dynamo_core::SimulationEvent;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single frame of simulation data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Statistics of the active model
    pub summary: ModelSummary,

    /// Events produced since the previous frame
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimulationEvent>,
}

/// Complete simulation export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// All frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool) {
        self.passed = passed;
    }

    /// Total events across all frames.
    pub fn event_count(&self) -> usize {
        self.frames.iter().map(|f| f.events.len()).sum()
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamo_core::{ReactionEvent, ReactionKind};

    fn kinetics_frame(time_sec: f64, events: Vec<SimulationEvent>) -> SimFrame {
        SimFrame {
            time_sec,
            summary: ModelSummary::Kinetics {
                prey: 60,
                predators: 25,
                reactions: 1,
            },
            events,
        }
    }

    #[test]
    fn test_add_frame_tracks_duration() {
        let mut export = SimExport::new("predator_prey", 42);
        export.add_frame(kinetics_frame(0.5, vec![]));
        export.add_frame(kinetics_frame(1.0, vec![]));
        export.finalize(true);

        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.duration_sec, 1.0);
        assert!(export.passed);
    }

    #[test]
    fn test_json_layout() {
        let reaction = SimulationEvent::Reaction(ReactionEvent {
            kind: ReactionKind::PreyBirth,
            prey: 61,
            predators: 25,
            a: 0.8,
            b: 0.015,
            c: 0.6,
        });
        let mut export = SimExport::new("predator_prey", 1);
        export.add_frame(kinetics_frame(0.0, vec![]));
        export.add_frame(kinetics_frame(0.1, vec![reaction]));

        let value = serde_json::to_value(&export).unwrap();
        assert_eq!(value["frames"][0]["summary"]["model"], "kinetics");
        assert!(value["frames"][0].get("events").is_none());
        assert_eq!(value["frames"][1]["events"][0]["type"], "reaction");
        assert_eq!(export.event_count(), 1);
    }

    #[test]
    fn test_write_and_read_back() {
        let path = std::env::temp_dir().join(format!("dynamo_export_{}.json", std::process::id()));
        let mut export = SimExport::new("quiescent", 7);
        export.add_frame(SimFrame {
            time_sec: 0.25,
            summary: ModelSummary::Diffusion {
                active_regions: 0,
                max_b: 0.0,
                avg_b: 0.0,
            },
            events: vec![],
        });

        export.write_to_file(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        let back: SimExport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, export);
    }

    #[test]
    fn test_write_to_missing_directory_fails() {
        let export = SimExport::new("turing", 1);
        let result = export.write_to_file("/nonexistent-dir/export.json");
        assert!(matches!(result, Err(SimError::Io(_))));
    }
}
