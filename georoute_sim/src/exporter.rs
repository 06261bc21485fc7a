//! JSON exporter for replaying simulated sessions.
//!
//! Exports one frame per visibility tick, each carrying the rendered paths
//! as GeoJSON so any map viewer can replay the run.

use crate::error::SimError;
use georoute_core::{SimulatedUser, Snapshot};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// A single frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,

    /// Context wall clock, milliseconds since the Unix epoch
    pub wall_clock_ms: u64,

    /// Visibility tick number
    pub tick: u64,

    /// Feed state at this instant
    pub connection: String,

    pub users: Vec<SimulatedUser>,

    pub visible_routes: usize,
    pub total_routes: usize,

    /// Rendered paths as a GeoJSON FeatureCollection
    pub paths: serde_json::Value,
}

impl SimFrame {
    pub fn from_snapshot(snapshot: &Snapshot, wall_clock: SystemTime) -> Self {
        let wall_clock_ms = wall_clock
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self {
            time_sec: snapshot.at_ms as f64 / 1000.0,
            wall_clock_ms,
            tick: snapshot.tick,
            connection: snapshot.connection.to_string(),
            users: snapshot.users.clone(),
            visible_routes: snapshot.stats.visible_routes,
            total_routes: snapshot.stats.total_routes,
            paths: snapshot.feature_collection(),
        }
    }
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
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

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
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
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: &str) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
