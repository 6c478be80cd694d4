//! Benchmark metrics: data collected during a scenario run.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use weave_types::{WeaveError, WeaveResult};

/// Metrics collected from a benchmark scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    pub scenario: String,
    pub particle_count: usize,
    pub frames: u32,
    pub substeps: u32,
    /// Total wall-clock time (seconds).
    pub total_wall_time: f64,
    /// Average wall-clock time per frame (seconds).
    pub avg_frame_time: f64,
    pub min_frame_time: f64,
    pub max_frame_time: f64,
    /// Particle corrections summed over all substeps.
    pub convex_contacts: u64,
    pub triangle_contacts: u64,
    pub capsule_contacts: u64,
    pub virtual_contacts: u64,
    /// Substeps that skipped the grid because no capsule was in reach.
    pub grid_skips: u32,
    /// Maximum particle displacement from its initial position.
    pub max_displacement: f32,
    /// Lowest particle height at the end of the run.
    pub min_height: f32,
}

impl BenchmarkMetrics {
    pub fn total_contacts(&self) -> u64 {
        self.convex_contacts + self.triangle_contacts + self.capsule_contacts + self.virtual_contacts
    }

    pub fn to_csv_header() -> String {
        "scenario,particle_count,frames,substeps,total_wall_time_s,avg_frame_ms,min_frame_ms,max_frame_ms,convex_contacts,triangle_contacts,capsule_contacts,virtual_contacts,grid_skips,max_displacement,min_height".to_string()
    }

    pub fn to_csv_row(&self) -> String {
        format!(
            "{},{},{},{},{:.6},{:.4},{:.4},{:.4},{},{},{},{},{},{:.6},{:.6}",
            self.scenario,
            self.particle_count,
            self.frames,
            self.substeps,
            self.total_wall_time,
            self.avg_frame_time * 1000.0,
            self.min_frame_time * 1000.0,
            self.max_frame_time * 1000.0,
            self.convex_contacts,
            self.triangle_contacts,
            self.capsule_contacts,
            self.virtual_contacts,
            self.grid_skips,
            self.max_displacement,
            self.min_height,
        )
    }

    /// Header plus one row per run.
    pub fn to_csv(metrics: &[BenchmarkMetrics]) -> String {
        let mut csv = Self::to_csv_header();
        for m in metrics {
            csv.push('\n');
            csv.push_str(&m.to_csv_row());
        }
        csv
    }

    pub fn write_csv(path: impl AsRef<Path>, metrics: &[BenchmarkMetrics]) -> WeaveResult<()> {
        fs::write(path, Self::to_csv(metrics) + "\n")?;
        Ok(())
    }

    pub fn to_json(metrics: &[BenchmarkMetrics]) -> WeaveResult<String> {
        serde_json::to_string_pretty(metrics).map_err(|e| WeaveError::Serialization(e.to_string()))
    }
}
