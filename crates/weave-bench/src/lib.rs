//! # weave-bench
//!
//! Benchmark suite for the weave collision pipeline.
//!
//! Provides three procedural scenarios, one per shape family, a runner
//! with a minimal Verlet integrator, and CSV/JSON metric export for
//! regression tracking.

pub mod logging;
pub mod metrics;
pub mod runner;
pub mod scenarios;

pub use logging::{init_logging, load_config};
pub use metrics::BenchmarkMetrics;
pub use runner::BenchmarkRunner;
pub use scenarios::{Scenario, ScenarioKind};
