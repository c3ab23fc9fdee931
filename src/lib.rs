//! QDS battery lab - stochastic battery-health degradation
//!
//! Models battery health as a bounded state driven by a constant drain plus
//! either independent ("white") or AR(1)-correlated ("colored") noise, and
//! derives statistics from it:
//!
//! - a population Monte Carlo of cell lifetimes under both noise regimes,
//! - a continuous-time discharge curve with residual analysis that labels the
//!   residual pattern as structured or noise-like.

pub mod cell;
pub mod config;
pub mod discharge;
pub mod noise;
pub mod population;
pub mod random;
pub mod residual;
pub mod stats;

use thiserror::Error;

pub use cell::{run_cell, CellConfig, CellRun};
pub use config::LabConfig;
pub use discharge::{
    simulate_discharge, simulate_discharge_with, DischargeConfig, DischargeSummary,
    DischargeTrajectory,
};
pub use noise::{build_noise, ColoredNoise, NoiseKind, NoiseProcess, WhiteNoise};
pub use population::{
    run_population, summarize_population, PopulationConfig, PopulationResult, PopulationSummary,
    RegimeOutcome, RegimeSummary,
};
pub use random::{BoxMuller, RandomSource, SeedStream, Ziggurat};
pub use residual::{analyze, analyze_with, ResidualPattern, ResidualStats, ResidualThresholds};
pub use stats::{
    histogram, histogram_with_width, relative_change, summarize, Histogram, SampleStats,
};

#[derive(Debug, Error)]
pub enum LabError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),
    #[error("{context} length mismatch: expected {expected}, got {got}")]
    LengthMismatch {
        context: &'static str,
        expected: usize,
        got: usize,
    },
}

pub(crate) fn ensure_finite(name: &str, value: f64) -> Result<(), LabError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(LabError::InvalidConfig(format!("{name} must be finite")))
    }
}
