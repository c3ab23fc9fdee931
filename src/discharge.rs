//! Continuous-time discharge curve
//!
//! One trajectory sampled every `step_resolution_minutes`, driven by a
//! constant drain rate plus AR(1) noise whose correlation time is given in
//! minutes. Zero health is absorbing.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cell::INITIAL_HEALTH;
use crate::noise::{build_noise, NoiseKind, NoiseProcess};
use crate::random::{BoxMuller, RandomSource};
use crate::{ensure_finite, LabError};

/// Zero-health samples kept after the last positive one.
pub const TRAILING_ZERO_SAMPLES: usize = 10;

/// Noise multiplier for the chaotic variant of a configuration.
pub const CHAOTIC_NOISE_FACTOR: f64 = 1.8;

/// Upper bound on simulated steps; keeps allocation bounded for extreme
/// duration/resolution ratios.
pub const MAX_DISCHARGE_STEPS: usize = 10_000_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DischargeConfig {
    pub duration_hours: f64,
    /// Percent of health lost per hour without noise.
    pub drain_rate_per_hour: f64,
    /// Noise in percent per step.
    pub noise_amplitude: f64,
    pub correlation_tau_minutes: f64,
    pub step_resolution_minutes: f64,
    pub seed: u64,
}

impl Default for DischargeConfig {
    fn default() -> Self {
        Self {
            duration_hours: 24.0,
            drain_rate_per_hour: 4.0,
            noise_amplitude: 1.0,
            correlation_tau_minutes: 30.0,
            step_resolution_minutes: 5.0,
            seed: 2026,
        }
    }
}

impl DischargeConfig {
    pub fn validate(&self) -> Result<(), LabError> {
        for (name, value) in [
            ("duration_hours", self.duration_hours),
            ("correlation_tau_minutes", self.correlation_tau_minutes),
            ("step_resolution_minutes", self.step_resolution_minutes),
        ] {
            ensure_finite(name, value)?;
            if value <= 0.0 {
                return Err(LabError::InvalidConfig(format!("{name} must be > 0")));
            }
        }
        for (name, value) in [
            ("drain_rate_per_hour", self.drain_rate_per_hour),
            ("noise_amplitude", self.noise_amplitude),
        ] {
            ensure_finite(name, value)?;
            if value < 0.0 {
                return Err(LabError::InvalidConfig(format!("{name} must be >= 0")));
            }
        }

        let raw_steps = self.raw_steps();
        if !raw_steps.is_finite() || raw_steps > MAX_DISCHARGE_STEPS as f64 {
            return Err(LabError::InvalidConfig(format!(
                "duration_hours / step_resolution_minutes yields {raw_steps} steps, \
                 limit is {MAX_DISCHARGE_STEPS}"
            )));
        }
        Ok(())
    }

    /// Same configuration with the noise pushed into a more chaotic regime.
    pub fn chaotic(&self) -> Self {
        Self {
            noise_amplitude: self.noise_amplitude * CHAOTIC_NOISE_FACTOR,
            ..self.clone()
        }
    }

    fn raw_steps(&self) -> f64 {
        (self.duration_hours * 60.0 / self.step_resolution_minutes).round()
    }

    /// Step count, at least 2. Only meaningful for a validated configuration.
    pub fn steps(&self) -> usize {
        (self.raw_steps().min(MAX_DISCHARGE_STEPS as f64) as usize).max(2)
    }

    pub fn dt_hours(&self) -> f64 {
        self.step_resolution_minutes / 60.0
    }

    /// Colored noise whose correlation time is `correlation_tau_minutes`.
    pub fn noise_kind(&self) -> NoiseKind {
        NoiseKind::colored_from_time_constant(
            self.noise_amplitude,
            self.step_resolution_minutes,
            self.correlation_tau_minutes,
        )
    }
}

/// Parallel time (hours) and health (%) samples.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DischargeTrajectory {
    time: Vec<f64>,
    health: Vec<f64>,
}

impl DischargeTrajectory {
    /// Builds a trajectory from caller data, checking its invariants.
    pub fn new(time: Vec<f64>, health: Vec<f64>) -> Result<Self, LabError> {
        if time.len() != health.len() {
            return Err(LabError::LengthMismatch {
                context: "discharge trajectory",
                expected: time.len(),
                got: health.len(),
            });
        }
        if time.is_empty() {
            return Err(LabError::InvalidTrajectory(
                "trajectory must contain at least one sample".to_string(),
            ));
        }
        if time.windows(2).any(|w| !(w[1] > w[0])) {
            return Err(LabError::InvalidTrajectory(
                "time must be strictly increasing".to_string(),
            ));
        }
        if health.iter().any(|h| !(0.0..=INITIAL_HEALTH).contains(h)) {
            return Err(LabError::InvalidTrajectory(
                "health must lie in [0, 100]".to_string(),
            ));
        }
        Ok(Self { time, health })
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn health(&self) -> &[f64] {
        &self.health
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn summary(&self) -> DischargeSummary {
        let duration_hours = self.time.last().copied().unwrap_or(0.0);
        let start = self.health.first().copied().unwrap_or(0.0);
        let end = self.health.last().copied().unwrap_or(0.0);
        let used = (start - end).max(0.0);
        let average_drain_per_hour = if duration_hours > 0.0 {
            used / duration_hours
        } else {
            0.0
        };

        DischargeSummary {
            duration_hours,
            start_health: start,
            end_health: end,
            health_used: used,
            average_drain_per_hour,
        }
    }

    /// Keeps at most [`TRAILING_ZERO_SAMPLES`] zeros after the last positive sample.
    fn trim_tail(&mut self) {
        let last_positive = self.health.iter().rposition(|&h| h > 0.0).unwrap_or(0);
        let tail = TRAILING_ZERO_SAMPLES.min(self.health.len() - last_positive - 1);
        let keep = last_positive + 1 + tail;
        self.time.truncate(keep);
        self.health.truncate(keep);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct DischargeSummary {
    pub duration_hours: f64,
    pub start_health: f64,
    pub end_health: f64,
    pub health_used: f64,
    pub average_drain_per_hour: f64,
}

pub fn simulate_discharge(config: &DischargeConfig) -> Result<DischargeTrajectory, LabError> {
    simulate_discharge_with(config, BoxMuller::seeded(config.seed))
}

/// Runs the discharge simulation against an explicit random source.
pub fn simulate_discharge_with<S: RandomSource + 'static>(
    config: &DischargeConfig,
    source: S,
) -> Result<DischargeTrajectory, LabError> {
    config.validate()?;

    let steps = config.steps();
    let dt = config.dt_hours();
    let base_loss = config.drain_rate_per_hour * dt;
    let mut noise = build_noise(&config.noise_kind(), source);

    let mut time = Vec::with_capacity(steps.saturating_add(1));
    let mut health = Vec::with_capacity(steps.saturating_add(1));
    let mut h = INITIAL_HEALTH;
    time.push(0.0);
    health.push(h);

    for step in 1..=steps {
        let loss = (base_loss + noise.next_sample()).max(0.0);
        h = (h - loss).clamp(0.0, INITIAL_HEALTH);
        time.push(step as f64 * dt);
        health.push(h);

        if h <= 0.0 {
            debug!(step, "health exhausted, remaining steps held at zero");
            for rest in step + 1..=steps {
                time.push(rest as f64 * dt);
                health.push(0.0);
            }
            break;
        }
    }

    let mut trajectory = DischargeTrajectory { time, health };
    let untrimmed = trajectory.len();
    trajectory.trim_tail();

    info!(
        steps,
        untrimmed,
        retained = trajectory.len(),
        end_health = trajectory.health.last().copied().unwrap_or(0.0),
        "discharge simulated"
    );

    Ok(trajectory)
}
