//! Single-cell degradation
//!
//! Health starts at 100 and loses `max(0, drain + noise)` per step, clamped to
//! [0, 100]. A run stops on the first step at or below the failure threshold,
//! or is right-censored at the step budget.

use serde::{Deserialize, Serialize};

use crate::noise::NoiseProcess;
use crate::{ensure_finite, LabError};

pub const INITIAL_HEALTH: f64 = 100.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CellConfig {
    pub base_drain_per_step: f64,
    /// At or below this health the cell is failed. Values below 0 are never
    /// reached, so such runs are always censored.
    pub fail_threshold: f64,
    pub max_steps: usize,
}

impl CellConfig {
    pub fn validate(&self) -> Result<(), LabError> {
        ensure_finite("base_drain_per_step", self.base_drain_per_step)?;
        ensure_finite("fail_threshold", self.fail_threshold)?;
        if self.max_steps == 0 {
            return Err(LabError::InvalidConfig(
                "max_steps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CellRun {
    /// Step of failure, or `max_steps` when censored.
    pub lifetime: usize,
    pub censored: bool,
    /// Health per step; index 0 is the initial health.
    pub trajectory: Vec<f64>,
}

pub fn run_cell<N>(config: &CellConfig, noise: &mut N) -> Result<CellRun, LabError>
where
    N: NoiseProcess + ?Sized,
{
    config.validate()?;

    let mut health = INITIAL_HEALTH;
    let mut trajectory = Vec::with_capacity(config.max_steps.min(4096) + 1);
    trajectory.push(health);

    for step in 1..=config.max_steps {
        let step_loss = (config.base_drain_per_step + noise.next_sample()).max(0.0);
        health = (health - step_loss).clamp(0.0, INITIAL_HEALTH);
        trajectory.push(health);

        if health <= config.fail_threshold {
            return Ok(CellRun {
                lifetime: step,
                censored: false,
                trajectory,
            });
        }
    }

    Ok(CellRun {
        lifetime: config.max_steps,
        censored: true,
        trajectory,
    })
}
