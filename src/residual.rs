//! Residual analysis of a discharge trajectory
//!
//! The trend is the straight line through the first and last samples (not a
//! least-squares fit). Residuals are classified by two tunable thresholds on
//! their lag-1 autocorrelation and RMS.

use serde::{Deserialize, Serialize};

use crate::discharge::DischargeTrajectory;

/// Classification thresholds.
///
/// These are policy knobs, not physical constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResidualThresholds {
    /// Minimum |lag-1| autocorrelation for a structured pattern.
    pub lag1: f64,
    /// Minimum residual RMS, in percent health.
    pub rms: f64,
}

impl Default for ResidualThresholds {
    fn default() -> Self {
        Self { lag1: 0.5, rms: 5.0 }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualPattern {
    Structured,
    NoiseLike,
}

impl ResidualPattern {
    pub fn label(&self) -> &'static str {
        match self {
            ResidualPattern::Structured => "structured",
            ResidualPattern::NoiseLike => "noiselike",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ResidualPattern::Structured => {
                "Noticeable structure: large residuals with strong correlation between neighbouring samples."
            }
            ResidualPattern::NoiseLike => {
                "Residuals look mostly uncorrelated; behaviour is close to simple noise around a trend."
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ResidualStats {
    pub rms: f64,
    /// 0 when the residuals are constant.
    pub lag1: f64,
    pub pattern: ResidualPattern,
}

pub fn analyze(trajectory: &DischargeTrajectory) -> ResidualStats {
    analyze_with(trajectory, &ResidualThresholds::default())
}

pub fn analyze_with(
    trajectory: &DischargeTrajectory,
    thresholds: &ResidualThresholds,
) -> ResidualStats {
    let residuals = detrended(trajectory.time(), trajectory.health());
    if residuals.is_empty() {
        return ResidualStats {
            rms: 0.0,
            lag1: 0.0,
            pattern: ResidualPattern::NoiseLike,
        };
    }

    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let centered: Vec<f64> = residuals.iter().map(|r| r - mean).collect();

    let rms = (centered.iter().map(|x| x * x).sum::<f64>() / n).sqrt();
    let lag1 = lag1_autocorrelation(&centered);

    let pattern = if lag1.abs() > thresholds.lag1 && rms > thresholds.rms {
        ResidualPattern::Structured
    } else {
        ResidualPattern::NoiseLike
    };

    ResidualStats { rms, lag1, pattern }
}

/// Deviation of each sample from the two-point trend.
fn detrended(time: &[f64], health: &[f64]) -> Vec<f64> {
    let (Some(&start), Some(&end), Some(&t_end)) = (health.first(), health.last(), time.last())
    else {
        return Vec::new();
    };

    time.iter()
        .zip(health)
        .map(|(&t, &h)| {
            let trend = if t_end > 0.0 {
                start + (end - start) * (t / t_end)
            } else {
                start
            };
            h - trend
        })
        .collect()
}

/// Σ x_i x_{i+1} / Σ x_i² over i = 0..n-2, for already-centered `x`.
fn lag1_autocorrelation(x: &[f64]) -> f64 {
    let (num, den) = x.windows(2).fold((0.0, 0.0), |(num, den), w| {
        (num + w[0] * w[1], den + w[0] * w[0])
    });
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}
