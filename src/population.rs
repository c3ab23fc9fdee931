use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cell::{run_cell, CellConfig};
use crate::noise::{build_noise, NoiseKind};
use crate::random::SeedStream;
use crate::stats::{histogram_with_width, relative_change, summarize, Histogram, SampleStats};
use crate::{ensure_finite, LabError};

pub const DEFAULT_UNIT_COUNT: usize = 340;
pub const DEFAULT_HISTOGRAM_BINS: usize = 12;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationConfig {
    pub base_drain_per_step: f64,
    pub noise_amplitude: f64,
    /// Step-to-step correlation of the colored regime.
    pub rho: f64,
    pub unit_count: usize,
    pub max_steps: usize,
    pub fail_threshold: f64,
    pub histogram_bins: usize,
    pub seed: u64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            base_drain_per_step: 1.5,
            noise_amplitude: 2.0,
            rho: 0.8,
            unit_count: DEFAULT_UNIT_COUNT,
            max_steps: 1200,
            fail_threshold: 0.0,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            seed: 2026,
        }
    }
}

impl PopulationConfig {
    pub fn validate(&self) -> Result<(), LabError> {
        if self.unit_count == 0 {
            return Err(LabError::InvalidConfig(
                "unit_count must be at least 1".to_string(),
            ));
        }
        if self.histogram_bins == 0 {
            return Err(LabError::InvalidConfig(
                "histogram_bins must be greater than zero".to_string(),
            ));
        }
        ensure_finite("rho", self.rho)?;
        self.cell_config().validate()?;
        self.white().validate()?;
        self.colored().validate()
    }

    pub fn cell_config(&self) -> CellConfig {
        CellConfig {
            base_drain_per_step: self.base_drain_per_step,
            fail_threshold: self.fail_threshold,
            max_steps: self.max_steps,
        }
    }

    pub fn white(&self) -> NoiseKind {
        NoiseKind::White {
            amplitude: self.noise_amplitude,
        }
    }

    pub fn colored(&self) -> NoiseKind {
        NoiseKind::Colored {
            amplitude: self.noise_amplitude,
            rho: self.rho,
        }
    }
}

/// Lifetimes of every unit under one noise regime.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegimeOutcome {
    pub regime: &'static str,
    pub lifetimes: Vec<usize>,
    pub censored: usize,
    /// Health trajectory of the first unit.
    pub sample_trajectory: Vec<f64>,
}

impl RegimeOutcome {
    fn new(kind: &NoiseKind, capacity: usize) -> Self {
        Self {
            regime: kind.label(),
            lifetimes: Vec::with_capacity(capacity),
            censored: 0,
            sample_trajectory: Vec::new(),
        }
    }

    pub fn lifetimes_f64(&self) -> Vec<f64> {
        self.lifetimes.iter().map(|&l| l as f64).collect()
    }

    pub fn max_lifetime(&self) -> usize {
        self.lifetimes.iter().copied().max().unwrap_or(0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PopulationResult {
    pub white: RegimeOutcome,
    pub colored: RegimeOutcome,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RegimeSummary {
    pub regime: &'static str,
    pub stats: SampleStats,
    pub censored: usize,
    pub histogram: Histogram,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PopulationSummary {
    pub unit_count: usize,
    /// Width shared by both histograms.
    pub bin_width: f64,
    pub white: RegimeSummary,
    pub colored: RegimeSummary,
    /// Percent change of colored vs. white mean lifetime; `None` when the
    /// white mean is zero.
    pub relative_change_pct: Option<f64>,
}

/// Simulates every unit under both regimes.
///
/// Each unit gets two freshly seeded noise processes, one per regime, so no
/// random state is shared between regimes or units.
pub fn run_population(config: &PopulationConfig) -> Result<PopulationResult, LabError> {
    config.validate()?;

    let cell = config.cell_config();
    let white_kind = config.white();
    let colored_kind = config.colored();
    let mut seeds = SeedStream::new(config.seed);

    let mut white = RegimeOutcome::new(&white_kind, config.unit_count);
    let mut colored = RegimeOutcome::new(&colored_kind, config.unit_count);

    for unit in 0..config.unit_count {
        for (kind, outcome) in [(&white_kind, &mut white), (&colored_kind, &mut colored)] {
            let mut noise = build_noise(kind, seeds.next_source());
            let run = run_cell(&cell, &mut noise)?;
            debug!(
                unit,
                regime = kind.label(),
                lifetime = run.lifetime,
                censored = run.censored,
                "cell simulated"
            );

            outcome.lifetimes.push(run.lifetime);
            if run.censored {
                outcome.censored += 1;
            }
            if unit == 0 {
                outcome.sample_trajectory = run.trajectory;
            }
        }
    }

    info!(
        units = config.unit_count,
        white_censored = white.censored,
        colored_censored = colored.censored,
        "population simulated"
    );

    Ok(PopulationResult { white, colored })
}

/// Means, deviations and histograms for both regimes.
///
/// The bin width comes from the combined maximum lifetime so the two
/// histograms share one axis.
pub fn summarize_population(
    result: &PopulationResult,
    bin_count: usize,
) -> Result<PopulationSummary, LabError> {
    let max_lifetime = result
        .white
        .max_lifetime()
        .max(result.colored.max_lifetime());
    let bin_width = max_lifetime as f64 / bin_count.max(1) as f64;

    let white = summarize_regime(&result.white, bin_count, bin_width)?;
    let colored = summarize_regime(&result.colored, bin_count, bin_width)?;

    let relative_change_pct = relative_change(white.stats.mean, colored.stats.mean);
    if relative_change_pct.is_none() {
        warn!("white mean lifetime is zero, relative change undefined");
    }

    info!(
        white_mean = white.stats.mean,
        white_sd = white.stats.std_dev,
        colored_mean = colored.stats.mean,
        colored_sd = colored.stats.std_dev,
        relative_change_pct,
        "population summarized"
    );

    Ok(PopulationSummary {
        unit_count: result.white.lifetimes.len(),
        bin_width,
        white,
        colored,
        relative_change_pct,
    })
}

fn summarize_regime(
    outcome: &RegimeOutcome,
    bin_count: usize,
    bin_width: f64,
) -> Result<RegimeSummary, LabError> {
    let samples = outcome.lifetimes_f64();
    Ok(RegimeSummary {
        regime: outcome.regime,
        stats: summarize(&samples),
        censored: outcome.censored,
        histogram: histogram_with_width(&samples, bin_count, bin_width)?,
    })
}

#[cfg(test)]
mod tests {
    use super::{run_population, summarize_population, PopulationConfig, DEFAULT_UNIT_COUNT};

    fn small(unit_count: usize) -> PopulationConfig {
        PopulationConfig {
            unit_count,
            max_steps: 400,
            ..PopulationConfig::default()
        }
    }

    #[test]
    fn population_is_reproducible() {
        let config = small(16);
        let a = run_population(&config).expect("valid config");
        let b = run_population(&config).expect("valid config");
        assert_eq!(a, b);
    }

    #[test]
    fn different_seeds_differ() {
        let a = run_population(&small(16)).expect("valid config");
        let b = run_population(&PopulationConfig {
            seed: 7,
            ..small(16)
        })
        .expect("valid config");
        assert_ne!(a.white.lifetimes, b.white.lifetimes);
    }

    #[test]
    fn collects_one_lifetime_per_unit_and_regime() {
        let result = run_population(&small(25)).expect("valid config");
        assert_eq!(result.white.lifetimes.len(), 25);
        assert_eq!(result.colored.lifetimes.len(), 25);
        assert_eq!(
            result.white.sample_trajectory.len(),
            result.white.lifetimes[0] + 1
        );
        assert_eq!(
            result.colored.sample_trajectory.len(),
            result.colored.lifetimes[0] + 1
        );
    }

    #[test]
    fn regimes_do_not_share_draws() {
        let result = run_population(&PopulationConfig {
            rho: 0.0,
            ..small(12)
        })
        .expect("valid config");
        // with rho = 0 both regimes are white; identical draws would give identical paths
        assert_ne!(result.white.sample_trajectory, result.colored.sample_trajectory);
    }

    #[test]
    fn single_unit_population_is_valid() {
        let config = small(1);
        let result = run_population(&config).expect("valid config");
        let summary = summarize_population(&result, config.histogram_bins).expect("valid bins");

        assert_eq!(summary.unit_count, 1);
        assert_eq!(summary.white.stats.std_dev, 0.0);
        assert_eq!(summary.white.histogram.total(), 1);
        assert_eq!(summary.colored.histogram.total(), 1);
    }

    #[test]
    fn histograms_share_one_width() {
        let config = small(40);
        let result = run_population(&config).expect("valid config");
        let summary = summarize_population(&result, config.histogram_bins).expect("valid bins");

        let max = result.white.max_lifetime().max(result.colored.max_lifetime());
        assert!((summary.bin_width - max as f64 / 12.0).abs() < 1e-12);
        assert_eq!(summary.white.histogram.edges, summary.colored.histogram.edges);
        assert_eq!(summary.white.histogram.total(), 40);
        assert_eq!(summary.colored.histogram.total(), 40);
    }

    #[test]
    fn noiseless_population_matches_deterministic_lifetime() {
        let config = PopulationConfig {
            noise_amplitude: 0.0,
            unit_count: 5,
            ..PopulationConfig::default()
        };
        let result = run_population(&config).expect("valid config");
        assert!(result.white.lifetimes.iter().all(|&l| l == 67));
        assert!(result.colored.lifetimes.iter().all(|&l| l == 67));

        let summary = summarize_population(&result, 12).expect("valid bins");
        assert_eq!(summary.relative_change_pct, Some(0.0));
    }

    #[test]
    fn invalid_configs_fail_before_simulating() {
        for config in [
            PopulationConfig {
                unit_count: 0,
                ..PopulationConfig::default()
            },
            PopulationConfig {
                max_steps: 0,
                ..PopulationConfig::default()
            },
            PopulationConfig {
                rho: 1.0,
                ..PopulationConfig::default()
            },
            PopulationConfig {
                histogram_bins: 0,
                ..PopulationConfig::default()
            },
        ] {
            assert!(run_population(&config).is_err());
        }
    }

    #[test]
    fn default_population_is_reference_size() {
        assert_eq!(PopulationConfig::default().unit_count, DEFAULT_UNIT_COUNT);
    }
}
