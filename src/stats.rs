//! Distribution summaries for lifetime samples
//!
//! Degenerate inputs never panic: empty samples summarize to zeros, a zero
//! baseline makes the relative change `None`, and a zero-width histogram puts
//! every sample into the first bin.

use serde::Serialize;

use crate::LabError;

/// Population mean and standard deviation (divisor N).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct SampleStats {
    pub mean: f64,
    pub std_dev: f64,
}

/// Fixed-count histogram over [0, max].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    pub bin_width: f64,
    /// Rounded bin midpoints, for display.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

pub fn summarize(samples: &[f64]) -> SampleStats {
    if samples.is_empty() {
        return SampleStats::default();
    }

    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let variance = samples.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / n;

    SampleStats {
        mean,
        std_dev: variance.sqrt(),
    }
}

pub fn histogram(samples: &[f64], bin_count: usize) -> Result<Histogram, LabError> {
    let max = samples.iter().copied().fold(0.0, f64::max);
    histogram_with_width(samples, bin_count, max / bin_count.max(1) as f64)
}

/// Bins `samples` against an externally chosen width.
///
/// Used to put two distributions on the same axis. Indices are clamped to
/// `[0, bin_count - 1]`.
pub fn histogram_with_width(
    samples: &[f64],
    bin_count: usize,
    bin_width: f64,
) -> Result<Histogram, LabError> {
    if bin_count == 0 {
        return Err(LabError::InvalidConfig(
            "bin_count must be greater than zero".to_string(),
        ));
    }

    let degenerate = !(bin_width.is_finite() && bin_width > 0.0);
    if degenerate && !samples.is_empty() {
        tracing::warn!(bin_width, "zero-width histogram, all samples land in bin 0");
    }
    let width = if degenerate { 0.0 } else { bin_width };

    let edges = (0..bin_count)
        .map(|i| ((i as f64 + 0.5) * width).round())
        .collect();

    let mut counts = vec![0usize; bin_count];
    for &value in samples {
        let idx = if degenerate {
            0
        } else {
            let raw = (value / width).floor();
            if raw <= 0.0 || raw.is_nan() {
                0
            } else {
                (raw as usize).min(bin_count - 1)
            }
        };
        counts[idx] += 1;
    }

    Ok(Histogram {
        bin_width: width,
        edges,
        counts,
    })
}

/// Percent change from `baseline` to `value`; `None` when `baseline` is zero.
pub fn relative_change(baseline: f64, value: f64) -> Option<f64> {
    if baseline == 0.0 {
        return None;
    }
    Some((value - baseline) / baseline * 100.0)
}
