use serde::{Deserialize, Serialize};

use crate::random::RandomSource;
use crate::{ensure_finite, LabError};

/// Noise regime driving a simulation.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum NoiseKind {
    White { amplitude: f64 },
    Colored { amplitude: f64, rho: f64 },
}

impl NoiseKind {
    /// AR(1) noise whose correlation time `tau` is preserved for any step size.
    ///
    /// `step` and `tau` share a unit; rho = exp(-step / tau).
    pub fn colored_from_time_constant(amplitude: f64, step: f64, tau: f64) -> Self {
        NoiseKind::Colored {
            amplitude,
            rho: (-step / tau).exp(),
        }
    }

    pub fn amplitude(&self) -> f64 {
        match self {
            NoiseKind::White { amplitude } | NoiseKind::Colored { amplitude, .. } => *amplitude,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NoiseKind::White { .. } => "white",
            NoiseKind::Colored { .. } => "colored",
        }
    }

    pub fn validate(&self) -> Result<(), LabError> {
        let amplitude = self.amplitude();
        ensure_finite("noise amplitude", amplitude)?;
        if amplitude < 0.0 {
            return Err(LabError::InvalidConfig(
                "noise amplitude must be >= 0".to_string(),
            ));
        }
        if let NoiseKind::Colored { rho, .. } = self {
            if !(-1.0..1.0).contains(rho) {
                return Err(LabError::InvalidConfig(format!(
                    "rho must be in [-1, 1), got {rho}"
                )));
            }
        }
        Ok(())
    }
}

pub trait NoiseProcess {
    /// Return to the unconditional mean.
    fn reset(&mut self);
    fn next_sample(&mut self) -> f64;
}

impl<N: NoiseProcess + ?Sized> NoiseProcess for Box<N> {
    fn reset(&mut self) {
        (**self).reset();
    }

    fn next_sample(&mut self) -> f64 {
        (**self).next_sample()
    }
}

#[derive(Clone, Debug)]
pub struct WhiteNoise<S> {
    amplitude: f64,
    source: S,
}

impl<S: RandomSource> WhiteNoise<S> {
    pub fn new(amplitude: f64, source: S) -> Self {
        Self { amplitude, source }
    }
}

impl<S: RandomSource> NoiseProcess for WhiteNoise<S> {
    fn reset(&mut self) {}

    fn next_sample(&mut self) -> f64 {
        self.amplitude * self.source.next_standard_normal()
    }
}

/// First-order autoregressive noise with a unit-variance innovation state.
#[derive(Clone, Debug)]
pub struct ColoredNoise<S> {
    amplitude: f64,
    rho: f64,
    scale: f64,
    innovation: f64,
    source: S,
}

impl<S: RandomSource> ColoredNoise<S> {
    pub fn new(amplitude: f64, rho: f64, source: S) -> Self {
        Self {
            amplitude,
            rho,
            scale: (1.0 - rho * rho).sqrt(),
            innovation: 0.0,
            source,
        }
    }

    /// Current unscaled AR(1) state.
    pub fn innovation(&self) -> f64 {
        self.innovation
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }
}

impl<S: RandomSource> NoiseProcess for ColoredNoise<S> {
    fn reset(&mut self) {
        self.innovation = 0.0;
    }

    fn next_sample(&mut self) -> f64 {
        self.innovation =
            self.rho * self.innovation + self.scale * self.source.next_standard_normal();
        self.amplitude * self.innovation
    }
}

pub fn build_noise<S>(kind: &NoiseKind, source: S) -> Box<dyn NoiseProcess>
where
    S: RandomSource + 'static,
{
    match *kind {
        NoiseKind::White { amplitude } => Box::new(WhiteNoise::new(amplitude, source)),
        NoiseKind::Colored { amplitude, rho } => {
            Box::new(ColoredNoise::new(amplitude, rho, source))
        }
    }
}
