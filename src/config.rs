use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::discharge::DischargeConfig;
use crate::population::PopulationConfig;
use crate::residual::ResidualThresholds;
use crate::LabError;

/// Full lab configuration, loadable from JSON.
///
/// Missing sections and fields fall back to their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    pub population: PopulationConfig,
    pub discharge: DischargeConfig,
    pub residual: ResidualThresholds,
}

impl LabConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, LabError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, LabError> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), LabError> {
        self.population.validate()?;
        self.discharge.validate()?;
        for (name, value) in [
            ("residual.lag1", self.residual.lag1),
            ("residual.rms", self.residual.rms),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LabError::InvalidConfig(format!(
                    "{name} must be finite and >= 0"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::LabConfig;

    #[test]
    fn empty_object_yields_defaults() {
        let config = LabConfig::from_json_str("{}").expect("valid json");
        assert_eq!(config, LabConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = LabConfig::from_json_str(
            r#"{ "population": { "unit_count": 12, "rho": 0.5 }, "residual": { "rms": 2.0 } }"#,
        )
        .expect("valid json");

        assert_eq!(config.population.unit_count, 12);
        assert_eq!(config.population.rho, 0.5);
        assert_eq!(config.population.max_steps, 1200);
        assert_eq!(config.residual.rms, 2.0);
        assert_eq!(config.residual.lag1, 0.5);
    }

    #[test]
    fn invalid_values_fail_validation() {
        let config = LabConfig::from_json_str(r#"{ "discharge": { "step_resolution_minutes": 0 } }"#)
            .expect("valid json");
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(LabConfig::from_json_str("{ population: ").is_err());
    }
}
