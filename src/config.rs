//! Recognized `solve()` configuration fields (spec.md §6).

use serde::{Deserialize, Serialize};

use crate::error::SolverError;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[derive(Serialize, Deserialize)]
pub enum FixedDimensionMode {
    #[default]
    None,
    Width,
    Height,
}

/// Which of the two encoder backends (spec.md §4.4, §9) to build a trial
/// rectangle's model with. `Cell` is authoritative for routing correctness;
/// `RectPack` is the degenerate placement-only fallback.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[derive(Serialize, Deserialize)]
pub enum EncodingBackend {
    #[default]
    Cell,
    RectPack,
}

#[derive(Clone, Debug)]
#[derive(Serialize, Deserialize)]
pub struct SolverConfig {
    pub initial_width: Option<usize>,
    pub initial_height: Option<usize>,
    pub fixed_dimension_mode: FixedDimensionMode,
    pub expansion_step: usize,
    pub max_iterations: u32,
    pub timeout_ms_per_attempt: u64,
    pub encoding_backend: EncodingBackend,
    /// Gap (in cells) enforced between machine footprints by the
    /// [`EncodingBackend::RectPack`] fallback. Ignored by the cell encoder,
    /// whose no-direct-adjacency constraint is always exactly a 1-cell gap.
    pub rect_pack_gap: usize,
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            initial_width: None,
            initial_height: None,
            fixed_dimension_mode: FixedDimensionMode::None,
            expansion_step: 1,
            max_iterations: 50,
            timeout_ms_per_attempt: 30_000,
            encoding_backend: EncodingBackend::Cell,
            rect_pack_gap: 1,
        }
    }
}

impl SolverConfig {
    /// Parses a config profile from TOML, e.g. loaded from disk by the demo
    /// CLI's `--config` flag.
    pub fn from_toml_str(s: &str) -> Result<Self, SolverError> {
        toml::from_str(s)
            .map_err(|err| SolverError::invalid_input(format!("invalid config TOML: {err}")))
    }

    /// Serializes this config back to TOML, e.g. for saving a profile.
    pub fn to_toml_string(&self) -> Result<String, SolverError> {
        toml::to_string_pretty(self)
            .map_err(|err| SolverError::internal(format!("failed to serialize config to TOML: {err}")))
    }

    /// Validates the fields that can be checked before the graph is known
    /// (spec.md §7: `expansionStep <= 0` is an `InvalidInput`).
    pub fn validate(&self) -> Result<(), SolverError> {
        if self.expansion_step == 0 {
            return Err(SolverError::invalid_input("expansionStep must be >= 1"));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::invalid_input("maxIterations must be >= 1"));
        }
        if matches!(self.initial_width, Some(0)) || matches!(self.initial_height, Some(0)) {
            return Err(SolverError::invalid_input(
                "initialWidth/initialHeight must be positive when provided",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SolverConfig::default().validate().unwrap();
    }

    #[test]
    fn zero_expansion_step_is_rejected() {
        let config = SolverConfig { expansion_step: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_iterations_is_rejected() {
        let config = SolverConfig { max_iterations: 0, ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_initial_dimension_is_rejected() {
        let config = SolverConfig { initial_width: Some(0), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn round_trips_through_toml() {
        let config = SolverConfig {
            initial_width: Some(10),
            encoding_backend: EncodingBackend::RectPack,
            ..Default::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = SolverConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed.initial_width, Some(10));
        assert_eq!(parsed.encoding_backend, EncodingBackend::RectPack);
    }

    #[test]
    fn malformed_toml_is_rejected() {
        assert!(SolverConfig::from_toml_str("not valid toml [[[").is_err());
    }
}
