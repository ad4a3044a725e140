//! Configuration for the parameterization engine.
//!
//! It provides the `ParameterizationOptions` struct, which controls the multi-start search (how many
//! independent runs, their seeds) and the local minimizer each run drives. Options can be built in
//! code or loaded from a TOML file whose missing keys fall back to the defaults.

use super::lbfgs::LbfgsConfig;
use crate::error::ChargeError;
use crate::params::ParameterRange;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Bounds for the search, keyed by parameter name.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterRanges {
    /// Ranges of the method's common parameters.
    #[serde(default)]
    pub common: BTreeMap<String, ParameterRange>,
    /// Ranges of the method's atom parameters, shared by every atom row.
    #[serde(default)]
    pub atom: BTreeMap<String, ParameterRange>,
}

/// Configuration parameters for a parameterization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParameterizationOptions {
    /// The number of independent multi-start runs.
    ///
    /// Each run starts from its own random point; the best final objective wins.
    pub population: usize,
    /// The L-BFGS iteration cap of each run.
    pub max_iterations: u32,
    /// The base seed. Run `i` draws its starting point from a generator seeded with `seed + i`.
    pub seed: u64,
    /// The number of correction pairs kept by L-BFGS.
    pub memory_size: usize,
    /// Convergence tolerance on the RMS of the projected gradient.
    pub gradient_tolerance: f64,
    /// Relative step of the finite-difference gradient.
    pub finite_difference_step: f64,
    /// Optional search bounds. Without them starting points are drawn from `[0, 1)` and the
    /// search is unbounded.
    pub ranges: Option<ParameterRanges>,
}

impl Default for ParameterizationOptions {
    fn default() -> Self {
        Self {
            population: 4,
            max_iterations: 100,
            seed: 42,
            memory_size: 8,
            gradient_tolerance: 1.0e-6,
            finite_difference_step: 1.0e-6,
            ranges: None,
        }
    }
}

impl ParameterizationOptions {
    /// Loads options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ChargeError::Io` if the file cannot be read, `ChargeError::Toml` if it is not
    /// valid options TOML, and `ChargeError::InvalidOptions` or `ChargeError::InvalidRange` if a
    /// value is out of range.
    pub fn load_from_file(path: &Path) -> Result<Self, ChargeError> {
        let content = std::fs::read_to_string(path).map_err(|io_error| ChargeError::Io {
            path: path.to_path_buf(),
            source: io_error,
        })?;

        Self::load_from_str(&content)
    }

    /// Parses options from a TOML string and validates them.
    pub fn load_from_str(toml_str: &str) -> Result<Self, ChargeError> {
        let options: Self = toml::from_str(toml_str)?;
        options.validate()?;
        Ok(options)
    }

    /// Checks every value for consistency.
    pub fn validate(&self) -> Result<(), ChargeError> {
        if self.population == 0 {
            return Err(ChargeError::InvalidOptions(
                "population must be at least 1".to_string(),
            ));
        }
        if self.memory_size == 0 {
            return Err(ChargeError::InvalidOptions(
                "memory_size must be at least 1".to_string(),
            ));
        }
        if !(self.gradient_tolerance.is_finite() && self.gradient_tolerance > 0.0) {
            return Err(ChargeError::InvalidOptions(format!(
                "gradient_tolerance must be positive, got {}",
                self.gradient_tolerance
            )));
        }
        if !(self.finite_difference_step.is_finite() && self.finite_difference_step > 0.0) {
            return Err(ChargeError::InvalidOptions(format!(
                "finite_difference_step must be positive, got {}",
                self.finite_difference_step
            )));
        }

        if let Some(ranges) = &self.ranges {
            for (name, range) in ranges.common.iter().chain(&ranges.atom) {
                if !(range.low.is_finite() && range.high.is_finite() && range.low <= range.high) {
                    return Err(ChargeError::InvalidRange {
                        name: name.clone(),
                        low: range.low,
                        high: range.high,
                    });
                }
            }
        }

        Ok(())
    }

    /// Minimizer settings for one run.
    pub fn lbfgs_config(&self) -> LbfgsConfig {
        LbfgsConfig {
            max_iterations: self.max_iterations,
            gradient_tolerance: self.gradient_tolerance,
            memory_size: self.memory_size,
            finite_difference_step: self.finite_difference_step,
            ..LbfgsConfig::default()
        }
    }
}
