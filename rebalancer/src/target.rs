//! Fixed target weights: loading from a JSON file and validation.
//!
//! The same validation applies to weights written inline in the config.

use std::path::Path;

use chrono::{DateTime, Utc};
use rustc_hash::FxHashSet;
use serde::Deserialize;
use weightbook::{Symbol, TargetAllocation};

use crate::error::{Error, Result};

/// Tolerance on the sum of weights.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

/// A set of target weights, e.g. from an external optimizer.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    /// When the weights were produced. Informational only.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    pub targets: Vec<TargetAllocation>,
}

impl TargetSpec {
    /// Wrap weights given inline, validating them.
    pub fn from_targets(targets: Vec<TargetAllocation>) -> Result<Self> {
        let spec = Self {
            timestamp: None,
            targets,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Load and validate a target JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::TargetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&contents)
    }

    /// Parse from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let spec: TargetSpec = serde_json::from_str(json)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate the weights.
    ///
    /// Every weight must be in `(0, 1]`, symbols must be unique and the sum
    /// must not exceed 1; anything below 1 stays in cash.
    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::Target("targets list is empty".into()));
        }

        let mut seen = FxHashSet::default();
        for t in &self.targets {
            if !seen.insert(t.symbol) {
                return Err(Error::Target(format!("duplicate symbol: {}", t.symbol)));
            }
        }

        for t in &self.targets {
            if !t.weight.is_finite() || t.weight <= 0.0 || t.weight > 1.0 {
                return Err(Error::Target(format!(
                    "weight for {} ({}) must be in (0.0, 1.0]",
                    t.symbol, t.weight
                )));
            }
        }

        let sum: f64 = self.targets.iter().map(|t| t.weight).sum();
        if sum > 1.0 + WEIGHT_SUM_EPSILON {
            return Err(Error::Target(format!("weights sum to {sum:.4} (> 1.0)")));
        }

        Ok(())
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.targets.iter().map(|t| t.symbol).collect()
    }

    /// Fraction of the portfolio left in cash.
    pub fn cash_weight(&self) -> f64 {
        (1.0 - self.targets.iter().map(|t| t.weight).sum::<f64>()).max(0.0)
    }
}
