//! Training configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```
//! use aprender_reco::config::TrainConfig;
//!
//! let config = TrainConfig::from_json_str(r#"{"embed_size": 8, "n_epochs": 5}"#).unwrap();
//! assert_eq!(config.embed_size, 8);
//! assert_eq!(config.seed, TrainConfig::default().seed);
//! ```

use crate::error::{RecoError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// SGD hyperparameters shared by all models.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Latent factor dimension.
    pub embed_size: usize,
    /// Passes over the training data.
    pub n_epochs: usize,
    /// Learning rate.
    pub lr: f32,
    /// L2 regularization strength.
    pub reg: f32,
    /// Standard deviation of the initial factors.
    pub init_std: f32,
    /// RNG seed for initialization and shuffling.
    pub seed: u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            embed_size: 16,
            n_epochs: 20,
            lr: 0.01,
            reg: 0.02,
            init_std: 0.1,
            seed: 42,
        }
    }
}

impl TrainConfig {
    /// Parses a JSON config.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is invalid.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first out-of-range value.
    pub fn validate(&self) -> Result<()> {
        fn invalid(param: &str, value: String, constraint: &str) -> RecoError {
            RecoError::InvalidHyperparameter {
                param: param.to_string(),
                value,
                constraint: constraint.to_string(),
            }
        }

        if self.embed_size == 0 {
            return Err(invalid("embed_size", "0".to_string(), ">0"));
        }
        if self.n_epochs == 0 {
            return Err(invalid("n_epochs", "0".to_string(), ">0"));
        }
        if !(self.lr.is_finite() && self.lr > 0.0) {
            return Err(invalid("lr", self.lr.to_string(), "finite and >0"));
        }
        if !(self.reg.is_finite() && self.reg >= 0.0) {
            return Err(invalid("reg", self.reg.to_string(), "finite and >=0"));
        }
        if !(self.init_std.is_finite() && self.init_std >= 0.0) {
            return Err(invalid("init_std", self.init_std.to_string(), "finite and >=0"));
        }
        Ok(())
    }
}
