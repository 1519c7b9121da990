//! Prediction contract for trained recommenders.
//!
//! A fitted model must satisfy four clauses:
//!
//! 1. [`Clause::PredictionRange`]: a probe prediction lies in `[1, 5]` for
//!    rating tasks and in `[0, 1]` otherwise.
//! 2. [`Clause::PopularFallback`]: an unknown pair under
//!    [`ColdStart::Popular`] scores exactly `default_pred`.
//! 3. [`Clause::ColdStartConsistency`]: two different unknown users scored
//!    against the same unknown item under the default policy agree exactly.
//! 4. Only for models with side features: batch prediction over the first
//!    rows yields one score per row ([`Clause::FeatureBatch`]) and a single
//!    query with explicit categorical features succeeds
//!    ([`Clause::FeatureQuery`]).
//!
//! Checks stop at the first violation.
//!
//! # Examples
//!
//! ```
//! use aprender_reco::prelude::*;
//! use aprender_reco::data::synthetic::{generate, SyntheticConfig};
//!
//! let data = generate(&SyntheticConfig::default()).unwrap();
//! let mut model = Svd::new(Task::Rating).with_n_epochs(5);
//! model.fit(&data).unwrap();
//!
//! let report = check_predictions(&model, Task::Rating, data.head(5), false).unwrap();
//! assert_eq!(report.clauses.len(), 3);
//! ```

use crate::data::Interaction;
use crate::error::{RecoError, Result};
use crate::prediction::predict_data_with_feats;
use crate::traits::{ColdStart, Query, Recommender, Task};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One checkable property of the prediction API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clause {
    /// Probe prediction within the task's score range.
    PredictionRange,
    /// Popular cold start returns `default_pred`.
    PopularFallback,
    /// Default cold start does not depend on which unknown user is asked.
    ColdStartConsistency,
    /// Feature batch prediction returns one score per row.
    FeatureBatch,
    /// Explicit-feature query completes.
    FeatureQuery,
}

impl Clause {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Clause::PredictionRange => "prediction_range",
            Clause::PopularFallback => "popular_fallback",
            Clause::ColdStartConsistency => "cold_start_consistency",
            Clause::FeatureBatch => "feature_batch",
            Clause::FeatureQuery => "feature_query",
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Probe queries and bounds used by the checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Pair whose prediction must be in range.
    pub probe: Query,
    /// Unknown pair scored with [`ColdStart::Popular`].
    pub popular_probe: Query,
    /// Two queries that differ only in which unknown user is asked.
    pub cold_pair: (Query, Query),
    /// Rows taken from the sample for the batch check.
    pub sample_size: usize,
    /// Inclusive score range for rating tasks.
    pub rating_range: (f32, f32),
    /// Query carrying explicit categorical features.
    pub feature_probe: Query,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            probe: Query::new(1, 2333),
            popular_probe: Query::new("cold user2", "cold item2").cold_start(ColdStart::Popular),
            cold_pair: (
                Query::new("cold user1", "cold item2"),
                Query::new("cold user2", "cold item2"),
            ),
            sample_size: 5,
            rating_range: (1.0, 5.0),
            feature_probe: Query::new(2211, 110)
                .with_feat("sex", "male")
                .with_feat("genre_1", "crime"),
        }
    }
}

/// Outcome of a passing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractReport {
    /// Task the ranges were checked against.
    pub task: Task,
    /// Clauses checked, in order.
    pub clauses: Vec<Clause>,
    /// Prediction for the range probe.
    pub probe_pred: f32,
    /// Prediction for the popular probe.
    pub popular_pred: f32,
    /// Shared prediction of the cold pair.
    pub cold_pred: f32,
    /// Feature batch scores, when the feature checks ran.
    pub batch_preds: Option<Vec<f32>>,
}

/// Contract checks bound to one model.
pub struct PredictionContract<'a> {
    model: &'a dyn Recommender,
    task: Task,
    config: ContractConfig,
}

impl<'a> PredictionContract<'a> {
    /// Binds the default probes to `model`, checking ranges for `task`.
    pub fn new(model: &'a dyn Recommender, task: Task) -> Self {
        Self::with_config(model, task, ContractConfig::default())
    }

    /// Binds explicit probes to `model`.
    pub fn with_config(model: &'a dyn Recommender, task: Task, config: ContractConfig) -> Self {
        Self {
            model,
            task,
            config,
        }
    }

    /// Probes in use.
    #[must_use]
    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// Clause 1: the probe prediction lies in the task's range.
    ///
    /// # Errors
    ///
    /// Returns a [`Clause::PredictionRange`] violation, or the model's own error.
    pub fn check_range(&self) -> Result<f32> {
        let pred = self.model.predict(&self.config.probe)?;
        let (lo, hi) = self.task.score_range(self.config.rating_range);
        if !(lo <= pred && pred <= hi) {
            return Err(RecoError::violation(
                Clause::PredictionRange,
                format!(
                    "{task} prediction for user {user} item {item} is {pred}, expected in [{lo}, {hi}]",
                    task = self.task,
                    user = self.config.probe.user,
                    item = self.config.probe.item,
                ),
            ));
        }
        Ok(pred)
    }

    /// Clause 2: popular cold start returns `default_pred` exactly.
    ///
    /// # Errors
    ///
    /// Returns a [`Clause::PopularFallback`] violation, or the model's own error.
    pub fn check_popular_fallback(&self) -> Result<f32> {
        let query = self.config.popular_probe.clone().cold_start(ColdStart::Popular);
        let pred = self.model.predict(&query)?;
        let default = self.model.default_pred();
        if pred != default {
            return Err(RecoError::violation(
                Clause::PopularFallback,
                format!("popular prediction {pred} != default_pred {default}"),
            ));
        }
        Ok(pred)
    }

    /// Clause 3: both cold queries score identically.
    ///
    /// # Errors
    ///
    /// Returns a [`Clause::ColdStartConsistency`] violation, or the model's own error.
    pub fn check_cold_start_consistency(&self) -> Result<f32> {
        let (first, second) = &self.config.cold_pair;
        let a = self.model.predict(first)?;
        let b = self.model.predict(second)?;
        if a != b {
            return Err(RecoError::violation(
                Clause::ColdStartConsistency,
                format!(
                    "user {} scored {a} but user {} scored {b} for item {}",
                    first.user, second.user, second.item
                ),
            ));
        }
        Ok(a)
    }

    /// Clause 4: feature batch and explicit-feature query.
    ///
    /// # Errors
    ///
    /// Returns a [`Clause::FeatureBatch`] violation if the sample is too short,
    /// batch prediction fails or returns the wrong count, and a
    /// [`Clause::FeatureQuery`] violation if the feature probe fails.
    pub fn check_features(&self, sample: &[Interaction]) -> Result<Vec<f32>> {
        let n = self.config.sample_size;
        if sample.len() < n {
            return Err(RecoError::violation(
                Clause::FeatureBatch,
                format!("sample has {} rows, need {n}", sample.len()),
            ));
        }

        let preds = predict_data_with_feats(self.model, &sample[..n])
            .map_err(|e| RecoError::violation(Clause::FeatureBatch, e.to_string()))?;
        if preds.len() != n {
            return Err(RecoError::violation(
                Clause::FeatureBatch,
                format!("got {} predictions for {n} rows", preds.len()),
            ));
        }

        self.model
            .predict(&self.config.feature_probe)
            .map_err(|e| RecoError::violation(Clause::FeatureQuery, e.to_string()))?;
        Ok(preds)
    }

    /// Runs all clauses, stopping at the first violation.
    ///
    /// # Errors
    ///
    /// Returns the first violation or model error.
    pub fn verify(&self, sample: &[Interaction], with_feats: bool) -> Result<ContractReport> {
        let mut clauses = Vec::with_capacity(5);
        let model = self.model.name();

        let probe_pred = self.check_range()?;
        clauses.push(Clause::PredictionRange);
        tracing::debug!(model, clause = %Clause::PredictionRange, pred = probe_pred, "clause holds");

        let popular_pred = self.check_popular_fallback()?;
        clauses.push(Clause::PopularFallback);
        tracing::debug!(model, clause = %Clause::PopularFallback, pred = popular_pred, "clause holds");

        let cold_pred = self.check_cold_start_consistency()?;
        clauses.push(Clause::ColdStartConsistency);
        tracing::debug!(model, clause = %Clause::ColdStartConsistency, pred = cold_pred, "clause holds");

        let batch_preds = if with_feats {
            let preds = self.check_features(sample)?;
            clauses.extend([Clause::FeatureBatch, Clause::FeatureQuery]);
            tracing::debug!(model, rows = preds.len(), "feature clauses hold");
            Some(preds)
        } else {
            None
        };

        Ok(ContractReport {
            task: self.task,
            clauses,
            probe_pred,
            popular_pred,
            cold_pred,
            batch_preds,
        })
    }
}

/// Checks all clauses with the default probes.
///
/// # Errors
///
/// Returns the first violation or model error.
pub fn check_predictions(
    model: &dyn Recommender,
    task: Task,
    sample: &[Interaction],
    with_feats: bool,
) -> Result<ContractReport> {
    PredictionContract::new(model, task).verify(sample, with_feats)
}

/// Checks all clauses with explicit probes.
///
/// # Errors
///
/// Returns the first violation or model error.
pub fn check_predictions_with(
    model: &dyn Recommender,
    task: Task,
    sample: &[Interaction],
    with_feats: bool,
    config: ContractConfig,
) -> Result<ContractReport> {
    PredictionContract::with_config(model, task, config).verify(sample, with_feats)
}

/// Assertion form of [`check_predictions`] for test suites.
///
/// # Panics
///
/// Panics with the violation message if any clause fails.
pub fn assert_prediction_contract(
    model: &dyn Recommender,
    task: Task,
    sample: &[Interaction],
    with_feats: bool,
) {
    if let Err(e) = check_predictions(model, task, sample, with_feats) {
        panic!("{e}");
    }
}

#[cfg(test)]
#[path = "tests_prediction_contract.rs"]
mod tests_prediction_contract;
