//! Biased matrix factorization.

use super::factors::{self, dot, Factors};
use crate::config::TrainConfig;
use crate::data::{DataInfo, FeatureSpec, Interactions};
use crate::error::{RecoError, Result};
use crate::traits::{ColdStart, Query, Recommender, Task};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Biased matrix factorization trained with SGD.
///
/// ```text
/// r̂(u, i) = μ + b_u + b_i + p_u · q_i
/// ```
///
/// For ranking tasks `μ` is 0, the output goes through a sigmoid and the
/// loss is logistic. Side features are not supported.
///
/// # Examples
///
/// ```
/// use aprender_reco::prelude::*;
///
/// let data: Interactions = vec![
///     Interaction::new(1, 10, 5.0),
///     Interaction::new(1, 11, 1.0),
///     Interaction::new(2, 10, 4.0),
/// ]
/// .into_iter()
/// .collect();
///
/// let mut model = Svd::new(Task::Rating).with_embed_size(4).with_n_epochs(10);
/// model.fit(&data).unwrap();
///
/// let pred = model.predict(&Query::new(2, 11)).unwrap();
/// assert!((1.0..=5.0).contains(&pred));
///
/// let cold = model
///     .predict(&Query::new("cold user2", "cold item2").cold_start(ColdStart::Popular))
///     .unwrap();
/// assert_eq!(cold, model.default_pred());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Svd {
    task: Task,
    config: TrainConfig,
    params: Option<SvdParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SvdParams {
    info: DataInfo,
    mu: f32,
    user_bias: Vec<f32>,
    item_bias: Vec<f32>,
    user_factors: Factors,
    item_factors: Factors,
    avg_user_bias: f32,
    avg_item_bias: f32,
    avg_user: Vec<f32>,
    avg_item: Vec<f32>,
}

impl Svd {
    /// Creates an unfitted model with default hyperparameters.
    #[must_use]
    pub fn new(task: Task) -> Self {
        Self::from_config(task, TrainConfig::default())
    }

    /// Creates an unfitted model from a config.
    #[must_use]
    pub fn from_config(task: Task, config: TrainConfig) -> Self {
        Self {
            task,
            config,
            params: None,
        }
    }

    /// Sets the latent dimension.
    #[must_use]
    pub fn with_embed_size(mut self, embed_size: usize) -> Self {
        self.config.embed_size = embed_size;
        self
    }

    /// Sets the number of epochs.
    #[must_use]
    pub fn with_n_epochs(mut self, n_epochs: usize) -> Self {
        self.config.n_epochs = n_epochs;
        self
    }

    /// Sets the learning rate.
    #[must_use]
    pub fn with_lr(mut self, lr: f32) -> Self {
        self.config.lr = lr;
        self
    }

    /// Sets the L2 regularization strength.
    #[must_use]
    pub fn with_reg(mut self, reg: f32) -> Self {
        self.config.reg = reg;
        self
    }

    /// Sets the RNG seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    /// Hyperparameters in use.
    #[must_use]
    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    /// Returns true once `fit` has succeeded.
    #[must_use]
    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    /// Trains on `data`, replacing any previous fit.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, `data` is empty, a label is
    /// not finite, or a ranking label is not 0/1.
    pub fn fit(&mut self, data: &Interactions) -> Result<()> {
        self.config.validate()?;
        let info = DataInfo::build(data, &FeatureSpec::default())?;
        factors::check_labels(self.task, data.iter().map(|r| r.label))?;

        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mu = match self.task {
            Task::Rating => info.global_mean(),
            Task::Ranking => 0.0,
        };
        let mut user_bias = vec![0.0; info.n_users()];
        let mut item_bias = vec![0.0; info.n_items()];
        let mut user_factors = Factors::normal(info.n_users(), cfg.embed_size, cfg.init_std, &mut rng);
        let mut item_factors = Factors::normal(info.n_items(), cfg.embed_size, cfg.init_std, &mut rng);

        let mut triples = Vec::with_capacity(data.len());
        for row in data {
            let (Some(u), Some(i)) = (info.user_idx(&row.user), info.item_idx(&row.item)) else {
                return Err(RecoError::invalid_input("training row missing from index"));
            };
            triples.push((u, i, row.label));
        }

        let (lr, reg) = (cfg.lr, cfg.reg);
        for epoch in 0..cfg.n_epochs {
            triples.shuffle(&mut rng);
            let mut loss = 0.0_f32;

            for &(u, i, y) in &triples {
                let p_u = user_factors.row_mut(u);
                let q_i = item_factors.row_mut(i);
                let raw = mu + user_bias[u] + item_bias[i] + dot(p_u, q_i);
                let err = factors::residual(self.task, y, raw);
                loss += factors::example_loss(self.task, y, factors::finalize(self.task, raw, &info));

                let (b_u, b_i) = (user_bias[u], item_bias[i]);
                user_bias[u] = b_u + lr * (err - reg * b_u);
                item_bias[i] = b_i + lr * (err - reg * b_i);
                for (p, q) in p_u.iter_mut().zip(q_i.iter_mut()) {
                    let p_old = *p;
                    *p += lr * (err * *q - reg * *p);
                    *q += lr * (err * p_old - reg * *q);
                }
            }

            tracing::debug!(
                model = "Svd",
                epoch,
                loss = loss / triples.len() as f32,
                "epoch finished"
            );
        }

        let params = SvdParams {
            mu,
            avg_user_bias: factors::mean(&user_bias),
            avg_item_bias: factors::mean(&item_bias),
            avg_user: user_factors.mean_row(),
            avg_item: item_factors.mean_row(),
            user_bias,
            item_bias,
            user_factors,
            item_factors,
            info,
        };
        tracing::info!(
            model = "Svd",
            task = %self.task,
            n_users = params.info.n_users(),
            n_items = params.info.n_items(),
            epochs = cfg.n_epochs,
            "fit complete"
        );
        self.params = Some(params);
        Ok(())
    }

    fn params(&self) -> Result<&SvdParams> {
        self.params.as_ref().ok_or_else(|| RecoError::NotFitted {
            model: self.name().to_string(),
        })
    }

    /// Saves the model as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        factors::save_json(self, path)
    }

    /// Loads a model saved with [`Svd::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        factors::load_json(path)
    }
}

impl Recommender for Svd {
    fn name(&self) -> &'static str {
        "Svd"
    }

    fn task(&self) -> Task {
        self.task
    }

    fn default_pred(&self) -> f32 {
        factors::default_pred(self.task, self.params.as_ref().map(|p| &p.info))
    }

    fn data_info(&self) -> Result<&DataInfo> {
        Ok(&self.params()?.info)
    }

    fn predict(&self, query: &Query) -> Result<f32> {
        let params = self.params()?;
        if query.has_feats() {
            return Err(RecoError::FeaturesUnsupported {
                model: self.name().to_string(),
            });
        }

        let u = params.info.user_idx(&query.user);
        let i = params.info.item_idx(&query.item);
        if (u.is_none() || i.is_none()) && query.cold_start == ColdStart::Popular {
            return Ok(self.default_pred());
        }

        let (b_u, p_u) = match u {
            Some(u) => (params.user_bias[u], params.user_factors.row(u)),
            None => (params.avg_user_bias, params.avg_user.as_slice()),
        };
        let (b_i, q_i) = match i {
            Some(i) => (params.item_bias[i], params.item_factors.row(i)),
            None => (params.avg_item_bias, params.avg_item.as_slice()),
        };

        let raw = params.mu + b_u + b_i + dot(p_u, q_i);
        Ok(factors::finalize(self.task, raw, &params.info))
    }
}
