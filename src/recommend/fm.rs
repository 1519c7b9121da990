//! Factorization machine with side features.

use super::factors::{self, Factors};
use crate::config::TrainConfig;
use crate::data::{DataInfo, FeatureSpec, Features, Interactions};
use crate::error::{RecoError, Result};
use crate::traits::{ColdStart, Query, Recommender, Task};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Second-order factorization machine (Rendle, 2010).
///
/// Every interaction is encoded as a sparse vector: one-hot user id, one-hot
/// item id, one slot per categorical feature value and one slot per numeric
/// column scaled by its standardized value.
///
/// ```text
/// ŷ(x) = w₀ + Σ wⱼxⱼ + ½ Σ_f [(Σ v_jf xⱼ)² − Σ v_jf² xⱼ²]
/// ```
///
/// Known users and items contribute their stored features; query features
/// override them. An unknown user (item) under [`ColdStart::Average`] is
/// represented by the mean of the user (item) id parameters.
///
/// # References
///
/// - Rendle, S. (2010). Factorization Machines. ICDM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fm {
    task: Task,
    config: TrainConfig,
    spec: FeatureSpec,
    params: Option<FmParams>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FmParams {
    info: DataInfo,
    /// Start offset of each encoded feature column.
    offsets: Vec<(String, usize)>,
    w0: f32,
    w: Vec<f32>,
    v: Factors,
    avg_user_w: f32,
    avg_user_v: Vec<f32>,
    avg_item_w: f32,
    avg_item_v: Vec<f32>,
}

/// One active input: weight, factor row, input value.
struct Term<'a> {
    w: f32,
    v: &'a [f32],
    x: f32,
}

impl FmParams {
    fn item_offset(&self) -> usize {
        self.info.n_users()
    }

    /// Sparse `(index, value)` encoding of known ids and features.
    fn encode(&self, user: Option<usize>, item: Option<usize>, feats: &Features) -> Vec<(usize, f32)> {
        let mut x = Vec::with_capacity(2 + self.offsets.len());
        if let Some(u) = user {
            x.push((u, 1.0));
        }
        if let Some(i) = item {
            x.push((self.item_offset() + i, 1.0));
        }
        for (col, offset) in &self.offsets {
            if let Some((k, value)) = feats.get(col).and_then(|v| self.info.slot(col, v)) {
                x.push((offset + k, value));
            }
        }
        x
    }

    fn score(&self, terms: &[Term<'_>]) -> f32 {
        let mut raw = self.w0;
        for t in terms {
            raw += t.w * t.x;
        }
        for f in 0..self.v.dim() {
            let mut sum = 0.0_f32;
            let mut sum_sq = 0.0_f32;
            for t in terms {
                let vx = t.v[f] * t.x;
                sum += vx;
                sum_sq += vx * vx;
            }
            raw += 0.5 * (sum * sum - sum_sq);
        }
        raw
    }

    fn terms<'a>(&'a self, x: &[(usize, f32)]) -> Vec<Term<'a>> {
        x.iter()
            .map(|&(j, value)| Term {
                w: self.w[j],
                v: self.v.row(j),
                x: value,
            })
            .collect()
    }
}

impl Fm {
    /// Creates an unfitted model with default hyperparameters and no features.
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
            spec: FeatureSpec::default(),
            params: None,
        }
    }

    /// Declares the side-feature columns to learn from.
    #[must_use]
    pub fn with_features(mut self, spec: FeatureSpec) -> Self {
        self.spec = spec;
        self
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

    /// Declared feature columns.
    #[must_use]
    pub fn feature_spec(&self) -> &FeatureSpec {
        &self.spec
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
    /// not finite, a ranking label is not 0/1, or a feature column mixes kinds.
    pub fn fit(&mut self, data: &Interactions) -> Result<()> {
        self.config.validate()?;
        let info = DataInfo::build(data, &self.spec)?;
        factors::check_labels(self.task, data.iter().map(|r| r.label))?;

        let mut offsets = Vec::new();
        let mut n_features = info.n_users() + info.n_items();
        for col in self.spec.columns() {
            if let Some(kind) = info.column(col) {
                offsets.push((col.to_string(), n_features));
                n_features += kind.width();
            }
        }

        let cfg = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let mut params = FmParams {
            w0: match self.task {
                Task::Rating => info.global_mean(),
                Task::Ranking => 0.0,
            },
            w: vec![0.0; n_features],
            v: Factors::normal(n_features, cfg.embed_size, cfg.init_std, &mut rng),
            avg_user_w: 0.0,
            avg_user_v: Vec::new(),
            avg_item_w: 0.0,
            avg_item_v: Vec::new(),
            offsets,
            info,
        };

        let mut examples = Vec::with_capacity(data.len());
        for row in data {
            let u = params.info.user_idx(&row.user);
            let i = params.info.item_idx(&row.item);
            examples.push((params.encode(u, i, &row.feats), row.label));
        }

        let (lr, reg) = (cfg.lr, cfg.reg);
        let mut sums = vec![0.0_f32; cfg.embed_size];
        for epoch in 0..cfg.n_epochs {
            examples.shuffle(&mut rng);
            let mut loss = 0.0_f32;

            for (x, y) in &examples {
                let raw = params.score(&params.terms(x));
                let err = factors::residual(self.task, *y, raw);
                loss += factors::example_loss(self.task, *y, factors::finalize(self.task, raw, &params.info));

                for (f, s) in sums.iter_mut().enumerate() {
                    *s = x.iter().map(|&(j, xj)| params.v.row(j)[f] * xj).sum();
                }

                params.w0 += lr * err;
                for &(j, xj) in x {
                    let w_j = params.w[j];
                    params.w[j] = w_j + lr * (err * xj - reg * w_j);
                    let v_j = params.v.row_mut(j);
                    for (vf, s) in v_j.iter_mut().zip(&sums) {
                        let grad = xj * s - *vf * xj * xj;
                        *vf += lr * (err * grad - reg * *vf);
                    }
                }
            }

            tracing::debug!(
                model = "Fm",
                epoch,
                loss = loss / examples.len() as f32,
                "epoch finished"
            );
        }

        let n_users = params.info.n_users();
        let n_items = params.info.n_items();
        params.avg_user_w = factors::mean(&params.w[..n_users]);
        params.avg_user_v = params.v.mean_rows(0, n_users);
        params.avg_item_w = factors::mean(&params.w[n_users..n_users + n_items]);
        params.avg_item_v = params.v.mean_rows(n_users, n_users + n_items);

        tracing::info!(
            model = "Fm",
            task = %self.task,
            n_users,
            n_items,
            n_features,
            epochs = cfg.n_epochs,
            "fit complete"
        );
        self.params = Some(params);
        Ok(())
    }

    fn params(&self) -> Result<&FmParams> {
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

    /// Loads a model saved with [`Fm::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        factors::load_json(path)
    }
}

impl Recommender for Fm {
    fn name(&self) -> &'static str {
        "Fm"
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

    fn supports_features(&self) -> bool {
        true
    }

    fn predict(&self, query: &Query) -> Result<f32> {
        let params = self.params()?;
        let u = params.info.user_idx(&query.user);
        let i = params.info.item_idx(&query.item);
        if (u.is_none() || i.is_none()) && query.cold_start == ColdStart::Popular {
            return Ok(self.default_pred());
        }

        let feats = params.info.merged_features(u, i, &query.feats);
        let x = params.encode(u, i, &feats);
        let mut terms = params.terms(&x);
        if u.is_none() {
            terms.push(Term {
                w: params.avg_user_w,
                v: &params.avg_user_v,
                x: 1.0,
            });
        }
        if i.is_none() {
            terms.push(Term {
                w: params.avg_item_w,
                v: &params.avg_item_v,
                x: 1.0,
            });
        }

        let raw = params.score(&terms);
        Ok(factors::finalize(self.task, raw, &params.info))
    }
}
