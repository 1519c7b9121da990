//! Core traits for recommendation models.
//!
//! Every model answers point queries through [`Recommender::predict`]. A
//! [`Query`] names the user and item, the cold-start policy to apply when
//! either is unknown, and optional side features.

use crate::data::{DataInfo, FeatValue, Features, RawId};
use crate::error::{RecoError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the label means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    /// Explicit ratings; predictions are clipped to the training label range.
    Rating,
    /// Implicit 0/1 feedback; predictions are probabilities.
    Ranking,
}

impl Task {
    /// Range every valid prediction must fall in, given the rating scale.
    #[must_use]
    pub fn score_range(self, rating_range: (f32, f32)) -> (f32, f32) {
        match self {
            Task::Rating => rating_range,
            Task::Ranking => (0.0, 1.0),
        }
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Task::Rating => write!(f, "rating"),
            Task::Ranking => write!(f, "ranking"),
        }
    }
}

impl FromStr for Task {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "rating" => Ok(Task::Rating),
            "ranking" => Ok(Task::Ranking),
            _ => Err(RecoError::InvalidHyperparameter {
                param: "task".to_string(),
                value: s.to_string(),
                constraint: "one of rating, ranking".to_string(),
            }),
        }
    }
}

/// How to score a pair whose user or item was not seen in training.
///
/// # Examples
///
/// ```
/// use aprender_reco::traits::ColdStart;
///
/// assert_eq!(ColdStart::default(), ColdStart::Average);
/// assert_eq!("popular".parse::<ColdStart>().unwrap(), ColdStart::Popular);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColdStart {
    /// Represent the unknown side by the mean of all trained parameters.
    #[default]
    Average,
    /// Return the model's `default_pred`.
    Popular,
}

impl fmt::Display for ColdStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColdStart::Average => write!(f, "average"),
            ColdStart::Popular => write!(f, "popular"),
        }
    }
}

impl FromStr for ColdStart {
    type Err = RecoError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "average" => Ok(ColdStart::Average),
            "popular" => Ok(ColdStart::Popular),
            _ => Err(RecoError::InvalidHyperparameter {
                param: "cold_start".to_string(),
                value: s.to_string(),
                constraint: "one of average, popular".to_string(),
            }),
        }
    }
}

/// A single prediction request.
///
/// # Examples
///
/// ```
/// use aprender_reco::traits::{ColdStart, Query};
///
/// let query = Query::new(2211, 110)
///     .with_feat("sex", "male")
///     .with_feat("genre_1", "crime");
/// assert_eq!(query.feats.len(), 2);
///
/// let cold = Query::new("cold user2", "cold item2").cold_start(ColdStart::Popular);
/// assert_eq!(cold.cold_start, ColdStart::Popular);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// User to score for.
    pub user: RawId,
    /// Item to score.
    pub item: RawId,
    /// Policy for unseen users or items.
    #[serde(default)]
    pub cold_start: ColdStart,
    /// Side features overriding stored ones.
    #[serde(default)]
    pub feats: Features,
}

impl Query {
    /// Creates a query with the default cold-start policy and no features.
    pub fn new(user: impl Into<RawId>, item: impl Into<RawId>) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            cold_start: ColdStart::default(),
            feats: Features::new(),
        }
    }

    /// Sets the cold-start policy.
    #[must_use]
    pub fn cold_start(mut self, cold_start: ColdStart) -> Self {
        self.cold_start = cold_start;
        self
    }

    /// Replaces all side features.
    #[must_use]
    pub fn with_feats(mut self, feats: Features) -> Self {
        self.feats = feats;
        self
    }

    /// Adds one side feature.
    #[must_use]
    pub fn with_feat(mut self, name: &str, value: impl Into<FeatValue>) -> Self {
        self.feats.insert(name.to_string(), value.into());
        self
    }

    /// Returns true if the query carries side features.
    #[must_use]
    pub fn has_feats(&self) -> bool {
        !self.feats.is_empty()
    }
}

/// Primary trait for trained recommendation models.
///
/// Implementors share these prediction rules:
///
/// - `default_pred` is the global mean for rating tasks and 0 for ranking.
/// - [`ColdStart::Popular`] returns `default_pred` whenever the user or the
///   item is unknown.
/// - [`ColdStart::Average`] scores an unknown user (item) with the mean of the
///   trained user (item) parameters, so the result does not depend on which
///   unknown id was passed.
pub trait Recommender {
    /// Short model name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Task the model was trained for.
    fn task(&self) -> Task;

    /// Score returned for unknown pairs under [`ColdStart::Popular`].
    fn default_pred(&self) -> f32;

    /// Training index.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted.
    fn data_info(&self) -> Result<&DataInfo>;

    /// Returns true if `predict` accepts side features.
    fn supports_features(&self) -> bool {
        false
    }

    /// Scores one user-item pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the model is not fitted, or the query carries
    /// features the model cannot use.
    fn predict(&self, query: &Query) -> Result<f32>;

    /// Scores a pair with the default cold-start policy and no features.
    ///
    /// # Errors
    ///
    /// See [`Recommender::predict`].
    fn predict_pair(&self, user: RawId, item: RawId) -> Result<f32> {
        self.predict(&Query::new(user, item))
    }

    /// Top-`n` unseen items for a user, highest score first.
    ///
    /// Items the user interacted with in training, and items whose score is
    /// not finite, are skipped. An unknown user under [`ColdStart::Popular`]
    /// gets the most popular items, each scored with `default_pred`.
    ///
    /// # Errors
    ///
    /// Returns an error if `n` is zero or the model is not fitted.
    fn recommend_user(
        &self,
        user: RawId,
        n: usize,
        cold_start: ColdStart,
    ) -> Result<Vec<(RawId, f32)>> {
        if n == 0 {
            return Err(RecoError::InvalidHyperparameter {
                param: "n".to_string(),
                value: "0".to_string(),
                constraint: ">0".to_string(),
            });
        }
        let info = self.data_info()?;
        let known = info.user_idx(&user);

        if known.is_none() && cold_start == ColdStart::Popular {
            let default = self.default_pred();
            return Ok(info
                .popular_items()
                .into_iter()
                .take(n)
                .filter_map(|i| info.item_id(i).map(|id| (id.clone(), default)))
                .collect());
        }

        let mut scored = Vec::with_capacity(info.n_items());
        for i in 0..info.n_items() {
            if known.is_some_and(|u| info.is_consumed(u, i)) {
                continue;
            }
            let Some(item) = info.item_id(i) else {
                continue;
            };
            let query = Query::new(user.clone(), item.clone()).cold_start(cold_start);
            let score = self.predict(&query)?;
            if !score.is_finite() {
                tracing::warn!(model = self.name(), %item, score, "skipping non-finite score");
                continue;
            }
            scored.push((i, item.clone(), score));
        }
        scored.sort_by(|a, b| b.2.total_cmp(&a.2).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(n)
            .map(|(_, item, score)| (item, score))
            .collect())
    }
}
