//! Id and feature indexing built from training interactions.

use super::{FeatValue, Features, Interaction, Interactions, RawId};
use crate::error::{RecoError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Names of the side-feature columns, split by the entity they describe.
///
/// # Examples
///
/// ```
/// use aprender_reco::data::FeatureSpec;
///
/// let spec = FeatureSpec::new(&["sex", "age"], &["genre_1"]);
/// assert!(spec.contains("genre_1"));
/// assert_eq!(spec.columns().count(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpec {
    /// Columns describing the user.
    #[serde(default)]
    pub user_cols: Vec<String>,
    /// Columns describing the item.
    #[serde(default)]
    pub item_cols: Vec<String>,
}

impl FeatureSpec {
    /// Creates a spec from column names.
    #[must_use]
    pub fn new(user_cols: &[&str], item_cols: &[&str]) -> Self {
        Self {
            user_cols: user_cols.iter().map(|c| (*c).to_string()).collect(),
            item_cols: item_cols.iter().map(|c| (*c).to_string()).collect(),
        }
    }

    /// Returns true if no feature columns are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_cols.is_empty() && self.item_cols.is_empty()
    }

    /// Returns true if `name` is a declared column.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.columns().any(|c| c == name)
    }

    /// User columns followed by item columns.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.user_cols
            .iter()
            .chain(self.item_cols.iter())
            .map(String::as_str)
    }
}

/// How a feature column is encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ColumnKind {
    /// One slot per category, in first-seen order.
    Categorical(Vec<String>),
    /// A single slot scaled by the standardized value.
    Numeric {
        /// Mean of the observed values.
        mean: f32,
        /// Standard deviation of the observed values, 1 if constant.
        std: f32,
    },
}

impl ColumnKind {
    /// Number of slots the column occupies.
    #[must_use]
    pub fn width(&self) -> usize {
        match self {
            ColumnKind::Categorical(vocab) => vocab.len(),
            ColumnKind::Numeric { .. } => 1,
        }
    }
}

/// Indexing and statistics of a training set.
///
/// Users and items get dense indices in first-seen order. For every declared
/// feature column the last value observed for a user (or item) is kept, so a
/// known entity can be scored without the caller repeating its features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredInfo")]
pub struct DataInfo {
    spec: FeatureSpec,
    user_ids: Vec<RawId>,
    item_ids: Vec<RawId>,
    global_mean: f32,
    min_label: f32,
    max_label: f32,
    columns: BTreeMap<String, ColumnKind>,
    user_feats: Vec<Features>,
    item_feats: Vec<Features>,
    consumed: Vec<Vec<usize>>,
    item_counts: Vec<usize>,
    #[serde(skip)]
    user_index: HashMap<RawId, usize>,
    #[serde(skip)]
    item_index: HashMap<RawId, usize>,
    #[serde(skip)]
    vocab_index: HashMap<String, HashMap<String, usize>>,
}

#[derive(Deserialize)]
struct StoredInfo {
    spec: FeatureSpec,
    user_ids: Vec<RawId>,
    item_ids: Vec<RawId>,
    global_mean: f32,
    min_label: f32,
    max_label: f32,
    columns: BTreeMap<String, ColumnKind>,
    user_feats: Vec<Features>,
    item_feats: Vec<Features>,
    consumed: Vec<Vec<usize>>,
    item_counts: Vec<usize>,
}

impl From<StoredInfo> for DataInfo {
    fn from(stored: StoredInfo) -> Self {
        let mut info = DataInfo {
            spec: stored.spec,
            user_ids: stored.user_ids,
            item_ids: stored.item_ids,
            global_mean: stored.global_mean,
            min_label: stored.min_label,
            max_label: stored.max_label,
            columns: stored.columns,
            user_feats: stored.user_feats,
            item_feats: stored.item_feats,
            consumed: stored.consumed,
            item_counts: stored.item_counts,
            user_index: HashMap::new(),
            item_index: HashMap::new(),
            vocab_index: HashMap::new(),
        };
        info.reindex();
        info
    }
}

fn index_of(ids: &[RawId]) -> HashMap<RawId, usize> {
    ids.iter().enumerate().map(|(i, id)| (id.clone(), i)).collect()
}

/// Records `value` in the column's encoding, creating the column on first use.
fn register_value(
    columns: &mut BTreeMap<String, ColumnKind>,
    vocab_index: &mut HashMap<String, HashMap<String, usize>>,
    col: &str,
    value: &FeatValue,
) -> Result<()> {
    let kind = columns.entry(col.to_string()).or_insert_with(|| {
        if value.is_categorical() {
            ColumnKind::Categorical(Vec::new())
        } else {
            ColumnKind::Numeric { mean: 0.0, std: 1.0 }
        }
    });
    match (kind, value) {
        (ColumnKind::Categorical(vocab), FeatValue::Cat(category)) => {
            let index = vocab_index.entry(col.to_string()).or_default();
            if !index.contains_key(category) {
                index.insert(category.clone(), vocab.len());
                vocab.push(category.clone());
            }
            Ok(())
        }
        (ColumnKind::Numeric { .. }, FeatValue::Num(_)) => Ok(()),
        _ => Err(RecoError::FeatureKind {
            column: col.to_string(),
        }),
    }
}

impl DataInfo {
    /// Indexes a training set.
    ///
    /// # Errors
    ///
    /// Returns an error if `data` is empty, a label is not finite, or a
    /// declared column holds both categorical and numeric values.
    pub fn build(data: &Interactions, spec: &FeatureSpec) -> Result<Self> {
        if data.is_empty() {
            return Err(RecoError::empty_input("training interactions"));
        }

        let mut info = DataInfo {
            spec: spec.clone(),
            user_ids: Vec::new(),
            item_ids: Vec::new(),
            global_mean: 0.0,
            min_label: f32::INFINITY,
            max_label: f32::NEG_INFINITY,
            columns: BTreeMap::new(),
            user_feats: Vec::new(),
            item_feats: Vec::new(),
            consumed: Vec::new(),
            item_counts: Vec::new(),
            user_index: HashMap::new(),
            item_index: HashMap::new(),
            vocab_index: HashMap::new(),
        };

        let mut label_sum = 0.0_f64;
        for row in data {
            if !row.label.is_finite() {
                return Err(RecoError::invalid_input(format!(
                    "non-finite label for user {} item {}",
                    row.user, row.item
                )));
            }
            label_sum += f64::from(row.label);
            info.min_label = info.min_label.min(row.label);
            info.max_label = info.max_label.max(row.label);

            let u = info.intern_user(&row.user);
            let i = info.intern_item(&row.item);
            info.consumed[u].push(i);
            info.item_counts[i] += 1;
            info.absorb_features(u, i, row)?;
        }
        info.global_mean = (label_sum / data.len() as f64) as f32;

        for items in &mut info.consumed {
            items.sort_unstable();
            items.dedup();
        }
        info.standardize_numeric(data);

        tracing::debug!(
            n_users = info.n_users(),
            n_items = info.n_items(),
            n_columns = info.columns.len(),
            global_mean = info.global_mean,
            "indexed training data"
        );
        Ok(info)
    }

    fn intern_user(&mut self, id: &RawId) -> usize {
        if let Some(&u) = self.user_index.get(id) {
            return u;
        }
        let u = self.user_ids.len();
        self.user_ids.push(id.clone());
        self.user_index.insert(id.clone(), u);
        self.user_feats.push(Features::new());
        self.consumed.push(Vec::new());
        u
    }

    fn intern_item(&mut self, id: &RawId) -> usize {
        if let Some(&i) = self.item_index.get(id) {
            return i;
        }
        let i = self.item_ids.len();
        self.item_ids.push(id.clone());
        self.item_index.insert(id.clone(), i);
        self.item_feats.push(Features::new());
        self.item_counts.push(0);
        i
    }

    fn absorb_features(&mut self, u: usize, i: usize, row: &Interaction) -> Result<()> {
        let Self {
            spec,
            columns,
            vocab_index,
            user_feats,
            item_feats,
            ..
        } = self;
        let targets = [
            (&spec.user_cols, &mut user_feats[u]),
            (&spec.item_cols, &mut item_feats[i]),
        ];
        for (cols, stored) in targets {
            for col in cols {
                let Some(value) = row.feats.get(col) else {
                    continue;
                };
                if value.as_number().is_some_and(|x| !x.is_finite()) {
                    return Err(RecoError::invalid_input(format!(
                        "non-finite value for feature {col} (user {} item {})",
                        row.user, row.item
                    )));
                }
                register_value(columns, vocab_index, col, value)?;
                stored.insert(col.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn standardize_numeric(&mut self, data: &Interactions) {
        for (col, kind) in &mut self.columns {
            let ColumnKind::Numeric { mean, std } = kind else {
                continue;
            };
            let values: Vec<f64> = data
                .iter()
                .filter_map(|row| row.feats.get(col).and_then(FeatValue::as_number))
                .map(f64::from)
                .collect();
            if values.is_empty() {
                continue;
            }
            let n = values.len() as f64;
            let m = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            *mean = m as f32;
            *std = if var > 0.0 { var.sqrt() as f32 } else { 1.0 };
        }
    }

    fn reindex(&mut self) {
        self.user_index = index_of(&self.user_ids);
        self.item_index = index_of(&self.item_ids);
        self.vocab_index = self
            .columns
            .iter()
            .filter_map(|(col, kind)| match kind {
                ColumnKind::Categorical(vocab) => Some((
                    col.clone(),
                    vocab
                        .iter()
                        .enumerate()
                        .map(|(k, v)| (v.clone(), k))
                        .collect(),
                )),
                ColumnKind::Numeric { .. } => None,
            })
            .collect();
    }

    /// Declared feature columns.
    #[must_use]
    pub fn spec(&self) -> &FeatureSpec {
        &self.spec
    }

    /// Number of distinct training users.
    #[must_use]
    pub fn n_users(&self) -> usize {
        self.user_ids.len()
    }

    /// Number of distinct training items.
    #[must_use]
    pub fn n_items(&self) -> usize {
        self.item_ids.len()
    }

    /// Dense index of a user, `None` if unseen.
    #[must_use]
    pub fn user_idx(&self, id: &RawId) -> Option<usize> {
        self.user_index.get(id).copied()
    }

    /// Dense index of an item, `None` if unseen.
    #[must_use]
    pub fn item_idx(&self, id: &RawId) -> Option<usize> {
        self.item_index.get(id).copied()
    }

    /// Raw id of an item index.
    #[must_use]
    pub fn item_id(&self, idx: usize) -> Option<&RawId> {
        self.item_ids.get(idx)
    }

    /// Raw id of a user index.
    #[must_use]
    pub fn user_id(&self, idx: usize) -> Option<&RawId> {
        self.user_ids.get(idx)
    }

    /// Mean training label.
    #[must_use]
    pub fn global_mean(&self) -> f32 {
        self.global_mean
    }

    /// Smallest and largest training label.
    #[must_use]
    pub fn label_bounds(&self) -> (f32, f32) {
        (self.min_label, self.max_label)
    }

    /// Encoding of a declared column, `None` if the column never had a value.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnKind> {
        self.columns.get(name)
    }

    /// Stored features of a known user.
    #[must_use]
    pub fn user_features(&self, u: usize) -> Option<&Features> {
        self.user_feats.get(u)
    }

    /// Stored features of a known item.
    #[must_use]
    pub fn item_features(&self, i: usize) -> Option<&Features> {
        self.item_feats.get(i)
    }

    /// Sorted item indices the user interacted with.
    #[must_use]
    pub fn consumed(&self, u: usize) -> &[usize] {
        self.consumed.get(u).map_or(&[], Vec::as_slice)
    }

    /// Returns true if the user interacted with the item in training.
    #[must_use]
    pub fn is_consumed(&self, u: usize, i: usize) -> bool {
        self.consumed(u).binary_search(&i).is_ok()
    }

    /// Item indices by descending interaction count, ties by index.
    #[must_use]
    pub fn popular_items(&self) -> Vec<usize> {
        let mut items: Vec<usize> = (0..self.n_items()).collect();
        items.sort_by(|&a, &b| self.item_counts[b].cmp(&self.item_counts[a]).then(a.cmp(&b)));
        items
    }

    /// Slot of a value within its column: `(offset in column, weight)`.
    ///
    /// Categorical values map to their vocabulary position with weight 1;
    /// numeric values map to slot 0 weighted by the standardized value. Unknown
    /// categories, non-finite numbers and kind mismatches yield `None`, so the
    /// value contributes nothing to a prediction.
    #[must_use]
    pub fn slot(&self, col: &str, value: &FeatValue) -> Option<(usize, f32)> {
        match (self.columns.get(col)?, value) {
            (ColumnKind::Categorical(_), FeatValue::Cat(category)) => self
                .vocab_index
                .get(col)
                .and_then(|index| index.get(category))
                .map(|&k| (k, 1.0)),
            (ColumnKind::Numeric { mean, std }, FeatValue::Num(x)) if x.is_finite() => {
                Some((0, (x - mean) / std))
            }
            _ => None,
        }
    }

    /// Features for scoring a pair: stored user and item features, overridden
    /// by `query` values. Undeclared query columns are dropped.
    #[must_use]
    pub fn merged_features(
        &self,
        user: Option<usize>,
        item: Option<usize>,
        query: &Features,
    ) -> Features {
        let mut merged = Features::new();
        if let Some(feats) = user.and_then(|u| self.user_features(u)) {
            merged.extend(feats.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(feats) = item.and_then(|i| self.item_features(i)) {
            merged.extend(feats.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        for (name, value) in query {
            if self.spec.contains(name) {
                merged.insert(name.clone(), value.clone());
            } else {
                tracing::debug!(column = %name, "ignoring undeclared feature column");
            }
        }
        merged
    }

    /// Turns positive interactions into a 0/1 training set.
    ///
    /// Every row is kept with label 1 and followed by `num_neg` rows with
    /// label 0 for items the user never interacted with. Negative rows carry
    /// the row's user features and the sampled item's stored features. Users
    /// who consumed every item get no negatives.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_neg` is zero.
    pub fn sample_negatives(
        &self,
        data: &Interactions,
        num_neg: usize,
        seed: u64,
    ) -> Result<Interactions> {
        if num_neg == 0 {
            return Err(RecoError::InvalidHyperparameter {
                param: "num_neg".to_string(),
                value: "0".to_string(),
                constraint: ">0".to_string(),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let n_items = self.n_items();
        let mut out = Vec::with_capacity(data.len() * (num_neg + 1));

        for row in data {
            let mut positive = row.clone();
            positive.label = 1.0;
            out.push(positive);

            let user = self.user_idx(&row.user);
            let n_consumed = user.map_or(0, |u| self.consumed(u).len());
            if n_items == 0 || n_consumed >= n_items {
                continue;
            }

            let user_feats: Features = row
                .feats
                .iter()
                .filter(|(k, _)| self.spec.user_cols.contains(*k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            for _ in 0..num_neg {
                let i = loop {
                    let candidate = rng.gen_range(0..n_items);
                    if !user.is_some_and(|u| self.is_consumed(u, candidate)) {
                        break candidate;
                    }
                };
                let mut feats = user_feats.clone();
                feats.extend(self.item_feats[i].iter().map(|(k, v)| (k.clone(), v.clone())));
                out.push(Interaction {
                    user: row.user.clone(),
                    item: self.item_ids[i].clone(),
                    label: 0.0,
                    feats,
                });
            }
        }

        Ok(Interactions::new(out))
    }
}
