//! Interaction data for recommendation workflows.
//!
//! An [`Interactions`] table holds `(user, item, label, features)` rows.
//! Users and items are addressed by [`RawId`], which accepts both integer
//! and string identifiers, so `1`, `2333` and `"cold user2"` are all valid.
//! Side features are kept as a sorted map from column name to [`FeatValue`].

pub mod info;
pub mod synthetic;

use crate::error::{RecoError, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

pub use info::{DataInfo, FeatureSpec};

/// A raw user or item identifier as it appears in the source data.
///
/// # Examples
///
/// ```
/// use aprender_reco::data::RawId;
///
/// assert_eq!(RawId::from(1), RawId::Int(1));
/// assert_eq!(RawId::from("cold user2").to_string(), "cold user2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawId {
    /// Integer identifier.
    Int(i64),
    /// String identifier.
    Str(String),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawId::Int(id) => write!(f, "{id}"),
            RawId::Str(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RawId {
    fn from(id: i64) -> Self {
        RawId::Int(id)
    }
}

impl From<i32> for RawId {
    fn from(id: i32) -> Self {
        RawId::Int(i64::from(id))
    }
}

impl From<u32> for RawId {
    fn from(id: u32) -> Self {
        RawId::Int(i64::from(id))
    }
}

impl From<&str> for RawId {
    fn from(id: &str) -> Self {
        RawId::Str(id.to_string())
    }
}

impl From<String> for RawId {
    fn from(id: String) -> Self {
        RawId::Str(id)
    }
}

impl From<&RawId> for RawId {
    fn from(id: &RawId) -> Self {
        id.clone()
    }
}

/// A single side-feature value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatValue {
    /// Numeric (dense) feature.
    Num(f32),
    /// Categorical (sparse) feature.
    Cat(String),
}

impl FeatValue {
    /// Returns the category, if categorical.
    #[must_use]
    pub fn as_category(&self) -> Option<&str> {
        match self {
            FeatValue::Cat(value) => Some(value),
            FeatValue::Num(_) => None,
        }
    }

    /// Returns the number, if numeric.
    #[must_use]
    pub fn as_number(&self) -> Option<f32> {
        match self {
            FeatValue::Num(value) => Some(*value),
            FeatValue::Cat(_) => None,
        }
    }

    /// Returns true for categorical values.
    #[must_use]
    pub fn is_categorical(&self) -> bool {
        matches!(self, FeatValue::Cat(_))
    }
}

impl fmt::Display for FeatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatValue::Num(value) => write!(f, "{value}"),
            FeatValue::Cat(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for FeatValue {
    fn from(value: &str) -> Self {
        FeatValue::Cat(value.to_string())
    }
}

impl From<String> for FeatValue {
    fn from(value: String) -> Self {
        FeatValue::Cat(value)
    }
}

impl From<f32> for FeatValue {
    fn from(value: f32) -> Self {
        FeatValue::Num(value)
    }
}

/// Side features keyed by column name.
pub type Features = BTreeMap<String, FeatValue>;

/// One labeled user-item interaction.
///
/// In JSON the feature columns sit next to `user`, `item` and `label`:
///
/// ```
/// use aprender_reco::data::{FeatValue, Interaction, RawId};
///
/// let row: Interaction =
///     serde_json::from_str(r#"{"user": 1, "item": "a", "label": 4.0, "sex": "F"}"#).unwrap();
/// assert_eq!(row.user, RawId::Int(1));
/// assert_eq!(row.feats.get("sex"), Some(&FeatValue::from("F")));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// User identifier.
    pub user: RawId,
    /// Item identifier.
    pub item: RawId,
    /// Rating or 0/1 relevance.
    pub label: f32,
    /// Side feature columns.
    #[serde(flatten)]
    pub feats: Features,
}

impl Interaction {
    /// Creates an interaction without side features.
    pub fn new(user: impl Into<RawId>, item: impl Into<RawId>, label: f32) -> Self {
        Self {
            user: user.into(),
            item: item.into(),
            label,
            feats: Features::new(),
        }
    }

    /// Adds a side feature column.
    #[must_use]
    pub fn with_feat(mut self, name: &str, value: impl Into<FeatValue>) -> Self {
        self.feats.insert(name.to_string(), value.into());
        self
    }
}

/// An ordered table of interactions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Interactions {
    rows: Vec<Interaction>,
}

impl Interactions {
    /// Creates a table from rows.
    #[must_use]
    pub fn new(rows: Vec<Interaction>) -> Self {
        Self { rows }
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Returns all rows.
    #[must_use]
    pub fn rows(&self) -> &[Interaction] {
        &self.rows
    }

    /// Returns the first `n` rows (fewer if the table is shorter).
    #[must_use]
    pub fn head(&self, n: usize) -> &[Interaction] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Iterates over rows.
    pub fn iter(&self) -> std::slice::Iter<'_, Interaction> {
        self.rows.iter()
    }

    /// Returns the label column.
    #[must_use]
    pub fn labels(&self) -> Vec<f32> {
        self.rows.iter().map(|r| r.label).collect()
    }

    /// Appends a row.
    pub fn push(&mut self, row: Interaction) {
        self.rows.push(row);
    }

    /// Parses JSON lines, one interaction object per line. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure or on the first malformed line.
    pub fn from_json_lines<R: BufRead>(reader: R) -> Result<Self> {
        let mut rows = Vec::new();
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let row: Interaction = serde_json::from_str(trimmed).map_err(|e| {
                RecoError::invalid_input(format!("line {}: {e}", lineno + 1))
            })?;
            rows.push(row);
        }
        Ok(Self { rows })
    }

    /// Reads a JSON lines file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsed.
    pub fn from_json_lines_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_json_lines(BufReader::new(file))
    }

    /// Writes the table as JSON lines.
    ///
    /// # Errors
    ///
    /// Returns an error on serialization or I/O failure.
    pub fn to_json_lines<W: Write>(&self, mut writer: W) -> Result<()> {
        for row in &self.rows {
            serde_json::to_writer(&mut writer, row)?;
            writer.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Randomly splits into `(train, test)` with `test_ratio` of the rows in test.
    ///
    /// Both halves keep at least one row.
    ///
    /// # Errors
    ///
    /// Returns an error if `test_ratio` is outside (0, 1) or there are fewer than two rows.
    pub fn split_random(&self, test_ratio: f32, seed: u64) -> Result<(Self, Self)> {
        if !(test_ratio > 0.0 && test_ratio < 1.0) {
            return Err(RecoError::InvalidHyperparameter {
                param: "test_ratio".to_string(),
                value: test_ratio.to_string(),
                constraint: "in (0, 1)".to_string(),
            });
        }
        if self.rows.len() < 2 {
            return Err(RecoError::invalid_input(
                "need at least 2 rows to split",
            ));
        }

        let mut indices: Vec<usize> = (0..self.rows.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let n_test = ((self.rows.len() as f32 * test_ratio).round() as usize)
            .clamp(1, self.rows.len() - 1);
        let (test_idx, train_idx) = indices.split_at(n_test);

        let pick = |idx: &[usize]| Self::new(idx.iter().map(|&i| self.rows[i].clone()).collect());
        Ok((pick(train_idx), pick(test_idx)))
    }
}

impl FromIterator<Interaction> for Interactions {
    fn from_iter<I: IntoIterator<Item = Interaction>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Interactions {
    type Item = &'a Interaction;
    type IntoIter = std::slice::Iter<'a, Interaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
