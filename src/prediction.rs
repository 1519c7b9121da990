//! Batch prediction over interaction rows.

use crate::data::Interaction;
use crate::error::Result;
use crate::traits::{Query, Recommender};

/// Scores every row with its own feature columns as query features.
///
/// Returns one score per row, in row order, using the default cold-start
/// policy.
///
/// # Errors
///
/// Returns the first prediction error.
///
/// # Examples
///
/// ```
/// use aprender_reco::prelude::*;
/// use aprender_reco::data::synthetic::{generate, SyntheticConfig};
///
/// let data = generate(&SyntheticConfig::default()).unwrap();
/// let mut model = Fm::new(Task::Rating)
///     .with_features(FeatureSpec::new(&["sex"], &["genre_1"]))
///     .with_n_epochs(3);
/// model.fit(&data).unwrap();
///
/// let scores = predict_data_with_feats(&model, data.head(5)).unwrap();
/// assert_eq!(scores.len(), 5);
/// ```
pub fn predict_data_with_feats(model: &dyn Recommender, rows: &[Interaction]) -> Result<Vec<f32>> {
    rows.iter()
        .map(|row| {
            let query = Query::new(row.user.clone(), row.item.clone()).with_feats(row.feats.clone());
            model.predict(&query)
        })
        .collect()
}

/// Scores every row by user and item only.
///
/// # Errors
///
/// Returns the first prediction error.
pub fn predict_data(model: &dyn Recommender, rows: &[Interaction]) -> Result<Vec<f32>> {
    rows.iter()
        .map(|row| model.predict(&Query::new(row.user.clone(), row.item.clone())))
        .collect()
}
