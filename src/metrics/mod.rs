//! Evaluation metrics for recommendation models.
//!
//! Rating models are scored with RMSE and MAE, ranking models with log loss
//! and ROC AUC. [`evaluate`] picks the pair matching the model's task.

use crate::data::Interaction;
use crate::error::{RecoError, Result};
use crate::prediction::predict_data;
use crate::traits::{Recommender, Task};
use serde::{Deserialize, Serialize};

fn check_lengths(y_pred: &[f32], y_true: &[f32]) -> Result<()> {
    if y_true.is_empty() {
        return Err(RecoError::empty_input("metric inputs"));
    }
    if y_pred.len() != y_true.len() {
        return Err(RecoError::length_mismatch("predictions", y_true.len(), y_pred.len()));
    }
    Ok(())
}

/// Root Mean Squared Error.
///
/// RMSE = sqrt((1/n) * Σ(y_true - y_pred)²)
///
/// # Examples
///
/// ```
/// use aprender_reco::metrics::rmse;
///
/// let error = rmse(&[2.0, 4.0], &[3.0, 5.0]).unwrap();
/// assert!((error - 1.0).abs() < 1e-6);
/// ```
///
/// # Errors
///
/// Returns an error if inputs are empty or differ in length.
pub fn rmse(y_pred: &[f32], y_true: &[f32]) -> Result<f32> {
    check_lengths(y_pred, y_true)?;
    let sum_sq: f32 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok((sum_sq / y_true.len() as f32).sqrt())
}

/// Mean Absolute Error.
///
/// # Errors
///
/// Returns an error if inputs are empty or differ in length.
pub fn mae(y_pred: &[f32], y_true: &[f32]) -> Result<f32> {
    check_lengths(y_pred, y_true)?;
    let sum_abs: f32 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).abs()).sum();
    Ok(sum_abs / y_true.len() as f32)
}

/// Binary cross-entropy with probabilities clamped to `[1e-7, 1 - 1e-7]`.
///
/// # Errors
///
/// Returns an error if inputs are empty or differ in length.
pub fn log_loss(y_prob: &[f32], y_true: &[f32]) -> Result<f32> {
    check_lengths(y_prob, y_true)?;
    let total: f32 = y_true
        .iter()
        .zip(y_prob)
        .map(|(&y, &p)| {
            let p = p.clamp(1e-7, 1.0 - 1e-7);
            -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
        })
        .sum();
    Ok(total / y_true.len() as f32)
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Tied scores share their average rank. Returns 0.5 when only one class is
/// present.
///
/// # Examples
///
/// ```
/// use aprender_reco::metrics::roc_auc;
///
/// let auc = roc_auc(&[0.9, 0.8, 0.3, 0.1], &[1.0, 1.0, 0.0, 0.0]).unwrap();
/// assert_eq!(auc, 1.0);
/// ```
///
/// # Errors
///
/// Returns an error if inputs are empty or differ in length.
pub fn roc_auc(y_score: &[f32], y_true: &[f32]) -> Result<f32> {
    check_lengths(y_score, y_true)?;

    let mut order: Vec<usize> = (0..y_score.len()).collect();
    order.sort_by(|&a, &b| y_score[a].total_cmp(&y_score[b]));

    let mut ranks = vec![0.0_f64; y_score.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && y_score[order[end + 1]] == y_score[order[start]] {
            end += 1;
        }
        // ranks are 1-based
        let avg = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg;
        }
        start = end + 1;
    }

    let n_pos = y_true.iter().filter(|&&y| y > 0.5).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return Ok(0.5);
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(&ranks)
        .filter(|(&y, _)| y > 0.5)
        .map(|(_, &r)| r)
        .sum();
    let n_pos = n_pos as f64;
    let u = pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0;
    Ok((u / (n_pos * n_neg as f64)) as f32)
}

/// Metrics of a model on held-out rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EvalReport {
    /// Rating task metrics.
    Rating {
        /// Root mean squared error
        rmse: f32,
        /// Mean absolute error
        mae: f32,
    },
    /// Ranking task metrics.
    Ranking {
        /// Binary cross-entropy
        log_loss: f32,
        /// Area under the ROC curve
        roc_auc: f32,
    },
}

/// Scores `rows` and computes the metrics for the model's task.
///
/// # Errors
///
/// Returns an error if `rows` is empty or a prediction fails.
pub fn evaluate(model: &dyn Recommender, rows: &[Interaction]) -> Result<EvalReport> {
    let preds = predict_data(model, rows)?;
    let labels: Vec<f32> = rows.iter().map(|r| r.label).collect();

    let report = match model.task() {
        Task::Rating => EvalReport::Rating {
            rmse: rmse(&preds, &labels)?,
            mae: mae(&preds, &labels)?,
        },
        Task::Ranking => EvalReport::Ranking {
            log_loss: log_loss(&preds, &labels)?,
            roc_auc: roc_auc(&preds, &labels)?,
        },
    };
    tracing::info!(model = model.name(), rows = rows.len(), ?report, "evaluated");
    Ok(report)
}
