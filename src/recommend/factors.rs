//! Dense parameter tables and shared scoring helpers.

use crate::data::DataInfo;
use crate::error::{RecoError, Result};
use crate::traits::Task;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Row-major `n_rows x dim` table of latent factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct Factors {
    n_rows: usize,
    dim: usize,
    data: Vec<f32>,
}

impl Factors {
    /// Samples N(0, std) with the Box-Muller transform.
    pub(crate) fn normal(n_rows: usize, dim: usize, std: f32, rng: &mut StdRng) -> Self {
        let data = (0..n_rows * dim)
            .map(|_| {
                let u1: f32 = rng.gen_range(0.0001_f32..1.0_f32);
                let u2: f32 = rng.gen_range(0.0_f32..1.0_f32);
                let z = (-2.0_f32 * u1.ln()).sqrt() * (2.0_f32 * std::f32::consts::PI * u2).cos();
                std * z
            })
            .collect();
        Self { n_rows, dim, data }
    }

    pub(crate) fn dim(&self) -> usize {
        self.dim
    }

    pub(crate) fn row(&self, r: usize) -> &[f32] {
        &self.data[r * self.dim..(r + 1) * self.dim]
    }

    pub(crate) fn row_mut(&mut self, r: usize) -> &mut [f32] {
        &mut self.data[r * self.dim..(r + 1) * self.dim]
    }

    /// Column-wise mean over rows `[start, end)`; zeros for an empty range.
    pub(crate) fn mean_rows(&self, start: usize, end: usize) -> Vec<f32> {
        let mut mean = vec![0.0; self.dim];
        if end <= start {
            return mean;
        }
        for r in start..end {
            for (m, x) in mean.iter_mut().zip(self.row(r)) {
                *m += x;
            }
        }
        let n = (end - start) as f32;
        mean.iter_mut().for_each(|m| *m /= n);
        mean
    }

    /// Mean over all rows.
    pub(crate) fn mean_row(&self) -> Vec<f32> {
        self.mean_rows(0, self.n_rows)
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

pub(crate) fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

pub(crate) fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Maps a raw model output to the task's scale.
pub(crate) fn finalize(task: Task, raw: f32, info: &DataInfo) -> f32 {
    match task {
        Task::Rating => {
            let (lo, hi) = info.label_bounds();
            raw.clamp(lo, hi)
        }
        Task::Ranking => sigmoid(raw),
    }
}

/// Global mean for rating, 0 for ranking.
pub(crate) fn default_pred(task: Task, info: Option<&DataInfo>) -> f32 {
    match (task, info) {
        (Task::Rating, Some(info)) => info.global_mean(),
        _ => 0.0,
    }
}

/// Per-example loss for logging: squared error or log loss.
pub(crate) fn example_loss(task: Task, label: f32, output: f32) -> f32 {
    match task {
        Task::Rating => (label - output).powi(2),
        Task::Ranking => {
            let p = output.clamp(1e-7, 1.0 - 1e-7);
            -(label * p.ln() + (1.0 - label) * (1.0 - p).ln())
        }
    }
}

/// Residual driving the SGD step: `label - prediction` on the training scale.
pub(crate) fn residual(task: Task, label: f32, raw: f32) -> f32 {
    match task {
        Task::Rating => label - raw,
        Task::Ranking => label - sigmoid(raw),
    }
}

/// Rejects non-0/1 labels for ranking fits.
pub(crate) fn check_labels(task: Task, labels: impl IntoIterator<Item = f32>) -> Result<()> {
    if task == Task::Ranking {
        if let Some(bad) = labels.into_iter().find(|&y| y != 0.0 && y != 1.0) {
            return Err(RecoError::invalid_input(format!(
                "ranking labels must be 0 or 1, found {bad}"
            )));
        }
    }
    Ok(())
}

pub(crate) fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    fs::write(path, serde_json::to_vec(value)?)?;
    Ok(())
}

pub(crate) fn load_json<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T> {
    Ok(serde_json::from_slice(&fs::read(path)?)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_normal_reproducible_and_centered() {
        let a = Factors::normal(200, 10, 0.5, &mut StdRng::seed_from_u64(42));
        let b = Factors::normal(200, 10, 0.5, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);

        let m = mean(&a.data);
        assert!(m.abs() < 0.1, "Mean {m} too far from 0");
    }

    #[test]
    fn test_mean_rows() {
        let mut f = Factors::normal(3, 2, 0.0, &mut StdRng::seed_from_u64(1));
        f.row_mut(0).copy_from_slice(&[1.0, 2.0]);
        f.row_mut(1).copy_from_slice(&[3.0, 4.0]);
        f.row_mut(2).copy_from_slice(&[5.0, 6.0]);
        assert_eq!(f.mean_row(), vec![3.0, 4.0]);
        assert_eq!(f.mean_rows(1, 3), vec![4.0, 5.0]);
        assert_eq!(f.mean_rows(2, 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_sigmoid_bounds() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!((0.0..=1.0).contains(&sigmoid(500.0)));
        assert!((0.0..=1.0).contains(&sigmoid(-500.0)));
    }

    #[test]
    fn test_check_labels() {
        assert!(check_labels(Task::Ranking, [0.0, 1.0, 1.0]).is_ok());
        assert!(check_labels(Task::Ranking, [0.0, 0.5]).is_err());
        assert!(check_labels(Task::Rating, [3.5]).is_ok());
    }

    #[test]
    fn test_example_loss() {
        assert_eq!(example_loss(Task::Rating, 4.0, 2.0), 4.0);
        assert!(example_loss(Task::Ranking, 1.0, 0.99) < example_loss(Task::Ranking, 1.0, 0.5));
    }
}
