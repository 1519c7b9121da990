//! Error types for recommendation operations.
//!
//! Provides rich error context for library consumers.

use crate::contract::Clause;
use thiserror::Error;

/// Main error type for training, prediction and contract checking.
///
/// # Examples
///
/// ```
/// use aprender_reco::error::RecoError;
///
/// let err = RecoError::NotFitted { model: "Svd".to_string() };
/// assert!(err.to_string().contains("not fitted"));
/// ```
#[derive(Debug, Error)]
pub enum RecoError {
    /// Input data is empty, malformed or inconsistent.
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error description
        message: String,
    },

    /// Invalid hyperparameter value provided.
    #[error("Invalid hyperparameter: {param} = {value}, expected {constraint}")]
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Prediction was requested before `fit`.
    #[error("Model {model} is not fitted, call fit() first")]
    NotFitted {
        /// Model name
        model: String,
    },

    /// Side features were passed to a model that cannot use them.
    #[error("Model {model} does not support side features")]
    FeaturesUnsupported {
        /// Model name
        model: String,
    },

    /// A feature column mixes categorical and numeric values.
    #[error("Feature column {column} mixes categorical and numeric values")]
    FeatureKind {
        /// Column name
        column: String,
    },

    /// A prediction invariant did not hold.
    #[error("Prediction contract violated [{clause}]: {detail}")]
    ContractViolation {
        /// Which check failed
        clause: Clause,
        /// Failing expression and observed values
        detail: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RecoError {
    /// Create an invalid input error
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::invalid_input(format!("empty input: {context}"))
    }

    /// Create a length mismatch error
    #[must_use]
    pub fn length_mismatch(context: &str, expected: usize, actual: usize) -> Self {
        Self::invalid_input(format!(
            "length mismatch for {context}: expected {expected}, got {actual}"
        ))
    }

    /// Create a contract violation
    #[must_use]
    pub fn violation(clause: Clause, detail: impl Into<String>) -> Self {
        Self::ContractViolation {
            clause,
            detail: detail.into(),
        }
    }

    /// Returns the violated clause, if this is a contract violation.
    #[must_use]
    pub fn clause(&self) -> Option<Clause> {
        match self {
            Self::ContractViolation { clause, .. } => Some(*clause),
            _ => None,
        }
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, RecoError>;
