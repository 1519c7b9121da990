//! Aprender Reco: recommendation models with a checkable prediction contract.
//!
//! Models are trained on explicit ratings or implicit feedback and answer
//! user-item queries, falling back to a cold-start policy for ids they have
//! never seen. The [`contract`] module checks the rules every trained model
//! must follow.
//!
//! # Quick Start
//!
//! ```
//! use aprender_reco::prelude::*;
//! use aprender_reco::data::synthetic::{generate, SyntheticConfig};
//!
//! let data = generate(&SyntheticConfig::default()).unwrap();
//! let (train, test) = data.split_random(0.2, 7).unwrap();
//!
//! let mut model = Svd::new(Task::Rating).with_n_epochs(10);
//! model.fit(&train).unwrap();
//!
//! let score = model.predict(&Query::new(1, 100)).unwrap();
//! assert!((1.0..=5.0).contains(&score));
//!
//! check_predictions(&model, Task::Rating, test.rows(), false).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`data`]: Interaction rows, JSON-lines IO and the training index
//! - [`traits`]: The [`Recommender`] trait, queries and cold-start policies
//! - [`recommend`]: SVD and factorization machine models
//! - [`prediction`]: Batch prediction over rows
//! - [`metrics`]: Rating and ranking metrics
//! - [`contract`]: Prediction contract checks
//! - [`config`]: Training hyperparameters

pub mod config;
pub mod contract;
pub mod data;
pub mod error;
pub mod metrics;
pub mod prediction;
pub mod prelude;
pub mod recommend;
pub mod traits;

pub use error::{RecoError, Result};
pub use traits::{ColdStart, Query, Recommender, Task};
