//! Recommendation models.
//!
//! This module provides collaborative filtering models with explicit
//! cold-start handling.
//!
//! # Algorithms
//!
//! - **Svd**: Biased matrix factorization over user and item ids
//! - **Fm**: Factorization machine over ids plus categorical and numeric side features
//!
//! # Quick Start
//!
//! ```
//! use aprender_reco::prelude::*;
//! use aprender_reco::data::synthetic::{generate, SyntheticConfig};
//!
//! let data = generate(&SyntheticConfig::default()).unwrap();
//! let mut model = Fm::new(Task::Rating)
//!     .with_features(FeatureSpec::new(&["sex"], &["genre_1"]))
//!     .with_n_epochs(5);
//! model.fit(&data).unwrap();
//!
//! let score = model
//!     .predict(&Query::new(2211, 110).with_feat("sex", "male"))
//!     .unwrap();
//! assert!((1.0..=5.0).contains(&score));
//! ```

mod factors;
pub mod fm;
pub mod svd;

pub use fm::Fm;
pub use svd::Svd;
