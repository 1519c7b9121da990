//! Convenience re-exports for common usage.
//!
//! # Usage
//!
//! ```
//! use aprender_reco::prelude::*;
//! ```

pub use crate::config::TrainConfig;
pub use crate::contract::{
    assert_prediction_contract, check_predictions, check_predictions_with, Clause,
    ContractConfig, ContractReport,
};
pub use crate::data::{FeatValue, FeatureSpec, Features, Interaction, Interactions, RawId};
pub use crate::error::RecoError;
pub use crate::metrics::{evaluate, mae, rmse, EvalReport};
pub use crate::prediction::{predict_data, predict_data_with_feats};
pub use crate::recommend::{Fm, Svd};
pub use crate::traits::{ColdStart, Query, Recommender, Task};
