// =========================================================================
// FALSIFY-PC: prediction contract
//
// Each clause is falsified against a scripted model that breaks exactly
// one rule, then confirmed against the trained Svd and Fm models.
// =========================================================================

use super::*;
use crate::data::synthetic::{generate, SyntheticConfig};
use crate::data::{DataInfo, FeatureSpec, Interactions, RawId};
use crate::recommend::{Fm, Svd};

/// Model whose every answer is set by the test.
#[derive(Clone)]
struct Scripted {
    task: Task,
    default: f32,
    probe: f32,
    popular: f32,
    cold_varies_by_user: bool,
    features: bool,
    fail_batch: bool,
    fail_feature_query: bool,
}

impl Scripted {
    fn valid(task: Task) -> Self {
        Self {
            task,
            default: if task == Task::Rating { 3.5 } else { 0.0 },
            probe: if task == Task::Rating { 3.0 } else { 0.4 },
            popular: if task == Task::Rating { 3.5 } else { 0.0 },
            cold_varies_by_user: false,
            features: false,
            fail_batch: false,
            fail_feature_query: false,
        }
    }

    fn with_features(mut self) -> Self {
        self.features = true;
        self
    }
}

impl Recommender for Scripted {
    fn name(&self) -> &'static str {
        "Scripted"
    }

    fn task(&self) -> Task {
        self.task
    }

    fn default_pred(&self) -> f32 {
        self.default
    }

    fn data_info(&self) -> Result<&DataInfo> {
        Err(RecoError::NotFitted {
            model: self.name().to_string(),
        })
    }

    fn supports_features(&self) -> bool {
        self.features
    }

    fn predict(&self, query: &Query) -> Result<f32> {
        if query.has_feats() {
            if !self.features {
                return Err(RecoError::FeaturesUnsupported {
                    model: self.name().to_string(),
                });
            }
            if query.user == RawId::Int(2211) {
                if self.fail_feature_query {
                    return Err(RecoError::invalid_input("feature probe rejected"));
                }
            } else if self.fail_batch {
                return Err(RecoError::invalid_input("batch row rejected"));
            }
            return Ok(self.probe);
        }
        if query.cold_start == ColdStart::Popular {
            return Ok(self.popular);
        }
        match &query.user {
            RawId::Str(s) if self.cold_varies_by_user => {
                Ok(if s.ends_with('2') { 0.2 } else { 0.1 })
            }
            _ => Ok(self.probe),
        }
    }
}

fn sample() -> Interactions {
    generate(&SyntheticConfig::default()).expect("generate")
}

/// FALSIFY-PC-001: a rating probe outside [1, 5] violates the range clause
#[test]
fn falsify_pc_001_rating_out_of_range() {
    let mut model = Scripted::valid(Task::Rating);
    model.probe = 5.5;

    let err = check_predictions(&model, Task::Rating, &[], false).unwrap_err();
    assert_eq!(
        err.clause(),
        Some(Clause::PredictionRange),
        "FALSIFIED PC-001: got {err}"
    );
}

/// FALSIFY-PC-002: a ranking probe outside [0, 1] violates the range clause
#[test]
fn falsify_pc_002_ranking_out_of_range() {
    let mut model = Scripted::valid(Task::Ranking);
    model.probe = -0.01;

    let err = check_predictions(&model, Task::Ranking, &[], false).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::PredictionRange));
}

/// FALSIFY-PC-003: NaN is never in range
#[test]
fn falsify_pc_003_nan_out_of_range() {
    let mut model = Scripted::valid(Task::Ranking);
    model.probe = f32::NAN;

    let err = PredictionContract::new(&model, Task::Ranking)
        .check_range()
        .unwrap_err();
    assert_eq!(err.clause(), Some(Clause::PredictionRange));
}

/// FALSIFY-PC-004: range bounds are inclusive
#[test]
fn falsify_pc_004_bounds_inclusive() {
    for probe in [1.0, 5.0] {
        let mut model = Scripted::valid(Task::Rating);
        model.probe = probe;
        let pred = PredictionContract::new(&model, Task::Rating)
            .check_range()
            .expect("in range");
        assert_eq!(pred, probe, "FALSIFIED PC-004: bound {probe} rejected");
    }
}

/// FALSIFY-PC-005: the range checked is the one for the task passed in
#[test]
fn falsify_pc_005_range_follows_given_task() {
    let mut model = Scripted::valid(Task::Rating);
    model.probe = 3.0;

    let err = check_predictions(&model, Task::Ranking, &[], false).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::PredictionRange));
}

/// FALSIFY-PC-006: popular fallback must equal default_pred exactly
#[test]
fn falsify_pc_006_popular_not_default() {
    let mut model = Scripted::valid(Task::Rating);
    model.popular = model.default + 1e-4;

    let err = check_predictions(&model, Task::Rating, &[], false).unwrap_err();
    assert_eq!(
        err.clause(),
        Some(Clause::PopularFallback),
        "FALSIFIED PC-006: got {err}"
    );
    assert!(err.to_string().contains("default_pred"));
}

/// FALSIFY-PC-007: cold users must not change the default-policy score
#[test]
fn falsify_pc_007_cold_start_depends_on_user() {
    let mut model = Scripted::valid(Task::Ranking);
    model.cold_varies_by_user = true;

    let err = check_predictions(&model, Task::Ranking, &[], false).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::ColdStartConsistency));
    assert!(err.to_string().contains("cold user1"));
}

/// FALSIFY-PC-008: a sample shorter than five rows fails the batch clause
#[test]
fn falsify_pc_008_short_sample() {
    let model = Scripted::valid(Task::Rating).with_features();
    let data = sample();

    let err = check_predictions(&model, Task::Rating, data.head(4), true).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::FeatureBatch));
}

/// FALSIFY-PC-009: a batch prediction error becomes a batch violation
#[test]
fn falsify_pc_009_batch_error() {
    let mut model = Scripted::valid(Task::Rating).with_features();
    model.fail_batch = true;
    let data = sample();

    let err = check_predictions(&model, Task::Rating, data.rows(), true).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::FeatureBatch));
    assert!(err.to_string().contains("batch row rejected"));
}

/// FALSIFY-PC-010: a failing explicit-feature query is a query violation
#[test]
fn falsify_pc_010_feature_query_error() {
    let mut model = Scripted::valid(Task::Ranking).with_features();
    model.fail_feature_query = true;
    let data = sample();

    let err = check_predictions(&model, Task::Ranking, data.rows(), true).unwrap_err();
    assert_eq!(
        err.clause(),
        Some(Clause::FeatureQuery),
        "FALSIFIED PC-010: got {err}"
    );
}

/// FALSIFY-PC-011: feature clauses are skipped when not requested
#[test]
fn falsify_pc_011_feature_checks_optional() {
    let mut model = Scripted::valid(Task::Rating).with_features();
    model.fail_feature_query = true;

    let report = check_predictions(&model, Task::Rating, &[], false).expect("contract");
    assert_eq!(
        report.clauses,
        vec![
            Clause::PredictionRange,
            Clause::PopularFallback,
            Clause::ColdStartConsistency
        ]
    );
    assert!(report.batch_preds.is_none());
}

/// FALSIFY-PC-012: the first failing clause wins
#[test]
fn falsify_pc_012_stops_at_first_violation() {
    let mut model = Scripted::valid(Task::Rating);
    model.probe = 0.0;
    model.popular = 0.0;
    model.cold_varies_by_user = true;

    let err = check_predictions(&model, Task::Rating, &[], true).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::PredictionRange));
}

/// FALSIFY-PC-013: the assertion form panics with the clause name
#[test]
#[should_panic(expected = "popular_fallback")]
fn falsify_pc_013_assert_panics() {
    let mut model = Scripted::valid(Task::Rating);
    model.popular = 1.0;
    assert_prediction_contract(&model, Task::Rating, &[], false);
}

/// FALSIFY-PC-014: model errors in the core clauses propagate unchanged
#[test]
fn falsify_pc_014_unfitted_model_error_propagates() {
    let model = Svd::new(Task::Rating);

    let err = check_predictions(&model, Task::Rating, &[], false).unwrap_err();
    assert!(
        matches!(err, RecoError::NotFitted { .. }),
        "FALSIFIED PC-014: got {err}"
    );
}

/// FALSIFY-PC-015: custom probes are honored
#[test]
fn falsify_pc_015_custom_config() {
    let mut model = Scripted::valid(Task::Rating);
    model.probe = 9.0;
    let config = ContractConfig {
        rating_range: (0.0, 10.0),
        ..ContractConfig::default()
    };

    let report = check_predictions_with(&model, Task::Rating, &[], false, config).expect("contract");
    assert_eq!(report.probe_pred, 9.0);
}

/// FALSIFY-PC-016: trained Svd satisfies the contract for both tasks
#[test]
fn falsify_pc_016_svd_holds() {
    let data = sample();
    let mut rating = Svd::new(Task::Rating).with_n_epochs(5);
    rating.fit(&data).expect("fit");
    let report = check_predictions(&rating, Task::Rating, data.head(5), false).expect("rating");
    assert_eq!(report.popular_pred, rating.default_pred());

    let positives = generate(&SyntheticConfig::default().positives_only()).expect("generate");
    let info = DataInfo::build(&positives, &FeatureSpec::default()).expect("build");
    let sampled = info.sample_negatives(&positives, 1, 3).expect("negatives");
    let mut ranking = Svd::new(Task::Ranking).with_n_epochs(5);
    ranking.fit(&sampled).expect("fit");
    let report = check_predictions(&ranking, Task::Ranking, sampled.head(5), false).expect("ranking");
    assert_eq!(report.popular_pred, 0.0);
}

/// FALSIFY-PC-017: trained Fm with features satisfies all five clauses
#[test]
fn falsify_pc_017_fm_with_features_holds() {
    let data = sample();
    let mut model = Fm::new(Task::Rating)
        .with_features(FeatureSpec::new(&["sex", "age"], &["genre_1"]))
        .with_n_epochs(5);
    model.fit(&data).expect("fit");

    let report = check_predictions(&model, Task::Rating, data.rows(), true).expect("contract");
    assert_eq!(report.clauses.len(), 5);
    assert_eq!(report.batch_preds.map(|p| p.len()), Some(5));
}

/// FALSIFY-PC-018: Svd cannot take the feature clauses
#[test]
fn falsify_pc_018_svd_rejects_feature_checks() {
    let data = sample();
    let mut model = Svd::new(Task::Rating).with_n_epochs(2);
    model.fit(&data).expect("fit");

    let err = check_predictions(&model, Task::Rating, data.rows(), true).unwrap_err();
    assert_eq!(err.clause(), Some(Clause::FeatureBatch));
}

#[test]
fn test_clause_names() {
    assert_eq!(Clause::ColdStartConsistency.to_string(), "cold_start_consistency");
    let json = serde_json::to_string(&Clause::FeatureQuery).expect("json");
    assert_eq!(json, "\"feature_query\"");
}

#[test]
fn test_default_probes() {
    let config = ContractConfig::default();
    assert_eq!(config.probe.user, RawId::Int(1));
    assert_eq!(config.probe.item, RawId::Int(2333));
    assert_eq!(config.popular_probe.cold_start, ColdStart::Popular);
    assert_eq!(config.cold_pair.0.item, config.cold_pair.1.item);
    assert_ne!(config.cold_pair.0.user, config.cold_pair.1.user);
    assert_eq!(config.feature_probe.feats.len(), 2);
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_rating_range_matches_bounds(probe in -10.0f32..10.0) {
            let mut model = Scripted::valid(Task::Rating);
            model.probe = probe;
            let holds = PredictionContract::new(&model, Task::Rating).check_range().is_ok();
            prop_assert_eq!(holds, (1.0..=5.0).contains(&probe));
        }

        #[test]
        fn prop_ranking_range_matches_bounds(probe in -2.0f32..2.0) {
            let mut model = Scripted::valid(Task::Ranking);
            model.probe = probe;
            let holds = PredictionContract::new(&model, Task::Ranking).check_range().is_ok();
            prop_assert_eq!(holds, (0.0..=1.0).contains(&probe));
        }
    }
}
