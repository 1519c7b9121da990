//! Prediction contract across models and tasks.
//!
//! Every model is trained on synthetic data, saved, reloaded and checked
//! against the full contract in both its fresh and reloaded state.

use aprender_reco::data::synthetic::{generate, SyntheticConfig};
use aprender_reco::data::DataInfo;
use aprender_reco::prelude::*;

fn rating_data() -> Interactions {
    generate(&SyntheticConfig::default()).expect("generate")
}

fn ranking_data() -> Interactions {
    let positives = generate(&SyntheticConfig::default().positives_only()).expect("generate");
    let info = DataInfo::build(&positives, &feature_spec()).expect("build");
    info.sample_negatives(&positives, 1, 11).expect("negatives")
}

fn feature_spec() -> FeatureSpec {
    FeatureSpec::new(&["sex", "age"], &["genre_1"])
}

#[test]
fn test_svd_rating_contract() {
    let data = rating_data();
    let (train, test) = data.split_random(0.2, 3).expect("split");
    let mut model = Svd::new(Task::Rating).with_n_epochs(10);
    model.fit(&train).expect("fit");

    let report = check_predictions(&model, Task::Rating, test.rows(), false).expect("contract");
    assert!((1.0..=5.0).contains(&report.probe_pred));
    assert_eq!(report.popular_pred, model.default_pred());
}

#[test]
fn test_svd_ranking_contract() {
    let data = ranking_data();
    let mut model = Svd::new(Task::Ranking).with_n_epochs(10);
    model.fit(&data).expect("fit");

    assert_prediction_contract(&model, Task::Ranking, data.rows(), false);
    assert_eq!(model.default_pred(), 0.0);
}

#[test]
fn test_fm_rating_contract_with_features() {
    let data = rating_data();
    let mut model = Fm::new(Task::Rating)
        .with_features(feature_spec())
        .with_n_epochs(10);
    model.fit(&data).expect("fit");

    let report = check_predictions(&model, Task::Rating, data.rows(), true).expect("contract");
    assert_eq!(report.clauses.len(), 5);
    let batch = report.batch_preds.expect("batch");
    assert!(batch.iter().all(|p| (1.0..=5.0).contains(p)));
}

#[test]
fn test_fm_ranking_contract_with_features() {
    let data = ranking_data();
    let mut model = Fm::new(Task::Ranking)
        .with_features(feature_spec())
        .with_n_epochs(10);
    model.fit(&data).expect("fit");

    assert_prediction_contract(&model, Task::Ranking, data.rows(), true);
}

#[test]
fn test_fm_without_features_contract() {
    let data = rating_data();
    let mut model = Fm::new(Task::Rating).with_n_epochs(5);
    model.fit(&data).expect("fit");

    check_predictions(&model, Task::Rating, data.rows(), false).expect("contract");
}

#[test]
fn test_contract_survives_save_load() {
    let dir = tempfile::tempdir().expect("tempdir");
    let data = rating_data();

    let mut svd = Svd::new(Task::Rating).with_n_epochs(5);
    svd.fit(&data).expect("fit");
    let svd_path = dir.path().join("svd.json");
    svd.save(&svd_path).expect("save");
    let svd_loaded = Svd::load(&svd_path).expect("load");

    let mut fm = Fm::new(Task::Rating)
        .with_features(feature_spec())
        .with_n_epochs(5);
    fm.fit(&data).expect("fit");
    let fm_path = dir.path().join("fm.json");
    fm.save(&fm_path).expect("save");
    let fm_loaded = Fm::load(&fm_path).expect("load");

    let before = check_predictions(&svd, Task::Rating, data.rows(), false).expect("contract");
    let after = check_predictions(&svd_loaded, Task::Rating, data.rows(), false).expect("contract");
    assert_eq!(before, after);

    let before = check_predictions(&fm, Task::Rating, data.rows(), true).expect("contract");
    let after = check_predictions(&fm_loaded, Task::Rating, data.rows(), true).expect("contract");
    assert_eq!(before, after);
}

#[test]
fn test_models_as_trait_objects() {
    let data = rating_data();
    let mut svd = Svd::new(Task::Rating).with_n_epochs(3);
    svd.fit(&data).expect("fit");
    let mut fm = Fm::new(Task::Rating)
        .with_features(feature_spec())
        .with_n_epochs(3);
    fm.fit(&data).expect("fit");

    let models: Vec<(&dyn Recommender, bool)> = vec![(&svd, false), (&fm, true)];
    for (model, with_feats) in models {
        assert_eq!(model.supports_features(), with_feats);
        check_predictions(model, model.task(), data.rows(), with_feats)
            .unwrap_or_else(|e| panic!("{}: {e}", model.name()));
    }
}
