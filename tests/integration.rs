//! End-to-end workflows: load rows, train, evaluate, recommend.

use aprender_reco::data::synthetic::{generate, SyntheticConfig};
use aprender_reco::prelude::*;
use std::io::Cursor;

#[test]
fn test_json_lines_training_workflow() {
    let data = generate(&SyntheticConfig::default().with_n_users(20)).expect("generate");
    let mut buf = Vec::new();
    data.to_json_lines(&mut buf).expect("write");

    let loaded = Interactions::from_json_lines(Cursor::new(buf)).expect("read");
    assert_eq!(loaded.len(), data.len());

    let (train, test) = loaded.split_random(0.25, 5).expect("split");
    let mut model = Svd::new(Task::Rating).with_n_epochs(15);
    model.fit(&train).expect("fit");

    match evaluate(&model, test.rows()).expect("evaluate") {
        EvalReport::Rating { rmse, .. } => assert!(rmse < 2.5, "rmse too high: {rmse}"),
        other => panic!("unexpected report {other:?}"),
    }
}

#[test]
fn test_train_config_from_json() {
    let config = TrainConfig::from_json_str(r#"{"embed_size": 4, "n_epochs": 3}"#).expect("config");
    assert_eq!(config.embed_size, 4);

    let data = generate(&SyntheticConfig::default()).expect("generate");
    let mut model = Fm::from_config(Task::Rating, config).with_features(FeatureSpec::new(&["sex"], &["genre_1"]));
    model.fit(&data).expect("fit");
    assert_eq!(model.config().n_epochs, 3);
}

#[test]
fn test_recommend_user_known_and_cold() {
    let data = generate(&SyntheticConfig::default()).expect("generate");
    let mut model = Svd::new(Task::Rating).with_n_epochs(5);
    model.fit(&data).expect("fit");

    let recs = model.recommend_user(RawId::Int(1), 5, ColdStart::Average).expect("recommend");
    assert_eq!(recs.len(), 5);
    assert!(recs.windows(2).all(|w| w[0].1 >= w[1].1));
    let seen: Vec<&RawId> = data.iter().filter(|r| r.user == RawId::Int(1)).map(|r| &r.item).collect();
    assert!(recs.iter().all(|(item, _)| !seen.contains(&item)));

    let cold = model
        .recommend_user(RawId::from("nobody"), 3, ColdStart::Popular)
        .expect("recommend");
    assert_eq!(cold.len(), 3);
    assert!(cold.iter().all(|(_, s)| *s == model.default_pred()));
}

#[test]
fn test_svd_rejects_query_features() {
    let data = generate(&SyntheticConfig::default()).expect("generate");
    let mut model = Svd::new(Task::Rating).with_n_epochs(2);
    model.fit(&data).expect("fit");

    let err = model
        .predict(&Query::new(1, 100).with_feat("sex", "male"))
        .unwrap_err();
    assert!(matches!(err, RecoError::FeaturesUnsupported { .. }));
}
