use std::fs;

use treebench_core::{
    Aggregation, Backend, BackendAdapter, BackendFamily, DefaultAdapter, Device, FeatureMatrix,
    ModelArtifact, TaskType,
};
use treebench_backend_native::{ForestPredictor, NativeBackend};
use treebench_runtime::{InferenceRunner, TimingLedger};

// One stump on feature 0: x < 0.5 -> -2.0 (p ~ 0.12), otherwise 2.0 (p ~ 0.88).
const LOGISTIC_STUMP: &str = r#"{
    "objective": "binary_logistic",
    "base_score": 0.0,
    "num_features": 2,
    "trees": [{"nodes": [
        {"feature": 0, "threshold": 0.5, "left": 1, "right": 2, "default_left": true},
        {"leaf": true, "value": -2.0},
        {"leaf": true, "value": 2.0}
    ]}]
}"#;

fn write_model(dir: &tempfile::TempDir, body: &str) -> ModelArtifact {
    let path = dir.path().join("higgs_xgboost_1_1.json");
    fs::write(&path, body).unwrap();
    ModelArtifact::ForestJson(path)
}

fn rows() -> FeatureMatrix {
    FeatureMatrix::from_rows(&[
        vec![0.9, 0.0],
        vec![0.1, 0.0],
        vec![f32::NAN, 0.0],
    ])
    .unwrap()
}

#[test]
fn single_row_batches_append_one_label_each() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = NativeBackend::new()
        .load(&write_model(&dir, LOGISTIC_STUMP), Device::Cpu)
        .unwrap();
    assert_eq!(adapter.family(), BackendFamily::NativeTree);
    assert_eq!(adapter.aggregation(1), Aggregation::Append);
    assert_eq!(adapter.aggregation(3), Aggregation::Extend);

    let mut runner = InferenceRunner::new(adapter, 1);
    let preds = runner.run(&rows(), &mut TimingLedger::new()).unwrap();
    assert_eq!(preds, vec![1.0, 0.0, 0.0]);
}

#[test]
fn bulk_batches_give_the_same_flat_sequence() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = NativeBackend::new()
        .load(&write_model(&dir, LOGISTIC_STUMP), Device::Cpu)
        .unwrap();

    let mut runner = InferenceRunner::new(adapter, 2);
    let preds = runner.run(&rows(), &mut TimingLedger::new()).unwrap();
    assert_eq!(preds, vec![1.0, 0.0, 0.0]);
}

#[test]
fn feature_width_mismatch_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let adapter = NativeBackend::new()
        .load(&write_model(&dir, LOGISTIC_STUMP), Device::Cpu)
        .unwrap();
    let narrow = FeatureMatrix::from_rows(&[vec![0.3]]).unwrap();

    let err = InferenceRunner::new(adapter, 4)
        .run(&narrow, &mut TimingLedger::new())
        .unwrap_err();
    assert!(err.to_string().contains("expects 2 features"));
}

#[test]
fn cuda_device_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let res = NativeBackend::new().load(
        &write_model(&dir, LOGISTIC_STUMP),
        Device::Cuda { device_id: 0 },
    );
    assert!(res.is_err());
}

#[test]
fn missing_or_broken_artifact_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let backend = NativeBackend::new();
    let missing = ModelArtifact::ForestJson(dir.path().join("nope.json"));
    assert!(backend.load(&missing, Device::Cpu).is_err());
    assert!(backend
        .load(&write_model(&dir, r#"{"objective": "regression", "num_features": 1, "trees": []}"#), Device::Cpu)
        .is_err());
}

#[test]
fn forest_predictor_returns_raw_scores_for_regression() {
    let dir = tempfile::tempdir().unwrap();
    let body = LOGISTIC_STUMP.replace("binary_logistic", "regression");
    let ModelArtifact::ForestJson(path) = write_model(&dir, &body) else {
        unreachable!()
    };
    let forest = treebench_backend_native::load_forest(&path).unwrap();

    let adapter = DefaultAdapter::new("forest", ForestPredictor::new(forest.clone(), TaskType::Regression));
    let preds = InferenceRunner::new(adapter, 2)
        .run(&rows(), &mut TimingLedger::new())
        .unwrap();
    assert_eq!(preds, vec![2.0, -2.0, -2.0]);

    let adapter = DefaultAdapter::new("forest", ForestPredictor::new(forest, TaskType::Classification));
    let preds = InferenceRunner::new(adapter, 2)
        .run(&rows(), &mut TimingLedger::new())
        .unwrap();
    assert_eq!(preds, vec![1.0, 0.0, 0.0]);
}
