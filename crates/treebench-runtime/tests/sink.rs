use std::fs;

use treebench_runtime::{ResultSink, TimingLedger, DATA_LOADING, RESULT_WRITING};

#[test]
fn writes_one_value_per_line_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path().join("results"));
    let mut ledger = TimingLedger::new();

    let path = sink.write("forest", &[1.0, 0.0, 0.25, 1.0], &mut ledger).unwrap();

    assert_eq!(fs::read_to_string(path).unwrap(), "1\n0\n0.25\n1\n");
    assert!(ledger.get(RESULT_WRITING).is_some());
}

#[test]
fn rewrite_truncates_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    let mut ledger = TimingLedger::new();

    sink.write("a", &[1.0; 10], &mut ledger).unwrap();
    sink.write("b", &[0.0, 1.0], &mut ledger).unwrap();

    assert_eq!(fs::read_to_string(sink.results_path()).unwrap(), "0\n1\n");
    assert_eq!(ledger.len(), 1);
}

#[test]
fn identical_predictions_give_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    let mut ledger = TimingLedger::new();
    let preds = [0.0, 1.0, 1.0, 0.0, 1.0];

    sink.write("x", &preds, &mut ledger).unwrap();
    let first = fs::read(sink.results_path()).unwrap();
    sink.write("x", &preds, &mut ledger).unwrap();
    assert_eq!(first, fs::read(sink.results_path()).unwrap());
}

#[test]
fn timings_are_persisted_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let sink = ResultSink::new(dir.path());
    let mut ledger = TimingLedger::new();
    ledger.record_ms(DATA_LOADING, 12.5);
    ledger.record_ms(DATA_LOADING, 3.0);

    let path = sink.write_timings("onnx", &ledger).unwrap();
    assert!(path.ends_with("timings_onnx.json"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(json[DATA_LOADING], 3.0);
    assert_eq!(json.as_object().unwrap().len(), 1);
}
