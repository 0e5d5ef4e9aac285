use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;

pub const DATA_LOADING: &str = "data loading time";
pub const INFERENCE: &str = "inference time";
pub const RESULT_WRITING: &str = "result writing time";

/// Elapsed milliseconds between two instants.
pub fn calculate_ms(start: Instant, end: Instant) -> f64 {
    end.saturating_duration_since(start).as_secs_f64() * 1000.0
}

/// Phase name -> elapsed milliseconds for one run.
///
/// Each phase owns one slot; recording a phase twice keeps the last value.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimingLedger {
    phases: BTreeMap<String, f64>,
}

impl TimingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, phase: &str, start: Instant, end: Instant) -> f64 {
        let ms = calculate_ms(start, end);
        self.record_ms(phase, ms);
        ms
    }

    pub fn record_ms(&mut self, phase: &str, ms: f64) {
        self.phases.insert(phase.to_string(), ms);
    }

    pub fn get(&self, phase: &str) -> Option<f64> {
        self.phases.get(phase).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.phases.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }
}

/// Running measurement for a single phase.
#[derive(Debug)]
pub struct Timer {
    phase: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(phase: &'static str) -> Self {
        Self {
            phase,
            start: Instant::now(),
        }
    }

    /// Record the elapsed time into `ledger` and return it in milliseconds.
    pub fn stop(self, ledger: &mut TimingLedger) -> f64 {
        ledger.record(self.phase, self.start, Instant::now())
    }
}
