//! Prediction quality metrics.
//!
//! Classification gets a per-class precision / recall / F1 table, regression
//! gets mean squared error. Both require index-aligned inputs.

use std::fmt;

use treebench_core::{BenchError, BenchResult, TaskType};

#[derive(Clone, Debug, PartialEq)]
pub struct ClassMetrics {
    pub label: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Averages {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: Averages,
    pub weighted_avg: Averages,
    pub total: usize,
}

impl ClassificationReport {
    pub fn class(&self, label: f64) -> Option<&ClassMetrics> {
        self.classes.iter().find(|c| c.label == label)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Report {
    Classification(ClassificationReport),
    Regression { mse: f64 },
}

impl Report {
    pub fn title(&self) -> &'static str {
        match self {
            Report::Classification(_) => "Classification Report",
            Report::Regression { .. } => "Regression Report",
        }
    }
}

pub fn evaluate(task: TaskType, y_actual: &[f64], y_pred: &[f64]) -> BenchResult<Report> {
    match task {
        TaskType::Classification => {
            classification_report(y_actual, y_pred).map(Report::Classification)
        }
        TaskType::Regression => {
            mean_squared_error(y_actual, y_pred).map(|mse| Report::Regression { mse })
        }
    }
}

fn check_lengths(y_actual: &[f64], y_pred: &[f64]) -> BenchResult<()> {
    if y_actual.len() != y_pred.len() {
        return Err(BenchError::MetricInputMismatch {
            actual: y_actual.len(),
            predicted: y_pred.len(),
        });
    }
    Ok(())
}

/// Mean squared error; `0.0` for empty input.
pub fn mean_squared_error(y_actual: &[f64], y_pred: &[f64]) -> BenchResult<f64> {
    check_lengths(y_actual, y_pred)?;
    if y_actual.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = y_actual
        .iter()
        .zip(y_pred)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    Ok(sum / y_actual.len() as f64)
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

pub fn classification_report(
    y_actual: &[f64],
    y_pred: &[f64],
) -> BenchResult<ClassificationReport> {
    check_lengths(y_actual, y_pred)?;

    let mut labels: Vec<f64> = y_actual.iter().chain(y_pred).copied().collect();
    labels.sort_by(f64::total_cmp);
    labels.dedup();

    let classes: Vec<ClassMetrics> = labels
        .into_iter()
        .map(|label| {
            let (mut tp, mut predicted, mut support) = (0usize, 0usize, 0usize);
            for (a, p) in y_actual.iter().zip(y_pred) {
                let is_actual = *a == label;
                let is_pred = *p == label;
                support += is_actual as usize;
                predicted += is_pred as usize;
                tp += (is_actual && is_pred) as usize;
            }
            let precision = ratio(tp, predicted);
            let recall = ratio(tp, support);
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    let total = y_actual.len();
    let correct = y_actual.iter().zip(y_pred).filter(|(a, p)| a == p).count();

    let mut macro_avg = Averages::default();
    let mut weighted_avg = Averages::default();
    for c in &classes {
        macro_avg.precision += c.precision;
        macro_avg.recall += c.recall;
        macro_avg.f1 += c.f1;
        let w = c.support as f64;
        weighted_avg.precision += c.precision * w;
        weighted_avg.recall += c.recall * w;
        weighted_avg.f1 += c.f1 * w;
    }
    if !classes.is_empty() {
        let n = classes.len() as f64;
        macro_avg.precision /= n;
        macro_avg.recall /= n;
        macro_avg.f1 /= n;
    }
    if total > 0 {
        let n = total as f64;
        weighted_avg.precision /= n;
        weighted_avg.recall /= n;
        weighted_avg.f1 /= n;
    }

    Ok(ClassificationReport {
        classes,
        accuracy: ratio(correct, total),
        macro_avg,
        weighted_avg,
        total,
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<String> = self.classes.iter().map(|c| c.label.to_string()).collect();
        let w = labels
            .iter()
            .map(String::len)
            .chain(std::iter::once("weighted avg".len()))
            .max()
            .unwrap_or(0);

        writeln!(
            f,
            "{:>w$} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for (label, c) in labels.iter().zip(&self.classes) {
            writeln!(
                f,
                "{label:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>w$} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.total
        )?;
        for (name, avg) in [("macro avg", self.macro_avg), ("weighted avg", self.weighted_avg)] {
            writeln!(
                f,
                "{name:>w$} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                avg.precision, avg.recall, avg.f1, self.total
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Classification(r) => write!(f, "{r}"),
            Report::Regression { mse } => writeln!(f, "MSE: {mse}"),
        }
    }
}
