use std::time::Instant;

use tracing::{info, warn};
use treebench_core::{BenchError, BenchResult, Dataset, FeatureMatrix, Split, TaskType};

use crate::{BenchConfig, DatasetConfig, TimingLedger, DATA_LOADING};

/// Query result in row-major order. `None` is SQL `NULL`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<f64>>>,
}

/// Runs one query against a connection target. Blocking, no retry.
pub trait QueryExecutor {
    fn read_sql(&mut self, url: &str, query: &str) -> anyhow::Result<Table>;
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &mut E {
    fn read_sql(&mut self, url: &str, query: &str) -> anyhow::Result<Table> {
        (**self).read_sql(url, query)
    }
}

pub struct DataSource<E> {
    executor: E,
}

impl<E: QueryExecutor> DataSource<E> {
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// Fetch `dataset` for `split` and record `"data loading time"`.
    pub fn fetch(
        &mut self,
        dataset: &str,
        config: &BenchConfig,
        split: Split,
        ledger: &mut TimingLedger,
    ) -> BenchResult<Dataset> {
        let pg = config.pgsql()?;
        let ds = config.dataset(dataset)?;
        let query = format!("{}_{}", ds.query, split.suffix());
        info!(%dataset, target = %pg.display_target(), %query, "fetching dataset");

        let start = Instant::now();
        let table = self
            .executor
            .read_sql(&pg.url(), &query)
            .map_err(|e| BenchError::data(format!("{e:#}")))?;
        let ms = ledger.record(DATA_LOADING, start, Instant::now());
        println!("Time Taken to load {dataset} as a dataframe is: {ms}");

        into_dataset(dataset, ds, table)
    }
}

/// Split the label column out of `table` and build the feature matrix.
pub fn into_dataset(name: &str, ds: &DatasetConfig, table: Table) -> BenchResult<Dataset> {
    let width = table.columns.len();
    if let Some(idx) = table.rows.iter().position(|r| r.len() != width) {
        return Err(BenchError::data(format!(
            "row {idx} has {} values, expected {width}",
            table.rows[idx].len()
        )));
    }

    let label_idx = table.columns.iter().position(|c| c == &ds.y_col);
    if label_idx.is_none() {
        warn!(
            dataset = %name,
            y_col = %ds.y_col,
            "label column not returned; metrics will be skipped"
        );
    }

    let feature_names: Vec<String> = table
        .columns
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != label_idx)
        .map(|(_, c)| c.clone())
        .collect();

    let n_rows = table.rows.len();
    let mut data = Vec::with_capacity(n_rows * feature_names.len());
    let mut labels = label_idx.map(|_| Vec::with_capacity(n_rows));

    for (row_idx, row) in table.rows.into_iter().enumerate() {
        for (i, value) in row.into_iter().enumerate() {
            if Some(i) == label_idx {
                let label = coerce_label(ds.task, value).ok_or_else(|| {
                    BenchError::data(format!(
                        "row {row_idx}: NULL in classification label `{}`",
                        ds.y_col
                    ))
                })?;
                if let Some(labels) = labels.as_mut() {
                    labels.push(label);
                }
            } else {
                data.push(value.map_or(f32::NAN, |v| v as f32));
            }
        }
    }

    let n_features = feature_names.len();
    let features = FeatureMatrix::new(data, n_rows, n_features)
        .ok_or_else(|| BenchError::data("feature matrix is not rectangular"))?;

    Ok(Dataset {
        name: name.to_string(),
        task: ds.task,
        feature_names,
        features,
        labels,
    })
}

fn coerce_label(task: TaskType, value: Option<f64>) -> Option<f64> {
    match task {
        TaskType::Classification => value.map(f64::trunc),
        TaskType::Regression => Some(value.unwrap_or(f64::NAN)),
    }
}
