use std::path::PathBuf;

use clap::{Parser, Subcommand};
use treebench_core::{BenchError, BenchResult, Split};

#[derive(Parser, Debug)]
#[command(name = "treebench", version, about = "Tree-ensemble inference benchmark")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Benchmark inference for one dataset/model across frameworks
    Run {
        /// Dataset name as keyed in the config file
        #[arg(short, long)]
        dataset: String,

        /// Model family the artifacts were trained with
        #[arg(short, long, default_value = "xgboost",
              value_parser = ["randomforest", "xgboost", "lightgbm"])]
        model: String,

        /// Comma-separated frameworks: native, onnx, onnx-batched, forest
        #[arg(short, long, value_delimiter = ',', required = true)]
        frameworks: Vec<String>,

        /// Rows per prediction call
        #[arg(short, long, default_value_t = 1024)]
        batch_size: usize,

        /// Benchmark configuration (datasets, database, ensemble shape)
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Directory holding the persisted model artifacts
        #[arg(long, default_value = "models")]
        models_dir: PathBuf,

        /// Directory receiving results and timings
        #[arg(long, default_value = "results")]
        results_dir: PathBuf,

        /// Device for tensor backends (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: String,

        /// Override `num_trees` from the config file
        #[arg(long)]
        num_trees: Option<usize>,

        /// Override `depth` from the config file
        #[arg(long)]
        depth: Option<usize>,

        /// Query variant to read (train or test)
        #[arg(long, default_value = "test")]
        split: Split,

        /// Log filter (RUST_LOG syntax)
        #[arg(long, default_value = "info")]
        log: String,
    },
}

/// Reject dataset/model/framework combinations that cannot produce valid results.
pub fn check_argument_conflicts(
    dataset: &str,
    model: &str,
    frameworks: &[String],
) -> BenchResult<()> {
    let model = model.to_ascii_lowercase();
    let dataset = dataset.to_ascii_lowercase();

    if model == "randomforest" && frameworks.iter().any(|f| f.eq_ignore_ascii_case("native")) {
        return Err(BenchError::config(
            "the native backend scores boosted ensembles (xgboost, lightgbm), not randomforest",
        ));
    }
    if dataset == "bosch" && model == "randomforest" {
        return Err(BenchError::config(
            "randomforest models cannot be trained on bosch, which has missing values",
        ));
    }
    Ok(())
}
