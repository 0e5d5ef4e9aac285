mod cli;
mod pg;
mod registry;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use treebench_core::{BenchError, BenchResult, Dataset, Device};
use treebench_runtime::{
    evaluate, BenchConfig, DataSource, InferenceRunner, ResultSink, RunConfig, TimingLedger,
};

use pg::PostgresExecutor;
use registry::Framework;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            dataset,
            model,
            frameworks,
            batch_size,
            config,
            models_dir,
            results_dir,
            device,
            num_trees,
            depth,
            split,
            log,
        } => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::try_new(&log).context("invalid --log filter")?)
                .with_writer(std::io::stderr)
                .init();

            cli::check_argument_conflicts(&dataset, &model, &frameworks)?;
            let bench_config = BenchConfig::load(&config)?;
            let run = RunConfig {
                num_trees: num_trees
                    .or(bench_config.num_trees)
                    .ok_or_else(|| BenchError::config("`num_trees` is not set"))?,
                depth: depth
                    .or(bench_config.depth)
                    .ok_or_else(|| BenchError::config("`depth` is not set"))?,
                device: parse_device(&device)?,
                dataset,
                model,
                frameworks,
                query_size: batch_size,
                split,
                models_dir,
                results_dir,
            };
            bench(&run, &bench_config)
        }
    }
}

fn bench(run: &RunConfig, config: &BenchConfig) -> Result<()> {
    let frameworks = run
        .frameworks
        .iter()
        .map(|f| f.parse::<Framework>())
        .collect::<BenchResult<Vec<_>>>()?;
    if run.query_size == 0 {
        return Err(BenchError::invalid("batch size must be at least 1").into());
    }
    info!(
        dataset = %run.dataset,
        model = %run.model,
        key = %run.model_key(),
        batch_size = run.query_size,
        "starting benchmark"
    );

    let mut loading = TimingLedger::new();
    let dataset = DataSource::new(PostgresExecutor::new())
        .fetch(&run.dataset, config, run.split, &mut loading)
        .inspect_err(|e| error!(error = %e, "data loading failed"))?;
    info!(rows = dataset.n_rows(), features = dataset.features.n_features(), "dataset loaded");

    let sink = ResultSink::new(&run.results_dir);
    for framework in frameworks {
        let mut ledger = loading.clone();
        let outcome = bench_framework(framework, run, &dataset, &sink, &mut ledger);
        sink.write_timings(framework.name(), &ledger)?;
        if let Err(e) = outcome {
            error!(framework = framework.name(), error = %e, "framework run failed");
            return Err(e.into());
        }
    }
    Ok(())
}

fn bench_framework(
    framework: Framework,
    run: &RunConfig,
    dataset: &Dataset,
    sink: &ResultSink,
    ledger: &mut TimingLedger,
) -> BenchResult<()> {
    let name = framework.name();
    info!(framework = name, device = %run.device, "loading backend");
    let adapter = registry::load_adapter(framework, run, dataset.task, dataset.n_rows())?;

    let mut runner = InferenceRunner::new(adapter, run.query_size);
    let predictions = runner.run(&dataset.features, ledger)?;
    sink.write(name, &predictions, ledger)?;

    let Some(labels) = dataset.labels.as_deref() else {
        warn!(framework = name, "dataset has no labels; skipping metrics");
        return Ok(());
    };
    let report = evaluate(dataset.task, labels, &predictions)?;
    println!("{} {name}", report.title());
    print!("{report}");
    println!("################");
    Ok(())
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    anyhow::bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_devices() {
        assert_eq!(parse_device("CPU").unwrap(), Device::Cpu);
        assert_eq!(
            parse_device("cuda:1").unwrap(),
            Device::Cuda { device_id: 1 }
        );
        assert!(parse_device("cuda:x").is_err());
        assert!(parse_device("tpu").is_err());
    }
}
