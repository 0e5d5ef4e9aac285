use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;
use treebench_core::BenchResult;

use crate::{Timer, TimingLedger, RESULT_WRITING};

pub const RESULTS_FILE: &str = "results.txt";

/// Writes predictions and timings under a results directory.
///
/// Every write truncates its target, so a rerun never appends to old output.
#[derive(Clone, Debug)]
pub struct ResultSink {
    dir: PathBuf,
}

impl ResultSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(RESULTS_FILE)
    }

    pub fn timings_path(&self, framework: &str) -> PathBuf {
        self.dir.join(format!("timings_{framework}.json"))
    }

    /// One prediction per line, in row order. Records `"result writing time"`.
    pub fn write(
        &self,
        framework: &str,
        predictions: &[f64],
        ledger: &mut TimingLedger,
    ) -> BenchResult<PathBuf> {
        let timer = Timer::start(RESULT_WRITING);
        fs::create_dir_all(&self.dir)?;
        let path = self.results_path();

        let mut out = BufWriter::new(File::create(&path)?);
        for value in predictions {
            writeln!(out, "{value}")?;
        }
        out.flush()?;

        let ms = timer.stop(ledger);
        info!(%framework, path = %path.display(), rows = predictions.len(), "results written");
        println!("Time Taken to write results to a text file for {framework} is {ms}");
        Ok(path)
    }

    /// Persist the ledger of one framework run as JSON.
    pub fn write_timings(&self, framework: &str, ledger: &TimingLedger) -> BenchResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.timings_path(framework);
        let mut out = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut out, ledger).map_err(std::io::Error::from)?;
        writeln!(out)?;
        out.flush()?;
        Ok(path)
    }
}
