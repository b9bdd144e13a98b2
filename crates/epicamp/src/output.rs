//! Report and summary writers

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{Result, WrapErr, eyre};

use epicamp_core::report::{ReportRow, RunSummary};

/// Write bytes to a file atomically using write-then-rename pattern.
pub fn atomic_write_bytes(path: &Path, content: &[u8]) -> io::Result<()> {
    let mut temp = path.as_os_str().to_owned();
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);
    fs::write(&temp_path, content)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Files produced by one run, keyed by the parameter identity hash
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPaths {
    pub report: PathBuf,
    pub summary: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, identity_hash: &str) -> Self {
        Self {
            report: dir.join(format!("{identity_hash}.csv")),
            summary: dir.join(format!("{identity_hash}.json")),
        }
    }

    /// Both files already exist from an earlier run with the same inputs
    pub fn exist(&self) -> bool {
        self.report.is_file() && self.summary.is_file()
    }
}

pub fn report_csv(rows: &[ReportRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| eyre!("cannot finish report: {}", e.error()))
}

pub fn write_report(path: &Path, rows: &[ReportRow]) -> Result<()> {
    atomic_write_bytes(path, &report_csv(rows)?)
        .wrap_err_with(|| format!("cannot write {}", path.display()))
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    atomic_write_bytes(path, &json).wrap_err_with(|| format!("cannot write {}", path.display()))
}
