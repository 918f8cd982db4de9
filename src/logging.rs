use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::EdgeError;

pub fn log_path(export_path: &Path, forecast_year: u16) -> PathBuf {
    export_path.join(format!("EDGE_Factoring_{forecast_year}.log"))
}

/// Route `tracing` output to a fresh `EDGE_Factoring_{year}.log` in the export directory.
///
/// A previous log for the same year is replaced. Returns `Ok(false)` when a
/// global subscriber was already installed, in which case that one keeps
/// receiving events and the new file stays empty.
pub fn init_run_log(export_path: &Path, forecast_year: u16) -> Result<bool, EdgeError> {
    fs::create_dir_all(export_path)?;
    let path = log_path(export_path, forecast_year);
    if path.exists() {
        fs::remove_file(&path)?;
    }
    let file = File::create(&path)?;

    let installed = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .try_init()
        .is_ok();
    Ok(installed)
}
