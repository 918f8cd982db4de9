use std::fs::{self, File};
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::error::EdgeError;
use crate::pipeline::ForecastRun;
use crate::segment::OutputSegment;

pub fn matrix_path(export_path: &Path, forecast_year: u16, segment: OutputSegment) -> PathBuf {
    export_path.join(format!("{forecast_year}_24Hr_{segment}.csv"))
}

pub fn write_frame(df: &mut DataFrame, path: &Path) -> Result<(), EdgeError> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

/// Write every output segment of a completed run as a full-grid CSV.
pub fn write_matrices(run: &ForecastRun, export_path: &Path) -> Result<Vec<PathBuf>, EdgeError> {
    fs::create_dir_all(export_path)?;
    let mut written = Vec::with_capacity(OutputSegment::ALL.len());
    for &segment in OutputSegment::ALL {
        let path = matrix_path(export_path, run.config.forecast_year, segment);
        let mut df = run.output_frame(segment)?;
        write_frame(&mut df, &path)?;
        info!(%segment, path = %path.display(), "wrote daily matrix");
        written.push(path);
    }
    Ok(written)
}
