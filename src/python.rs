use std::collections::HashMap;
use std::path::PathBuf;

use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::config::RunConfig;
use crate::error::EdgeError;
use crate::inputs::{load_inputs, read_table};
use crate::logging::init_run_log;
use crate::output::write_matrices;
use crate::pipeline::{ForecastRun, GrowthInputs, GrowthPipeline};
use crate::segment::OutputSegment;

#[pyclass]
pub struct EdgeGrowthModel {
    config: RunConfig,
    inputs: Option<GrowthInputs>,
    run: Option<ForecastRun>,
}

impl EdgeGrowthModel {
    fn completed_run(&self) -> Result<&ForecastRun, EdgeError> {
        self.run
            .as_ref()
            .ok_or_else(|| EdgeError::General("run() has not completed yet".into()))
    }
}

#[pymethods]
impl EdgeGrowthModel {
    /// Build a model from a JSON run configuration.
    ///
    /// `forecast_year` and `export_path` override the file's values.
    #[new]
    #[pyo3(signature = (config_path, forecast_year=None, export_path=None))]
    fn new(
        config_path: String,
        forecast_year: Option<u16>,
        export_path: Option<String>,
    ) -> PyResult<Self> {
        let mut config = RunConfig::from_json_file(&config_path)?;
        if let Some(year) = forecast_year {
            config.growth.forecast_year = year;
        }
        if let Some(path) = export_path {
            config.export_path = PathBuf::from(path);
        }
        Ok(Self {
            config,
            inputs: None,
            run: None,
        })
    }

    // ── Data loading ────────────────────────────────────────────────────────

    /// Load any input table (CSV or parquet) as a Polars DataFrame.
    fn load_table(&self, path: &str) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(read_table(&PathBuf::from(path))?))
    }

    /// Check and read every input file. Called by `run()` if needed.
    fn load_inputs(&mut self) -> PyResult<()> {
        self.inputs = Some(load_inputs(&self.config)?);
        Ok(())
    }

    // ── Run ─────────────────────────────────────────────────────────────────

    /// Grow all periods and segments and return the daily output matrices
    /// keyed by segment name. With `write=True` the matrices and the run log
    /// are also written to the export directory.
    #[pyo3(signature = (write=true))]
    fn run(&mut self, write: bool) -> PyResult<HashMap<String, PyDataFrame>> {
        if write {
            init_run_log(&self.config.export_path, self.config.growth.forecast_year)?;
        }
        if self.inputs.is_none() {
            self.load_inputs()?;
        }
        let inputs = self
            .inputs
            .as_ref()
            .ok_or_else(|| EdgeError::General("inputs not loaded".into()))?;

        let run = GrowthPipeline::new(self.config.growth.clone()).run(inputs)?;
        if write {
            write_matrices(&run, &self.config.export_path)?;
        }

        let mut frames = HashMap::with_capacity(OutputSegment::ALL.len());
        for &segment in OutputSegment::ALL {
            frames.insert(segment.name().to_string(), PyDataFrame(run.output_frame(segment)?));
        }
        self.run = Some(run);
        Ok(frames)
    }

    fn output_frame(&self, segment: &str) -> PyResult<PyDataFrame> {
        let segment: OutputSegment = segment.parse()?;
        Ok(PyDataFrame(self.completed_run()?.output_frame(segment)?))
    }

    // ── Properties ──────────────────────────────────────────────────────────

    #[getter]
    fn run_id(&self) -> Option<String> {
        self.run.as_ref().map(|r| r.run_id.to_string())
    }

    #[getter]
    fn unfactored_pct(&self) -> PyResult<f64> {
        Ok(self.completed_run()?.report.summary.unfactored_pct)
    }

    #[getter]
    fn substitutions_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.completed_run()?.report.substitution_frame()?))
    }

    #[getter]
    fn unfactored_df(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.completed_run()?.report.unfactored_frame()?))
    }
}
