use thiserror::Error;

use crate::audit::AuditReport;

#[derive(Error, Debug)]
pub enum EdgeError {
    #[error("Input not found: {0}")]
    MissingInput(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("InvalidData: {0}")]
    InvalidData(String),

    #[error(
        "Demand with no factors = {unfactored_pct}% exceeds the {threshold_pct}% threshold of the total demand"
    )]
    QualityGate {
        unfactored_pct: f64,
        threshold_pct: f64,
        report: Box<AuditReport>,
    },

    #[error("{0}")]
    General(String),
}

#[cfg(feature = "python")]
impl From<EdgeError> for pyo3::PyErr {
    fn from(err: EdgeError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for EdgeError {
    fn from(err: pyo3::PyErr) -> Self {
        EdgeError::General(err.to_string())
    }
}
