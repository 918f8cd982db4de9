pub mod audit;
pub mod classify;
pub mod combine;
pub mod config;
pub mod error;
pub mod expand;
pub mod factors;
pub mod gate;
pub mod growth;
pub mod inputs;
pub mod logging;
pub mod matrix;
pub mod output;
pub mod pipeline;
pub mod records;
pub mod schema;
pub mod segment;
pub mod tables;
pub mod ticket_split;

#[cfg(feature = "python")]
mod python;

pub use audit::{AuditLog, AuditReport, AuditSummary};
pub use config::{GrowthConfig, InputPaths, RunConfig};
pub use error::EdgeError;
pub use factors::{FactorKey, FactorTable, Resolution};
pub use gate::{GateOutcome, QualityGate};
pub use matrix::{DenseMatrix, ZoneMatrix};
pub use pipeline::{run_edge_growth, ForecastRun, GrowthInputs, GrowthPipeline, PeriodInputs};
pub use records::{Period, Purpose, TicketType};
pub use segment::{CombinationMode, DemandSegment, FactoringMethod, OutputSegment};

#[cfg(feature = "python")]
use pyo3::prelude::*;
#[cfg(feature = "python")]
use pyo3::types::PyModule;

/// Export schema constants as Python submodules
#[cfg(feature = "python")]
fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // Demand matrices
    let demand = PyModule::new(m.py(), "demand")?;
    demand.add("FROM_ZONE", schema::demand::FROM_ZONE)?;
    demand.add("TO_ZONE", schema::demand::TO_ZONE)?;
    demand.add("DEMAND", schema::demand::DEMAND)?;
    m.add_submodule(&demand)?;

    // Station costs
    let distance = PyModule::new(m.py(), "distance")?;
    distance.add("FROM_STATION", schema::distance::FROM_STATION)?;
    distance.add("TO_STATION", schema::distance::TO_STATION)?;
    distance.add("DISTANCE", schema::distance::DISTANCE)?;
    m.add_submodule(&distance)?;

    // Split probabilities
    let probability = PyModule::new(m.py(), "probability")?;
    probability.add("FROM_ZONE", schema::probability::FROM_ZONE)?;
    probability.add("TO_ZONE", schema::probability::TO_ZONE)?;
    probability.add("USER_CLASS", schema::probability::USER_CLASS)?;
    probability.add("FROM_STATION", schema::probability::FROM_STATION)?;
    probability.add("TO_STATION", schema::probability::TO_STATION)?;
    probability.add("PROPORTION", schema::probability::PROPORTION)?;
    m.add_submodule(&probability)?;

    // Factors
    let factor = PyModule::new(m.py(), "factor")?;
    factor.add("FROM_CODE", schema::factor::FROM_CODE)?;
    factor.add("TO_CODE", schema::factor::TO_CODE)?;
    factor.add("PURPOSE", schema::factor::PURPOSE)?;
    factor.add("TICKET_TYPE", schema::factor::TICKET_TYPE)?;
    factor.add("GROWTH_RATE", schema::factor::GROWTH_RATE)?;
    m.add_submodule(&factor)?;

    // Audit
    let audit = PyModule::new(m.py(), "audit")?;
    audit.add("MISSING_TICKET", schema::audit::MISSING_TICKET)?;
    audit.add("AVAILABLE_TICKET", schema::audit::AVAILABLE_TICKET)?;
    audit.add("INTERNAL", schema::audit::INTERNAL)?;
    audit.add("DEMAND", schema::audit::DEMAND)?;
    m.add_submodule(&audit)?;

    // Segments
    let segment = PyModule::new(m.py(), "segment")?;
    let outputs: Vec<&str> = OutputSegment::ALL.iter().map(|s| s.name()).collect();
    segment.add("OUTPUT_SEGMENTS", outputs)?;
    m.add_submodule(&segment)?;

    Ok(())
}

#[cfg(feature = "python")]
#[pymodule]
fn edge_growth(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<python::EdgeGrowthModel>()?;
    add_schema_exports(m)?;
    Ok(())
}
