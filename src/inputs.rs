use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::info;

use crate::config::{InputPaths, RunConfig};
use crate::error::EdgeError;
use crate::factors::FactorTable;
use crate::pipeline::{GrowthInputs, PeriodInputs};
use crate::records::Period;
use crate::segment::DemandSegment;
use crate::tables::{
    DemandMatrix, FlowCategories, FlowLookup, SegmentUserClasses, SplitProbabilities, StationCodes,
    StationDistances, TicketSplits,
};

pub fn costs_path(matrices_dir: &Path, period: Period) -> PathBuf {
    matrices_dir.join(format!("{period}_stn2stn_costs.csv"))
}

pub fn demand_path(matrices_dir: &Path, period: Period, segment: DemandSegment) -> PathBuf {
    matrices_dir.join(format!("{period}_{segment}.csv"))
}

/// Parquet is preferred; a CSV with the same stem is accepted.
pub fn probabilities_path(matrices_dir: &Path, period: Period) -> PathBuf {
    let parquet = matrices_dir.join(format!("{period}_iRSj_probabilities.parquet"));
    if parquet.is_file() {
        parquet
    } else {
        matrices_dir.join(format!("{period}_iRSj_probabilities.csv"))
    }
}

/// Every file a run reads.
pub fn required_files(paths: &InputPaths) -> Vec<PathBuf> {
    let mut files = vec![
        paths.segments_to_uc.clone(),
        paths.ticket_type_splits.clone(),
        paths.flow_categories.clone(),
        paths.stations.clone(),
        paths.edge_flows.clone(),
        paths.edge_factors.clone(),
    ];
    for period in Period::ALL {
        files.push(costs_path(&paths.matrices_dir, period));
        files.push(probabilities_path(&paths.matrices_dir, period));
        for &segment in DemandSegment::ALL {
            files.push(demand_path(&paths.matrices_dir, period, segment));
        }
    }
    files
}

/// Fail before reading anything if any input file is missing.
pub fn preflight(paths: &InputPaths) -> Result<(), EdgeError> {
    let missing: Vec<String> = required_files(paths)
        .into_iter()
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(EdgeError::MissingInput(missing.join(", ")))
    }
}

/// Read a CSV file with all columns as String dtype, trimming column names.
pub fn read_csv_as_strings(path: &Path) -> Result<DataFrame, EdgeError> {
    if !path.is_file() {
        return Err(EdgeError::MissingInput(path.display().to_string()));
    }
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;

    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

/// Read a table by extension: `.parquet` natively, anything else as CSV.
pub fn read_table(path: &Path) -> Result<DataFrame, EdgeError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => {
            let file = File::open(path)
                .map_err(|e| EdgeError::MissingInput(format!("{}: {e}", path.display())))?;
            Ok(ParquetReader::new(file).finish()?)
        }
        _ => read_csv_as_strings(path),
    }
}

/// Load every input of a run into typed tables.
pub fn load_inputs(config: &RunConfig) -> Result<GrowthInputs, EdgeError> {
    let paths = &config.inputs;
    preflight(paths)?;

    let segment_user_classes =
        SegmentUserClasses::from_frame(&read_table(&paths.segments_to_uc)?)?;
    let ticket_splits = TicketSplits::from_frame(&read_table(&paths.ticket_type_splits)?)?;
    let flow_lookup = FlowLookup::from_frame(&read_table(&paths.flow_categories)?)?;
    let stations = StationCodes::from_frame(&read_table(&paths.stations)?)?;
    let flow_categories = FlowCategories::from_frame(&read_table(&paths.edge_flows)?)?;
    let factors = FactorTable::from_frame(&read_table(&paths.edge_factors)?)?;
    info!(factors = factors.len(), "loaded growth factors");

    let mut periods = BTreeMap::new();
    let mut demand = HashMap::new();
    for period in Period::ALL {
        let distances =
            StationDistances::from_frame(&read_table(&costs_path(&paths.matrices_dir, period))?)?;
        let probabilities = SplitProbabilities::from_frame(&read_table(&probabilities_path(
            &paths.matrices_dir,
            period,
        ))?)?;
        periods.insert(
            period,
            PeriodInputs {
                distances,
                probabilities,
            },
        );
        for &segment in DemandSegment::ALL {
            let df = read_table(&demand_path(&paths.matrices_dir, period, segment))?;
            demand.insert((period, segment), DemandMatrix::from_frame(&df)?);
        }
    }

    Ok(GrowthInputs {
        segment_user_classes,
        stations,
        flow_categories,
        flow_lookup,
        ticket_splits,
        factors,
        periods,
        demand,
    })
}
