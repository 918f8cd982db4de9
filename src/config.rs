use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;
use crate::segment::CombinationMode;

/// Parameters of the growth pipeline itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthConfig {
    pub forecast_year: u16,
    /// Number of model zones; output grids are `zones x zones`.
    pub zones: u32,
    /// Zones numbered below this are internal to the model area.
    pub internal_boundary: u32,
    /// Unfactored demand above this percentage of the total aborts the run.
    pub unfactored_threshold_pct: f64,
    /// Station id standing for "no rail station".
    pub no_station_id: u32,
    pub combination: CombinationMode,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            forecast_year: 2018,
            zones: 1300,
            internal_boundary: 1158,
            unfactored_threshold_pct: 1.0,
            no_station_id: 0,
            combination: CombinationMode::Averaging,
        }
    }
}

/// Locations of the input files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputPaths {
    /// Directory with per-period demand, cost and probability files.
    pub matrices_dir: PathBuf,
    pub segments_to_uc: PathBuf,
    pub ticket_type_splits: PathBuf,
    pub flow_categories: PathBuf,
    pub stations: PathBuf,
    pub edge_flows: PathBuf,
    pub edge_factors: PathBuf,
}

/// Everything a full run needs: pipeline parameters, inputs and export location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub growth: GrowthConfig,
    pub inputs: InputPaths,
    pub export_path: PathBuf,
}

impl RunConfig {
    /// Load a run configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, EdgeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| EdgeError::MissingInput(format!("{}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, EdgeError> {
        let config: RunConfig = serde_json::from_str(text)?;
        config.growth.validate()?;
        Ok(config)
    }
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<(), EdgeError> {
        if self.zones == 0 {
            return Err(EdgeError::InvalidData("zones must be positive".into()));
        }
        if !(self.unfactored_threshold_pct >= 0.0) {
            return Err(EdgeError::InvalidData(format!(
                "unfactored_threshold_pct must be non-negative, got {}",
                self.unfactored_threshold_pct
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "inputs": {
            "matrices_dir": "mx",
            "segments_to_uc": "lookups/segments.csv",
            "ticket_type_splits": "lookups/splits.csv",
            "flow_categories": "lookups/flow_cats.csv",
            "stations": "lookups/stations.csv",
            "edge_flows": "edge/flows.csv",
            "edge_factors": "edge/factors.csv"
        },
        "export_path": "out"
    }"#;

    #[test]
    fn defaults_fill_missing_growth_section() {
        let cfg = RunConfig::from_json_str(MINIMAL).unwrap();
        assert_eq!(cfg.growth, GrowthConfig::default());
        assert_eq!(cfg.growth.zones, 1300);
        assert_eq!(cfg.growth.internal_boundary, 1158);
        assert_eq!(cfg.export_path, PathBuf::from("out"));
    }

    #[test]
    fn growth_overrides_are_partial() {
        let text = MINIMAL.replacen(
            "\"inputs\"",
            "\"growth\": {\"forecast_year\": 2033, \"combination\": \"from_only\"}, \"inputs\"",
            1,
        );
        let cfg = RunConfig::from_json_str(&text).unwrap();
        assert_eq!(cfg.growth.forecast_year, 2033);
        assert_eq!(cfg.growth.combination, CombinationMode::FromOnly);
        assert_eq!(cfg.growth.zones, 1300);
    }

    #[test]
    fn rejects_zero_zones() {
        let text = MINIMAL.replacen("\"inputs\"", "\"growth\": {\"zones\": 0}, \"inputs\"", 1);
        assert!(matches!(
            RunConfig::from_json_str(&text),
            Err(EdgeError::InvalidData(_))
        ));
    }
}
