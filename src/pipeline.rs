//! Period × segment growth loop, daily combination and the quality gate.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use chrono::{DateTime, Local};
use polars::prelude::DataFrame;
use tracing::{info, info_span, warn};
use uuid::Uuid;

use crate::audit::{AuditLog, AuditReport};
use crate::classify::classify_movements;
use crate::combine::{combine_segment, sum_periods};
use crate::config::{GrowthConfig, RunConfig};
use crate::error::EdgeError;
use crate::expand::{expand_movements, StationNetwork};
use crate::factors::{resolve_factors, FactorTable, ResolveStats};
use crate::gate::QualityGate;
use crate::growth::{apply_growth, GrowthResult};
use crate::inputs::load_inputs;
use crate::logging::init_run_log;
use crate::matrix::{DenseMatrix, ZoneMatrix};
use crate::output::write_matrices;
use crate::records::Period;
use crate::segment::{DemandSegment, OutputSegment};
use crate::tables::{
    DemandMatrix, FlowCategories, FlowLookup, SegmentUserClasses, SplitProbabilities, StationCodes,
    StationDistances, TicketSplits,
};
use crate::ticket_split::apply_ticket_splits;

/// Station-level inputs that vary by period.
#[derive(Debug, Clone, Default)]
pub struct PeriodInputs {
    pub distances: StationDistances,
    pub probabilities: SplitProbabilities,
}

/// Fully materialised inputs of a run.
#[derive(Debug, Clone, Default)]
pub struct GrowthInputs {
    pub segment_user_classes: SegmentUserClasses,
    pub stations: StationCodes,
    pub flow_categories: FlowCategories,
    pub flow_lookup: FlowLookup,
    pub ticket_splits: TicketSplits,
    pub factors: FactorTable,
    pub periods: BTreeMap<Period, PeriodInputs>,
    pub demand: HashMap<(Period, DemandSegment), DemandMatrix>,
}

impl GrowthInputs {
    /// Every period, every segment's user class and every period/segment
    /// demand matrix must be present before processing starts.
    pub fn validate(&self) -> Result<(), EdgeError> {
        for period in Period::ALL {
            if !self.periods.contains_key(&period) {
                return Err(EdgeError::MissingInput(format!(
                    "{period} station costs and split probabilities"
                )));
            }
        }
        for &segment in DemandSegment::ALL {
            if self.segment_user_classes.get(segment).is_none() {
                return Err(EdgeError::MissingInput(format!(
                    "user class for segment {segment}"
                )));
            }
            for period in Period::ALL {
                if !self.demand.contains_key(&(period, segment)) {
                    return Err(EdgeError::MissingInput(format!(
                        "{period}_{segment} demand matrix"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Totals of one period/segment unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSummary {
    pub period: Period,
    pub segment: DemandSegment,
    /// Total of the input matrix.
    pub input_demand: f64,
    /// Demand that reached a station pair.
    pub base_demand: f64,
    pub forecast_demand: f64,
    pub unrouted_demand: f64,
    pub missing_distance: usize,
    pub resolve: ResolveStats,
}

/// A completed run: daily segment matrices plus what was learned on the way.
#[derive(Debug, Clone)]
pub struct ForecastRun {
    pub run_id: Uuid,
    pub config: GrowthConfig,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub daily: HashMap<DemandSegment, ZoneMatrix>,
    pub units: Vec<UnitSummary>,
    pub report: AuditReport,
    /// Factor table including borrowed factors.
    pub factors: FactorTable,
}

impl ForecastRun {
    /// Full `zones x zones` grid of one output segment.
    pub fn output_matrix(&self, segment: OutputSegment) -> DenseMatrix {
        combine_segment(&self.daily, segment, self.config.combination, self.config.zones)
    }

    pub fn output_frame(&self, segment: OutputSegment) -> Result<DataFrame, EdgeError> {
        self.output_matrix(segment).to_frame()
    }

    pub fn total_forecast_demand(&self) -> f64 {
        self.units.iter().map(|u| u.forecast_demand).sum()
    }
}

pub struct GrowthPipeline {
    config: GrowthConfig,
}

impl GrowthPipeline {
    pub fn new(config: GrowthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GrowthConfig {
        &self.config
    }

    /// Grow one period/segment matrix.
    ///
    /// `factors` may gain borrowed records and `audit` accumulates
    /// substitutions, unfactored demand and the input total.
    pub fn process_unit(
        &self,
        period: Period,
        segment: DemandSegment,
        demand: &DemandMatrix,
        inputs: &GrowthInputs,
        factors: &mut FactorTable,
        audit: &mut AuditLog,
    ) -> Result<(GrowthResult, UnitSummary), EdgeError> {
        let period_inputs = inputs
            .periods
            .get(&period)
            .ok_or_else(|| EdgeError::MissingInput(format!("{period} period inputs")))?;
        let user_class = inputs
            .segment_user_classes
            .get(segment)
            .ok_or_else(|| EdgeError::MissingInput(format!("user class for segment {segment}")))?;

        let input_demand = demand.total();
        audit.add_input_demand(input_demand);

        let network = StationNetwork {
            probabilities: &period_inputs.probabilities,
            distances: &period_inputs.distances,
            stations: &inputs.stations,
            no_station_id: self.config.no_station_id,
        };
        let expansion = expand_movements(demand, user_class, segment.is_to_home(), &network);
        if expansion.missing_distance > 0 {
            warn!(
                %period,
                %segment,
                station_pairs = expansion.missing_distance,
                "station pairs with no distance; distance bands not applied"
            );
        }
        let classified =
            classify_movements(expansion.movements, &inputs.flow_categories, &inputs.flow_lookup);
        let ticketed = apply_ticket_splits(classified, &inputs.ticket_splits);
        let resolve = resolve_factors(&ticketed, factors, audit, self.config.internal_boundary);
        let growth = apply_growth(&ticketed, factors, segment.factoring_method());

        let summary = UnitSummary {
            period,
            segment,
            input_demand,
            base_demand: growth.base_demand,
            forecast_demand: growth.forecast_demand,
            unrouted_demand: expansion.unrouted_demand,
            missing_distance: expansion.missing_distance,
            resolve,
        };
        Ok((growth, summary))
    }

    /// Run every period and segment, then gate on unfactored demand.
    ///
    /// Returns [`EdgeError::QualityGate`] when too much demand found no
    /// factor; nothing is combined in that case.
    pub fn run(&self, inputs: &GrowthInputs) -> Result<ForecastRun, EdgeError> {
        self.config.validate()?;
        inputs.validate()?;

        let run_id = Uuid::new_v4();
        let started_at = Local::now();
        let _span = info_span!("edge_growth", %run_id).entered();
        info!(
            "Started process @ {} for forecast year {}",
            started_at.format("%d-%m-%Y %H:%M:%S%.f"),
            self.config.forecast_year
        );

        let mut factors = inputs.factors.clone();
        let mut audit = AuditLog::new();
        let mut units = Vec::new();
        let mut by_segment: HashMap<DemandSegment, BTreeMap<Period, ZoneMatrix>> = HashMap::new();

        for period in Period::ALL {
            info!("-- Processing time period {period}");
            for &segment in DemandSegment::ALL {
                let demand = inputs.demand.get(&(period, segment)).ok_or_else(|| {
                    EdgeError::MissingInput(format!("{period}_{segment} demand matrix"))
                })?;
                let (growth, summary) =
                    self.process_unit(period, segment, demand, inputs, &mut factors, &mut audit)?;
                info!(
                    %segment,
                    base = summary.input_demand.round(),
                    forecast = summary.forecast_demand.round(),
                    unrouted = summary.unrouted_demand.round(),
                    "segment grown"
                );
                by_segment
                    .entry(segment)
                    .or_default()
                    .insert(period, growth.matrix);
                units.push(summary);
            }
        }

        info!(
            borrowed_factors = factors.borrowed_count(),
            total_factors = factors.len(),
            "factor table augmented"
        );

        let gate = QualityGate::new(self.config.unfactored_threshold_pct);
        let report = match gate.enforce(&audit) {
            Ok(report) => report,
            Err(err) => {
                info!(
                    "Process was interrupted @ {}",
                    Local::now().format("%d-%m-%Y %H:%M:%S%.f")
                );
                return Err(err);
            }
        };

        let daily = by_segment
            .iter()
            .map(|(segment, periods)| (*segment, sum_periods(periods)))
            .collect();

        let finished_at = Local::now();
        info!(
            "Process finished successfully @ {}",
            finished_at.format("%d-%m-%Y %H:%M:%S%.f")
        );

        Ok(ForecastRun {
            run_id,
            config: self.config.clone(),
            started_at,
            finished_at,
            daily,
            units,
            report,
            factors,
        })
    }
}

/// Complete run: log setup, input loading,
/// growth, gate and matrix export. Returns the run and the written files.
pub fn run_edge_growth(config: &RunConfig) -> Result<(ForecastRun, Vec<PathBuf>), EdgeError> {
    init_run_log(&config.export_path, config.growth.forecast_year)?;
    let inputs = load_inputs(config)?;
    let run = GrowthPipeline::new(config.growth.clone()).run(&inputs)?;
    let written = write_matrices(&run, &config.export_path)?;
    Ok((run, written))
}
