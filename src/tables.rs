//! Typed lookups built from pre-parsed input frames.
//!
//! Every table validates its required columns, casts them to numbers with
//! polars expressions and then indexes the rows in a `HashMap` so the
//! pipeline never re-joins frames.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::warn;

use crate::error::EdgeError;
use crate::records::{Purpose, ZoneDemand};
use crate::schema::{demand, distance, flow, flow_lookup, probability, segment, station, ticket_split};
use crate::segment::DemandSegment;

// ── Frame helpers ───────────────────────────────────────────────────────────

pub(crate) fn require_columns(df: &DataFrame, required: &[&str]) -> Result<(), EdgeError> {
    for &col_name in required {
        if df.column(col_name).is_err() {
            return Err(EdgeError::MissingColumn(col_name.to_string()));
        }
    }
    Ok(())
}

/// Cast the given columns to Float64, trimming whitespace from string input.
pub(crate) fn cast_float_columns(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, EdgeError> {
    let mut exprs = Vec::with_capacity(columns.len());
    for &name in columns {
        let expr = if df.column(name)?.dtype() == &DataType::String {
            col(name)
                .str()
                .strip_chars(lit(" \t\r\n"))
                .cast(DataType::Float64)
        } else {
            col(name).cast(DataType::Float64)
        };
        exprs.push(expr);
    }
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Cast the given columns to trimmed strings.
pub(crate) fn cast_string_columns(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, EdgeError> {
    let exprs: Vec<Expr> = columns
        .iter()
        .map(|&name| col(name).cast(DataType::String).str().strip_chars(lit(" \t\r\n")))
        .collect();
    Ok(df.clone().lazy().with_columns(exprs).collect()?)
}

/// Convert a float cell holding an identifier to `u32`.
pub(crate) fn as_id(value: Option<f64>, column: &str, row: usize) -> Result<u32, EdgeError> {
    match value {
        Some(v) if v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => Ok(v as u32),
        Some(v) => Err(EdgeError::InvalidData(format!(
            "{column} at row {row} is not a valid id: {v}"
        ))),
        None => Err(EdgeError::InvalidData(format!("Null {column} at row {row}"))),
    }
}

fn as_user_class(value: Option<f64>, column: &str, row: usize) -> Result<u8, EdgeError> {
    let id = as_id(value, column, row)?;
    u8::try_from(id).map_err(|_| {
        EdgeError::InvalidData(format!("{column} at row {row} is out of range: {id}"))
    })
}

// ── Demand matrix ───────────────────────────────────────────────────────────

/// Base-year zone-to-zone demand for one period and segment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandMatrix {
    pub rows: Vec<ZoneDemand>,
}

impl DemandMatrix {
    pub fn new(rows: Vec<ZoneDemand>) -> Self {
        Self { rows }
    }

    /// Required columns: from_model_zone_id, to_model_zone_id, Demand.
    /// Null demand cells are read as zero; negative or non-finite demand is rejected.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        require_columns(df, &[demand::FROM_ZONE, demand::TO_ZONE, demand::DEMAND])?;
        let df = cast_float_columns(df, &[demand::FROM_ZONE, demand::TO_ZONE, demand::DEMAND])?;
        let from = df.column(demand::FROM_ZONE)?.f64()?;
        let to = df.column(demand::TO_ZONE)?.f64()?;
        let value = df.column(demand::DEMAND)?.f64()?;

        let mut rows = Vec::with_capacity(df.height());
        for i in 0..df.height() {
            let trips = value.get(i).unwrap_or(0.0);
            if !trips.is_finite() || trips < 0.0 {
                return Err(EdgeError::InvalidData(format!(
                    "{} at row {i} is not a valid demand: {trips}",
                    demand::DEMAND
                )));
            }
            rows.push(ZoneDemand {
                origin_zone: as_id(from.get(i), demand::FROM_ZONE, i)?,
                destination_zone: as_id(to.get(i), demand::TO_ZONE, i)?,
                demand: trips,
            });
        }
        Ok(Self { rows })
    }

    pub fn total(&self) -> f64 {
        self.rows.iter().map(|r| r.demand).sum()
    }
}

// ── Split probabilities ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSplit {
    pub origin_station: u32,
    pub destination_station: u32,
    pub proportion: f64,
}

/// Allocation of zone demand to station pairs, keyed by
/// (origin zone, destination zone, user class).
#[derive(Debug, Clone, Default)]
pub struct SplitProbabilities {
    splits: HashMap<(u32, u32, u8), Vec<StationSplit>>,
}

impl SplitProbabilities {
    pub fn insert(&mut self, origin_zone: u32, destination_zone: u32, user_class: u8, split: StationSplit) {
        self.splits
            .entry((origin_zone, destination_zone, user_class))
            .or_default()
            .push(split);
    }

    pub fn get(&self, origin_zone: u32, destination_zone: u32, user_class: u8) -> &[StationSplit] {
        self.splits
            .get(&(origin_zone, destination_zone, user_class))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Rows with a null proportion are skipped.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        let cols = [
            probability::FROM_ZONE,
            probability::TO_ZONE,
            probability::USER_CLASS,
            probability::FROM_STATION,
            probability::TO_STATION,
            probability::PROPORTION,
        ];
        require_columns(df, &cols)?;
        let df = cast_float_columns(df, &cols)?;
        let from = df.column(probability::FROM_ZONE)?.f64()?;
        let to = df.column(probability::TO_ZONE)?.f64()?;
        let uc = df.column(probability::USER_CLASS)?.f64()?;
        let from_stn = df.column(probability::FROM_STATION)?.f64()?;
        let to_stn = df.column(probability::TO_STATION)?.f64()?;
        let proportion = df.column(probability::PROPORTION)?.f64()?;

        let mut table = Self::default();
        for i in 0..df.height() {
            let Some(p) = proportion.get(i) else {
                continue;
            };
            table.insert(
                as_id(from.get(i), probability::FROM_ZONE, i)?,
                as_id(to.get(i), probability::TO_ZONE, i)?,
                as_user_class(uc.get(i), probability::USER_CLASS, i)?,
                StationSplit {
                    origin_station: as_id(from_stn.get(i), probability::FROM_STATION, i)?,
                    destination_station: as_id(to_stn.get(i), probability::TO_STATION, i)?,
                    proportion: p,
                },
            );
        }
        Ok(table)
    }
}

// ── Station distances ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct StationDistances {
    distances: HashMap<(u32, u32), f64>,
}

impl StationDistances {
    pub fn insert(&mut self, origin_station: u32, destination_station: u32, miles: f64) {
        self.distances.insert((origin_station, destination_station), miles);
    }

    pub fn get(&self, origin_station: u32, destination_station: u32) -> Option<f64> {
        self.distances.get(&(origin_station, destination_station)).copied()
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        let cols = [distance::FROM_STATION, distance::TO_STATION, distance::DISTANCE];
        require_columns(df, &cols)?;
        let df = cast_float_columns(df, &cols)?;
        let from = df.column(distance::FROM_STATION)?.f64()?;
        let to = df.column(distance::TO_STATION)?.f64()?;
        let miles = df.column(distance::DISTANCE)?.f64()?;

        let mut table = Self::default();
        for i in 0..df.height() {
            if let Some(d) = miles.get(i) {
                table.insert(
                    as_id(from.get(i), distance::FROM_STATION, i)?,
                    as_id(to.get(i), distance::TO_STATION, i)?,
                    d,
                );
            }
        }
        Ok(table)
    }
}

// ── Station codes ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub code: String,
    pub name: String,
}

/// Station zone id → three-letter code.
#[derive(Debug, Clone, Default)]
pub struct StationCodes {
    stations: HashMap<u32, Station>,
}

impl StationCodes {
    pub fn insert(&mut self, station_id: u32, code: impl Into<String>, name: impl Into<String>) {
        self.stations.insert(
            station_id,
            Station {
                code: code.into(),
                name: name.into(),
            },
        );
    }

    pub fn code(&self, station_id: u32) -> Option<&str> {
        self.stations.get(&station_id).map(|s| s.code.as_str())
    }

    pub fn get(&self, station_id: u32) -> Option<&Station> {
        self.stations.get(&station_id)
    }

    /// Required columns: stn_zone_id, STATIONCODE. STATIONNAME is optional.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        require_columns(df, &[station::STATION_ID, station::CODE])?;
        let df = cast_float_columns(df, &[station::STATION_ID])?;
        let has_name = df.column(station::NAME).is_ok();
        let string_cols: &[&str] = if has_name {
            &[station::CODE, station::NAME]
        } else {
            &[station::CODE]
        };
        let df = cast_string_columns(&df, string_cols)?;
        let ids = df.column(station::STATION_ID)?.f64()?;
        let codes = df.column(station::CODE)?.str()?;
        let names = if has_name {
            Some(df.column(station::NAME)?.str()?)
        } else {
            None
        };

        let mut table = Self::default();
        for i in 0..df.height() {
            let Some(code) = codes.get(i) else {
                continue;
            };
            let name = names.and_then(|n| n.get(i)).unwrap_or("");
            table.insert(as_id(ids.get(i), station::STATION_ID, i)?, code, name);
        }
        Ok(table)
    }
}

// ── Flow categories ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct FlowCategory {
    pub id: Option<u32>,
    pub name: String,
}

/// Flow category of each (origin TLC, destination TLC) movement.
#[derive(Debug, Clone, Default)]
pub struct FlowCategories {
    categories: HashMap<(String, String), FlowCategory>,
}

impl FlowCategories {
    pub fn insert(&mut self, origin_code: &str, destination_code: &str, category: FlowCategory) {
        self.categories
            .entry((origin_code.to_string(), destination_code.to_string()))
            .or_insert(category);
    }

    pub fn get(&self, origin_code: &str, destination_code: &str) -> Option<&FlowCategory> {
        self.categories
            .get(&(origin_code.to_string(), destination_code.to_string()))
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        require_columns(df, &[flow::FROM_CODE, flow::TO_CODE, flow::CATEGORY_NAME])?;
        let df = cast_string_columns(df, &[flow::FROM_CODE, flow::TO_CODE, flow::CATEGORY_NAME])?;
        let has_id = df.column(flow::CATEGORY_ID).is_ok();
        let df = if has_id {
            cast_float_columns(&df, &[flow::CATEGORY_ID])?
        } else {
            df
        };
        let from = df.column(flow::FROM_CODE)?.str()?;
        let to = df.column(flow::TO_CODE)?.str()?;
        let names = df.column(flow::CATEGORY_NAME)?.str()?;
        let ids = if has_id {
            Some(df.column(flow::CATEGORY_ID)?.f64()?)
        } else {
            None
        };

        let mut table = Self::default();
        for i in 0..df.height() {
            let (Some(o), Some(d), Some(name)) = (from.get(i), to.get(i), names.get(i)) else {
                continue;
            };
            let id = match ids.and_then(|c| c.get(i)) {
                Some(v) => Some(as_id(Some(v), flow::CATEGORY_ID, i)?),
                None => None,
            };
            table.insert(
                o,
                d,
                FlowCategory {
                    id,
                    name: name.to_string(),
                },
            );
        }
        Ok(table)
    }
}

/// Flow category name → broad (non-distance) flow label.
#[derive(Debug, Clone, Default)]
pub struct FlowLookup {
    broad: HashMap<String, String>,
}

impl FlowLookup {
    pub fn insert(&mut self, category: impl Into<String>, broad_flow: impl Into<String>) {
        self.broad.insert(category.into(), broad_flow.into());
    }

    pub fn broad_flow(&self, category: &str) -> Option<&str> {
        self.broad.get(category).map(String::as_str)
    }

    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        let cols = [flow_lookup::CATEGORY_NAME, flow_lookup::NON_DISTANCE_FLOW];
        require_columns(df, &cols)?;
        let df = cast_string_columns(df, &cols)?;
        let names = df.column(flow_lookup::CATEGORY_NAME)?.str()?;
        let broad = df.column(flow_lookup::NON_DISTANCE_FLOW)?.str()?;

        let mut table = Self::default();
        for i in 0..df.height() {
            if let (Some(name), Some(label)) = (names.get(i), broad.get(i)) {
                table.insert(name, label);
            }
        }
        Ok(table)
    }
}

// ── Ticket splits ───────────────────────────────────────────────────────────

/// Ticket-type proportions keyed by (distance-band flow, purpose).
#[derive(Debug, Clone, Default)]
pub struct TicketSplits {
    splits: HashMap<(String, Purpose), [f64; 3]>,
}

impl TicketSplits {
    /// Proportions are ordered Full, Reduced, Season.
    pub fn insert(&mut self, flow: impl Into<String>, purpose: Purpose, proportions: [f64; 3]) {
        self.splits.insert((flow.into(), purpose), proportions);
    }

    pub fn get(&self, flow: &str, purpose: Purpose) -> Option<[f64; 3]> {
        self.splits.get(&(flow.to_string(), purpose)).copied()
    }

    /// Rows with any null proportion are left out, so their key stays unmatched.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        let shares = [ticket_split::FULL, ticket_split::REDUCED, ticket_split::SEASON];
        require_columns(df, &[ticket_split::FLOW, ticket_split::PURPOSE])?;
        require_columns(df, &shares)?;
        let df = cast_string_columns(df, &[ticket_split::FLOW, ticket_split::PURPOSE])?;
        let df = cast_float_columns(&df, &shares)?;
        let flows = df.column(ticket_split::FLOW)?.str()?;
        let purposes = df.column(ticket_split::PURPOSE)?.str()?;
        let full = df.column(ticket_split::FULL)?.f64()?;
        let reduced = df.column(ticket_split::REDUCED)?.f64()?;
        let season = df.column(ticket_split::SEASON)?.f64()?;

        let mut table = Self::default();
        for i in 0..df.height() {
            let (Some(flow), Some(purpose)) = (flows.get(i), purposes.get(i)) else {
                continue;
            };
            let Ok(purpose) = purpose.parse::<Purpose>() else {
                warn!("Ticket split purpose '{purpose}' is not known; row {i} ignored");
                continue;
            };
            match (full.get(i), reduced.get(i), season.get(i)) {
                (Some(f), Some(r), Some(s)) => table.insert(flow, purpose, [f, r, s]),
                _ => warn!("Ticket split for '{flow}' / {purpose} has null proportions; ignored"),
            }
        }
        Ok(table)
    }
}

// ── Segment user classes ────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct SegmentUserClasses {
    classes: HashMap<DemandSegment, u8>,
}

impl SegmentUserClasses {
    pub fn insert(&mut self, segment: DemandSegment, user_class: u8) {
        self.classes.insert(segment, user_class);
    }

    pub fn get(&self, segment: DemandSegment) -> Option<u8> {
        self.classes.get(&segment).copied()
    }

    /// Required columns: MX, userclass. Unknown segment names are skipped.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        require_columns(df, &[segment::SEGMENT, segment::USER_CLASS])?;
        let df = cast_string_columns(df, &[segment::SEGMENT])?;
        let df = cast_float_columns(&df, &[segment::USER_CLASS])?;
        let names = df.column(segment::SEGMENT)?.str()?;
        let classes = df.column(segment::USER_CLASS)?.f64()?;

        let mut table = Self::default();
        for i in 0..df.height() {
            let Some(name) = names.get(i) else {
                continue;
            };
            match name.parse::<DemandSegment>() {
                Ok(seg) => {
                    table
                        .classes
                        .entry(seg)
                        .or_insert(as_user_class(classes.get(i), segment::USER_CLASS, i)?);
                }
                Err(_) => warn!("Segment '{name}' is not a known demand segment; ignored"),
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demand_matrix_parses_string_columns() {
        let df = df!(
            demand::FROM_ZONE => ["1", " 2"],
            demand::TO_ZONE => ["2", "1 "],
            demand::DEMAND => ["10.5", "4"],
        )
        .unwrap();
        let mx = DemandMatrix::from_frame(&df).unwrap();
        assert_eq!(mx.rows.len(), 2);
        assert_eq!(mx.rows[1].origin_zone, 2);
        assert_eq!(mx.rows[1].destination_zone, 1);
        assert!((mx.total() - 14.5).abs() < 1e-12);
    }

    #[test]
    fn demand_matrix_requires_columns() {
        let df = df!(demand::FROM_ZONE => [1.0], demand::TO_ZONE => [2.0]).unwrap();
        assert!(matches!(
            DemandMatrix::from_frame(&df),
            Err(EdgeError::MissingColumn(c)) if c == demand::DEMAND
        ));
    }

    #[test]
    fn demand_matrix_rejects_nan_and_negative_demand() {
        for bad in ["NaN", "-3"] {
            let df = df!(
                demand::FROM_ZONE => ["1", "2"],
                demand::TO_ZONE => ["2", "1"],
                demand::DEMAND => ["10", bad],
            )
            .unwrap();
            assert!(
                matches!(DemandMatrix::from_frame(&df), Err(EdgeError::InvalidData(_))),
                "{bad} accepted"
            );
        }
    }

    #[test]
    fn fractional_zone_id_is_invalid() {
        assert!(as_id(Some(1.5), "zone", 0).is_err());
        assert!(as_id(None, "zone", 0).is_err());
        assert_eq!(as_id(Some(7.0), "zone", 0).unwrap(), 7);
    }

    #[test]
    fn probabilities_group_by_zone_pair_and_class() {
        let df = df!(
            probability::FROM_ZONE => [1.0, 1.0, 1.0],
            probability::TO_ZONE => [2.0, 2.0, 2.0],
            probability::USER_CLASS => [7.0, 7.0, 1.0],
            probability::FROM_STATION => [10.0, 11.0, 10.0],
            probability::TO_STATION => [20.0, 20.0, 20.0],
            probability::PROPORTION => [0.25, 0.75, 1.0],
        )
        .unwrap();
        let probs = SplitProbabilities::from_frame(&df).unwrap();
        assert_eq!(probs.get(1, 2, 7).len(), 2);
        assert_eq!(probs.get(1, 2, 1).len(), 1);
        assert!(probs.get(2, 1, 7).is_empty());
    }

    #[test]
    fn ticket_splits_skip_null_rows() {
        let df = df!(
            ticket_split::FLOW => ["London", "Rural"],
            ticket_split::PURPOSE => ["Business", "Leisure"],
            ticket_split::FULL => [Some(0.5), None],
            ticket_split::REDUCED => [Some(0.3), Some(0.5)],
            ticket_split::SEASON => [Some(0.2), Some(0.5)],
        )
        .unwrap();
        let splits = TicketSplits::from_frame(&df).unwrap();
        assert_eq!(splits.get("London", Purpose::Business), Some([0.5, 0.3, 0.2]));
        assert_eq!(splits.get("Rural", Purpose::Leisure), None);
    }

    #[test]
    fn ticket_splits_skip_unknown_purpose() {
        let df = df!(
            ticket_split::FLOW => ["London", "London"],
            ticket_split::PURPOSE => ["Shopping", "Commuting"],
            ticket_split::FULL => [0.1, 0.2],
            ticket_split::REDUCED => [0.1, 0.2],
            ticket_split::SEASON => [0.8, 0.6],
        )
        .unwrap();
        let splits = TicketSplits::from_frame(&df).unwrap();
        assert_eq!(splits.get("London", Purpose::Commuting), Some([0.2, 0.2, 0.6]));
        assert_eq!(splits.get("London", Purpose::Business), None);
    }

    #[test]
    fn segment_classes_ignore_unknown_names() {
        let df = df!(
            segment::SEGMENT => ["HBEBCA_Int", "Mystery"],
            segment::USER_CLASS => [1i64, 4],
        )
        .unwrap();
        let classes = SegmentUserClasses::from_frame(&df).unwrap();
        assert_eq!(classes.get(DemandSegment::HbebcaInt), Some(1));
        assert_eq!(classes.get(DemandSegment::OncaExt), None);
    }

    #[test]
    fn stations_without_name_column() {
        let df = df!(station::STATION_ID => [5i64], station::CODE => ["LDS"]).unwrap();
        let stations = StationCodes::from_frame(&df).unwrap();
        assert_eq!(stations.code(5), Some("LDS"));
        assert_eq!(stations.get(5).unwrap().name, "");
    }
}
