use std::collections::{BTreeMap, HashMap};

use crate::matrix::{DenseMatrix, ZoneMatrix};
use crate::records::Period;
use crate::segment::{Combination, CombinationMode, DemandSegment, OutputSegment};

/// Daily total of one segment: the four period matrices summed cell-wise.
pub fn sum_periods(periods: &BTreeMap<Period, ZoneMatrix>) -> ZoneMatrix {
    ZoneMatrix::sum(periods.values())
}

/// Build one output segment as a full grid from the daily input segments.
///
/// A daily segment with no entry is treated as an empty matrix.
pub fn combine_segment(
    daily: &HashMap<DemandSegment, ZoneMatrix>,
    output: OutputSegment,
    mode: CombinationMode,
    zones: u32,
) -> DenseMatrix {
    let empty = ZoneMatrix::new();
    let get = |seg: DemandSegment| daily.get(&seg).unwrap_or(&empty);
    match output.combination(mode) {
        Combination::AverageWithReturn {
            outbound,
            return_leg,
        } => DenseMatrix::average_with_transposed(get(outbound), get(return_leg), zones),
        Combination::ExpandOnly(source) => DenseMatrix::expand(get(source), zones),
    }
}
