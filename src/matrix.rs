use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::warn;

use crate::error::EdgeError;
use crate::schema::demand;

/// Sparse zone-to-zone matrix. Absent cells are zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneMatrix {
    cells: BTreeMap<(u32, u32), f64>,
}

impl ZoneMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, origin: u32, destination: u32, value: f64) {
        *self.cells.entry((origin, destination)).or_insert(0.0) += value;
    }

    pub fn get(&self, origin: u32, destination: u32) -> f64 {
        self.cells.get(&(origin, destination)).copied().unwrap_or(0.0)
    }

    pub fn total(&self) -> f64 {
        self.cells.values().sum()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = ((u32, u32), f64)> + '_ {
        self.cells.iter().map(|(k, v)| (*k, *v))
    }

    /// Swap origin and destination of every cell.
    pub fn transpose(&self) -> ZoneMatrix {
        ZoneMatrix {
            cells: self.cells.iter().map(|(&(o, d), &v)| ((d, o), v)).collect(),
        }
    }

    /// Cell-wise sum; a cell missing from either side counts as zero.
    pub fn sum<'a>(matrices: impl IntoIterator<Item = &'a ZoneMatrix>) -> ZoneMatrix {
        let mut out = ZoneMatrix::new();
        for m in matrices {
            for ((o, d), v) in m.iter() {
                out.add(o, d, v);
            }
        }
        out
    }
}

/// Complete `zones x zones` matrix over zone ids `1..=zones`, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseMatrix {
    zones: u32,
    values: Vec<f64>,
}

impl DenseMatrix {
    pub fn zeros(zones: u32) -> Self {
        let n = zones as usize;
        Self {
            zones,
            values: vec![0.0; n * n],
        }
    }

    /// Expand a sparse matrix to the full grid with zero fill.
    /// Cells outside `1..=zones` are dropped with a warning.
    pub fn expand(source: &ZoneMatrix, zones: u32) -> Self {
        let mut out = Self::zeros(zones);
        out.accumulate(source, 1.0);
        out
    }

    /// Mean of `outbound` and the transpose of `return_leg`, both expanded.
    pub fn average_with_transposed(outbound: &ZoneMatrix, return_leg: &ZoneMatrix, zones: u32) -> Self {
        let mut out = Self::zeros(zones);
        out.accumulate(outbound, 0.5);
        out.accumulate(&return_leg.transpose(), 0.5);
        out
    }

    fn index(&self, origin: u32, destination: u32) -> Option<usize> {
        if origin == 0 || destination == 0 || origin > self.zones || destination > self.zones {
            return None;
        }
        let n = self.zones as usize;
        Some((origin as usize - 1) * n + (destination as usize - 1))
    }

    fn accumulate(&mut self, source: &ZoneMatrix, weight: f64) {
        let mut dropped = 0.0;
        for ((o, d), v) in source.iter() {
            match self.index(o, d) {
                Some(i) => self.values[i] += v * weight,
                None => dropped += v,
            }
        }
        if dropped != 0.0 {
            warn!(
                zones = self.zones,
                dropped, "demand outside the model zone range dropped from matrix"
            );
        }
    }

    pub fn zones(&self) -> u32 {
        self.zones
    }

    /// Number of cells, always `zones²`.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, origin: u32, destination: u32) -> Option<f64> {
        self.index(origin, destination).map(|i| self.values[i])
    }

    pub fn total(&self) -> f64 {
        self.values.iter().sum()
    }

    /// Long-format frame with one row per cell.
    pub fn to_frame(&self) -> Result<DataFrame, EdgeError> {
        let n = self.zones as usize;
        let mut from = Vec::with_capacity(n * n);
        let mut to = Vec::with_capacity(n * n);
        for o in 1..=self.zones {
            for d in 1..=self.zones {
                from.push(o);
                to.push(d);
            }
        }
        let df = DataFrame::new(vec![
            Column::new(demand::FROM_ZONE.into(), &from),
            Column::new(demand::TO_ZONE.into(), &to),
            Column::new(demand::DEMAND.into(), &self.values),
        ])?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sparse(cells: &[(u32, u32, f64)]) -> ZoneMatrix {
        let mut m = ZoneMatrix::new();
        for &(o, d, v) in cells {
            m.add(o, d, v);
        }
        m
    }

    #[test]
    fn sum_outer_joins_with_zero_fill() {
        let am = sparse(&[(1, 2, 1.0)]);
        let ip = sparse(&[(1, 2, 2.0), (2, 1, 4.0)]);
        let pm = ZoneMatrix::new();
        let op = sparse(&[(3, 3, 8.0)]);
        let day = ZoneMatrix::sum([&am, &ip, &pm, &op]);
        assert_eq!(day.get(1, 2), 3.0);
        assert_eq!(day.get(2, 1), 4.0);
        assert_eq!(day.get(3, 3), 8.0);
        assert_eq!(day.len(), 3);
    }

    #[test]
    fn expansion_builds_full_grid() {
        let dense = DenseMatrix::expand(&sparse(&[(2, 3, 5.0)]), 4);
        assert_eq!(dense.len(), 16);
        assert_eq!(dense.get(2, 3), Some(5.0));
        assert_eq!(dense.get(3, 2), Some(0.0));
        assert_eq!(dense.get(5, 1), None);
        assert_eq!(dense.total(), 5.0);
    }

    #[test]
    fn expansion_drops_out_of_range_zones() {
        let dense = DenseMatrix::expand(&sparse(&[(1, 1, 1.0), (9, 1, 2.0), (0, 1, 4.0)]), 2);
        assert_eq!(dense.total(), 1.0);
    }

    #[test]
    fn averaging_uses_transposed_return_leg() {
        let outbound = sparse(&[(1, 2, 100.0)]);
        let return_leg = sparse(&[(2, 1, 60.0)]);
        let dense = DenseMatrix::average_with_transposed(&outbound, &return_leg, 3);
        assert_eq!(dense.get(1, 2), Some(80.0));
        assert_eq!(dense.get(2, 1), Some(0.0));
    }

    #[test]
    fn frame_has_one_row_per_cell() {
        let df = DenseMatrix::expand(&sparse(&[(1, 2, 1.5)]), 3).to_frame().unwrap();
        assert_eq!(df.height(), 9);
        let values = df.column(demand::DEMAND).unwrap().f64().unwrap();
        assert_eq!(values.get(1), Some(1.5));
    }
}
