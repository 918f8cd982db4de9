//! Running audit of demand that needed a borrowed factor or had none.
//!
//! Audits only ever accumulate. Two logs can be merged in any order with the
//! same result, so per-unit logs may be reduced after the fact.

use std::collections::BTreeMap;

use polars::prelude::*;

use crate::error::EdgeError;
use crate::records::{Purpose, TicketType};
use crate::schema::{audit, factor};

/// Demand grown with a factor borrowed from another ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubstitutionKey {
    pub origin_code: String,
    pub destination_code: String,
    pub purpose: Purpose,
    pub missing_ticket: TicketType,
    pub available_ticket: TicketType,
    pub internal: bool,
}

/// Demand with no factor at all. Codes are `None` when a station has no TLC.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnfactoredKey {
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub internal: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditLog {
    substituted: BTreeMap<SubstitutionKey, f64>,
    unfactored: BTreeMap<UnfactoredKey, f64>,
    total_input_demand: f64,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_substitution(&mut self, key: SubstitutionKey, demand: f64) {
        *self.substituted.entry(key).or_insert(0.0) += demand;
    }

    pub fn record_unfactored(&mut self, key: UnfactoredKey, demand: f64) {
        *self.unfactored.entry(key).or_insert(0.0) += demand;
    }

    pub fn add_input_demand(&mut self, demand: f64) {
        self.total_input_demand += demand;
    }

    pub fn merge(&mut self, other: AuditLog) {
        for (key, demand) in other.substituted {
            self.record_substitution(key, demand);
        }
        for (key, demand) in other.unfactored {
            self.record_unfactored(key, demand);
        }
        self.total_input_demand += other.total_input_demand;
    }

    pub fn total_input_demand(&self) -> f64 {
        self.total_input_demand
    }

    pub fn substituted_total(&self) -> f64 {
        self.substituted.values().sum()
    }

    pub fn unfactored_total(&self) -> f64 {
        self.unfactored.values().sum()
    }

    pub fn substitutions(&self) -> impl Iterator<Item = (&SubstitutionKey, f64)> {
        self.substituted.iter().map(|(k, v)| (k, *v))
    }

    pub fn unfactored(&self) -> impl Iterator<Item = (&UnfactoredKey, f64)> {
        self.unfactored.iter().map(|(k, v)| (k, *v))
    }

    pub fn summary(&self) -> AuditSummary {
        let substituted = self.substituted_total();
        let substituted_internal: f64 = self
            .substituted
            .iter()
            .filter(|(k, _)| k.internal)
            .map(|(_, v)| v)
            .sum();
        let unfactored = self.unfactored_total();
        let unfactored_internal: f64 = self
            .unfactored
            .iter()
            .filter(|(k, _)| k.internal)
            .map(|(_, v)| v)
            .sum();

        AuditSummary {
            total_input_demand: self.total_input_demand,
            substituted_demand: substituted,
            unfactored_demand: unfactored,
            substituted_pct: percentage(substituted, self.total_input_demand),
            substituted_internal_pct: percentage(substituted_internal, substituted),
            unfactored_pct: percentage(unfactored, self.total_input_demand),
            unfactored_internal_pct: percentage(unfactored_internal, unfactored),
        }
    }

    /// Summary plus both audits as rows in key order, split by the internal flag.
    pub fn report(&self) -> AuditReport {
        AuditReport {
            summary: self.summary(),
            substitutions: self
                .substituted
                .iter()
                .map(|(k, &demand)| SubstitutionRow {
                    origin_code: k.origin_code.clone(),
                    destination_code: k.destination_code.clone(),
                    purpose: k.purpose,
                    missing_ticket: k.missing_ticket,
                    available_ticket: k.available_ticket,
                    internal: k.internal,
                    demand,
                })
                .collect(),
            unfactored: self
                .unfactored
                .iter()
                .map(|(k, &demand)| UnfactoredRow {
                    origin_code: k.origin_code.clone(),
                    destination_code: k.destination_code.clone(),
                    internal: k.internal,
                    demand,
                })
                .collect(),
        }
    }
}

/// `part / whole` in percent, rounded to three decimals. Zero when `whole` is zero,
/// NaN when either side is not finite.
pub fn percentage(part: f64, whole: f64) -> f64 {
    if !part.is_finite() || !whole.is_finite() {
        return f64::NAN;
    }
    if whole <= 0.0 {
        return 0.0;
    }
    (part / whole * 100.0 * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuditSummary {
    pub total_input_demand: f64,
    pub substituted_demand: f64,
    pub unfactored_demand: f64,
    pub substituted_pct: f64,
    /// Internal share of the substituted demand.
    pub substituted_internal_pct: f64,
    pub unfactored_pct: f64,
    /// Internal share of the unfactored demand.
    pub unfactored_internal_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubstitutionRow {
    pub origin_code: String,
    pub destination_code: String,
    pub purpose: Purpose,
    pub missing_ticket: TicketType,
    pub available_ticket: TicketType,
    pub internal: bool,
    pub demand: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnfactoredRow {
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub internal: bool,
    pub demand: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub summary: AuditSummary,
    pub substitutions: Vec<SubstitutionRow>,
    pub unfactored: Vec<UnfactoredRow>,
}

impl AuditReport {
    pub fn substitution_frame(&self) -> Result<DataFrame, EdgeError> {
        let rows = &self.substitutions;
        let df = DataFrame::new(vec![
            Column::new(
                factor::FROM_CODE.into(),
                rows.iter().map(|r| r.origin_code.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                factor::TO_CODE.into(),
                rows.iter().map(|r| r.destination_code.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                factor::PURPOSE.into(),
                rows.iter().map(|r| r.purpose.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::MISSING_TICKET.into(),
                rows.iter().map(|r| r.missing_ticket.code()).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::AVAILABLE_TICKET.into(),
                rows.iter().map(|r| r.available_ticket.code()).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::INTERNAL.into(),
                rows.iter().map(|r| r.internal).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::DEMAND.into(),
                rows.iter().map(|r| r.demand).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }

    pub fn unfactored_frame(&self) -> Result<DataFrame, EdgeError> {
        let rows = &self.unfactored;
        let df = DataFrame::new(vec![
            Column::new(
                factor::FROM_CODE.into(),
                rows.iter().map(|r| r.origin_code.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                factor::TO_CODE.into(),
                rows.iter().map(|r| r.destination_code.clone()).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::INTERNAL.into(),
                rows.iter().map(|r| r.internal).collect::<Vec<_>>(),
            ),
            Column::new(
                audit::DEMAND.into(),
                rows.iter().map(|r| r.demand).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sub(o: &str, internal: bool) -> SubstitutionKey {
        SubstitutionKey {
            origin_code: o.into(),
            destination_code: "MAN".into(),
            purpose: Purpose::Leisure,
            missing_ticket: TicketType::Reduced,
            available_ticket: TicketType::Full,
            internal,
        }
    }

    fn none(o: Option<&str>, internal: bool) -> UnfactoredKey {
        UnfactoredKey {
            origin_code: o.map(str::to_string),
            destination_code: Some("MAN".into()),
            internal,
        }
    }

    #[test]
    fn merge_is_order_independent() {
        let mut a = AuditLog::new();
        a.record_substitution(sub("LDS", true), 3.0);
        a.add_input_demand(100.0);
        let mut b = AuditLog::new();
        b.record_substitution(sub("LDS", true), 2.0);
        b.record_unfactored(none(None, false), 1.0);
        b.add_input_demand(50.0);

        let mut ab = a.clone();
        ab.merge(b.clone());
        let mut ba = b;
        ba.merge(a);
        assert_eq!(ab, ba);
        assert!((ab.substituted_total() - 5.0).abs() < 1e-12);
        assert!((ab.total_input_demand() - 150.0).abs() < 1e-12);
    }

    #[test]
    fn summary_proportions_and_internal_shares() {
        let mut log = AuditLog::new();
        log.add_input_demand(200.0);
        log.record_substitution(sub("LDS", true), 6.0);
        log.record_substitution(sub("YRK", false), 2.0);
        log.record_unfactored(none(Some("LDS"), true), 1.0);
        log.record_unfactored(none(Some("YRK"), false), 3.0);

        let s = log.summary();
        assert_eq!(s.substituted_pct, 4.0);
        assert_eq!(s.substituted_internal_pct, 75.0);
        assert_eq!(s.unfactored_pct, 2.0);
        assert_eq!(s.unfactored_internal_pct, 25.0);
    }

    #[test]
    fn non_finite_totals_give_nan_percentage() {
        assert!(percentage(1.0, f64::NAN).is_nan());
        assert!(percentage(f64::INFINITY, 10.0).is_nan());
        assert_eq!(percentage(1.0, 8.0), 12.5);
    }

    #[test]
    fn empty_log_reports_zero() {
        let s = AuditLog::new().summary();
        assert_eq!(s.unfactored_pct, 0.0);
        assert_eq!(s.substituted_internal_pct, 0.0);
    }

    #[test]
    fn report_keeps_internal_split() {
        let mut log = AuditLog::new();
        log.record_unfactored(none(Some("LDS"), true), 1.0);
        log.record_unfactored(none(Some("LDS"), false), 2.0);
        log.record_substitution(sub("LDS", true), 4.0);
        let report = log.report();
        assert_eq!(report.unfactored.len(), 2);
        assert!(!report.unfactored[0].internal);
        assert!((report.unfactored[0].demand - 2.0).abs() < 1e-12);

        let frame = report.unfactored_frame().unwrap();
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.width(), 4);
        let internal = frame.column(audit::INTERNAL).unwrap().bool().unwrap();
        assert_eq!(internal.get(1), Some(true));

        let frame = report.substitution_frame().unwrap();
        assert_eq!(frame.width(), 7);
        let internal = frame.column(audit::INTERNAL).unwrap().bool().unwrap();
        assert_eq!(internal.get(0), Some(true));
    }

    #[test]
    fn percentage_rounds_to_three_decimals() {
        assert_eq!(percentage(1.0, 3.0), 33.333);
        assert_eq!(percentage(1.0, 0.0), 0.0);
    }
}
