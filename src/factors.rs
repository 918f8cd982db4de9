//! Growth factor table and the ticket-type fallback resolver.

use std::collections::HashMap;

use polars::prelude::*;
use tracing::{debug, warn};

use crate::audit::{AuditLog, SubstitutionKey, UnfactoredKey};
use crate::error::EdgeError;
use crate::records::{Purpose, TicketDemand, TicketType, TicketedMovement};
use crate::schema::factor;
use crate::tables::{cast_float_columns, cast_string_columns, require_columns};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactorKey {
    pub origin_code: String,
    pub destination_code: String,
    pub purpose: Purpose,
    pub ticket: TicketType,
}

impl FactorKey {
    pub fn new(origin_code: &str, destination_code: &str, purpose: Purpose, ticket: TicketType) -> Self {
        Self {
            origin_code: origin_code.to_string(),
            destination_code: destination_code.to_string(),
            purpose,
            ticket,
        }
    }
}

/// Where a factor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorSource {
    /// Supplied directly in the factor input.
    Observed,
    /// Copied from another ticket type of the same movement and purpose.
    Borrowed { from: TicketType },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorRecord {
    pub growth_rate: f64,
    pub source: FactorSource,
}

impl FactorRecord {
    pub fn is_authoritative(&self) -> bool {
        self.source == FactorSource::Observed
    }
}

/// Outcome of looking a ticket up in the factor table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Resolved { rate: f64, source: FactorSource },
    Unresolved,
}

/// Sparse growth factors keyed by (origin TLC, destination TLC, purpose, ticket).
///
/// Grows monotonically during a run: borrowed factors are only ever added
/// for keys that have no record, so observed factors are never replaced.
#[derive(Debug, Clone, Default)]
pub struct FactorTable {
    factors: HashMap<FactorKey, FactorRecord>,
}

impl FactorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an observed factor. Observed factors always win over borrowed
    /// ones; a repeated observed key keeps its first value.
    pub fn insert_observed(&mut self, key: FactorKey, growth_rate: f64) -> bool {
        let record = FactorRecord {
            growth_rate,
            source: FactorSource::Observed,
        };
        match self.factors.get(&key) {
            Some(existing) if existing.is_authoritative() => false,
            _ => {
                self.factors.insert(key, record);
                true
            }
        }
    }

    /// Insert a borrowed factor if the key has no record yet.
    pub fn insert_borrowed(&mut self, key: FactorKey, growth_rate: f64, from: TicketType) -> bool {
        if self.factors.contains_key(&key) {
            return false;
        }
        self.factors.insert(
            key,
            FactorRecord {
                growth_rate,
                source: FactorSource::Borrowed { from },
            },
        );
        true
    }

    pub fn get(&self, key: &FactorKey) -> Option<&FactorRecord> {
        self.factors.get(key)
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    pub fn borrowed_count(&self) -> usize {
        self.factors.values().filter(|r| !r.is_authoritative()).count()
    }

    /// Exact lookup on all four key parts.
    pub fn exact(&self, origin: &str, destination: &str, purpose: Purpose, ticket: TicketType) -> Resolution {
        match self.factors.get(&FactorKey::new(origin, destination, purpose, ticket)) {
            Some(r) => Resolution::Resolved {
                rate: r.growth_rate,
                source: r.source,
            },
            None => Resolution::Unresolved,
        }
    }

    /// Observed factor of another ticket type for the same movement and
    /// purpose, taken in the fixed priority Full, Reduced, Season.
    pub fn fallback(
        &self,
        origin: &str,
        destination: &str,
        purpose: Purpose,
        missing: TicketType,
    ) -> Option<(TicketType, f64)> {
        TicketType::ALL
            .into_iter()
            .filter(|t| *t != missing)
            .find_map(|t| {
                self.factors
                    .get(&FactorKey::new(origin, destination, purpose, t))
                    .filter(|r| r.is_authoritative())
                    .map(|r| (t, r.growth_rate))
            })
    }

    /// Exact key first, then the ticket-type fallback.
    pub fn resolve(&self, origin: &str, destination: &str, purpose: Purpose, ticket: TicketType) -> Resolution {
        match self.exact(origin, destination, purpose, ticket) {
            Resolution::Unresolved => match self.fallback(origin, destination, purpose, ticket) {
                Some((from, rate)) => Resolution::Resolved {
                    rate,
                    source: FactorSource::Borrowed { from },
                },
                None => Resolution::Unresolved,
            },
            resolved => resolved,
        }
    }

    /// Build from the factor input.
    ///
    /// Required columns: ZoneCodeFrom, ZoneCodeTo, purpose, TicketType, Demand_rate.
    /// Rows with a null growth rate are discarded.
    pub fn from_frame(df: &DataFrame) -> Result<Self, EdgeError> {
        let text_cols = [
            factor::FROM_CODE,
            factor::TO_CODE,
            factor::PURPOSE,
            factor::TICKET_TYPE,
        ];
        require_columns(df, &text_cols)?;
        require_columns(df, &[factor::GROWTH_RATE])?;
        let df = cast_string_columns(df, &text_cols)?;
        let df = cast_float_columns(&df, &[factor::GROWTH_RATE])?;
        let from = df.column(factor::FROM_CODE)?.str()?;
        let to = df.column(factor::TO_CODE)?.str()?;
        let purposes = df.column(factor::PURPOSE)?.str()?;
        let tickets = df.column(factor::TICKET_TYPE)?.str()?;
        let rates = df.column(factor::GROWTH_RATE)?.f64()?;

        let mut table = Self::new();
        let mut null_rates = 0usize;
        let mut duplicates = 0usize;
        for i in 0..df.height() {
            let Some(rate) = rates.get(i).filter(|r| !r.is_nan()) else {
                null_rates += 1;
                continue;
            };
            let (Some(o), Some(d), Some(p), Some(t)) =
                (from.get(i), to.get(i), purposes.get(i), tickets.get(i))
            else {
                return Err(EdgeError::InvalidData(format!(
                    "Null key column in growth factors at row {i}"
                )));
            };
            let key = FactorKey::new(o, d, p.parse()?, t.parse()?);
            if !table.insert_observed(key, rate) {
                duplicates += 1;
            }
        }

        if null_rates > 0 {
            debug!(null_rates, "discarded growth factors with no rate");
        }
        if duplicates > 0 {
            warn!(duplicates, "duplicate growth factor keys; first value kept");
        }
        Ok(table)
    }
}

/// Counts from resolving one batch of movements.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolveStats {
    pub direct: usize,
    pub borrowed: usize,
    pub unresolved: usize,
}

/// Resolve a factor for every ticket of every movement.
///
/// Missing tickets borrow an observed factor of another ticket type, which is
/// appended to `factors` and recorded in the substitution audit. Tickets with
/// nothing to borrow, movements with no station code, and unsplit movements
/// are recorded in the unfactored audit.
pub fn resolve_factors(
    movements: &[TicketedMovement],
    factors: &mut FactorTable,
    audit: &mut AuditLog,
    internal_boundary: u32,
) -> ResolveStats {
    let mut stats = ResolveStats::default();

    for tm in movements {
        let internal = tm.movement.movement.is_internal(internal_boundary);
        let (shares, codes, purpose) = match (tm.demand, tm.codes(), tm.purpose()) {
            (TicketDemand::Split(shares), Some(codes), Some(purpose)) => (shares, codes, purpose),
            (demand, _, _) => {
                stats.unresolved += 1;
                record_unfactored(audit, tm, internal, demand.total());
                continue;
            }
        };
        let (origin, destination) = codes;

        for ticket in TicketType::ALL {
            let demand = shares[ticket.index()];
            let borrowed = match factors.exact(origin, destination, purpose, ticket) {
                Resolution::Resolved {
                    source: FactorSource::Observed,
                    ..
                } => {
                    stats.direct += 1;
                    continue;
                }
                // borrowed by an earlier movement; still audited for this one
                Resolution::Resolved {
                    source: FactorSource::Borrowed { from },
                    rate,
                } => Some((from, rate)),
                Resolution::Unresolved => factors.fallback(origin, destination, purpose, ticket),
            };
            match borrowed {
                Some((available, rate)) => {
                    stats.borrowed += 1;
                    factors.insert_borrowed(
                        FactorKey::new(origin, destination, purpose, ticket),
                        rate,
                        available,
                    );
                    if demand > 0.0 {
                        audit.record_substitution(
                            SubstitutionKey {
                                origin_code: origin.to_string(),
                                destination_code: destination.to_string(),
                                purpose,
                                missing_ticket: ticket,
                                available_ticket: available,
                                internal,
                            },
                            demand,
                        );
                    }
                }
                None => {
                    stats.unresolved += 1;
                    record_unfactored(audit, tm, internal, demand);
                }
            }
        }
    }

    stats
}

fn record_unfactored(audit: &mut AuditLog, tm: &TicketedMovement, internal: bool, demand: f64) {
    if demand <= 0.0 {
        return;
    }
    let m = &tm.movement.movement;
    audit.record_unfactored(
        UnfactoredKey {
            origin_code: m.origin_code.clone(),
            destination_code: m.destination_code.clone(),
            internal,
        },
        demand,
    );
}
