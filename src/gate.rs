use tracing::{info, warn};

use crate::audit::{AuditLog, AuditReport};
use crate::error::EdgeError;

/// Terminal state of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum GateOutcome {
    Completed(AuditReport),
    Aborted(AuditReport),
}

/// Threshold check on the share of demand that found no factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    pub threshold_pct: f64,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self { threshold_pct: 1.0 }
    }
}

impl QualityGate {
    pub fn new(threshold_pct: f64) -> Self {
        Self { threshold_pct }
    }

    /// Aborts when the rounded unfactored percentage is strictly above the
    /// threshold or cannot be computed.
    pub fn evaluate(&self, audit: &AuditLog) -> GateOutcome {
        let report = audit.report();
        let pct = report.summary.unfactored_pct;
        if !pct.is_finite() || pct > self.threshold_pct {
            GateOutcome::Aborted(report)
        } else {
            GateOutcome::Completed(report)
        }
    }

    /// Evaluate and log the outcome; an abort becomes [`EdgeError::QualityGate`].
    pub fn enforce(&self, audit: &AuditLog) -> Result<AuditReport, EdgeError> {
        match self.evaluate(audit) {
            GateOutcome::Completed(report) => {
                log_completed(&report);
                Ok(report)
            }
            GateOutcome::Aborted(report) => {
                log_aborted(&report, self.threshold_pct);
                Err(EdgeError::QualityGate {
                    unfactored_pct: report.summary.unfactored_pct,
                    threshold_pct: self.threshold_pct,
                    report: Box::new(report),
                })
            }
        }
    }
}

fn log_unfactored_rows(report: &AuditReport) {
    for row in &report.unfactored {
        warn!(
            origin = row.origin_code.as_deref().unwrap_or("-"),
            destination = row.destination_code.as_deref().unwrap_or("-"),
            internal = row.internal,
            demand = row.demand,
            "no factor"
        );
    }
}

fn log_aborted(report: &AuditReport, threshold_pct: f64) {
    let s = &report.summary;
    warn!(
        "Demand with no factors = {}% exceeding the {}% threshold of the total demand hence the process terminated",
        s.unfactored_pct, threshold_pct
    );
    warn!("Movements with no factors:");
    log_unfactored_rows(report);
}

fn log_completed(report: &AuditReport) {
    let s = &report.summary;
    info!(
        "Movements below have missing factors for Missing_TicketType; factors of Available_TicketType were used"
    );
    info!(
        "Total demand proportion for these movements = {}% of which {}% is internal",
        s.substituted_pct, s.substituted_internal_pct
    );
    for row in &report.substitutions {
        info!(
            origin = %row.origin_code,
            destination = %row.destination_code,
            purpose = %row.purpose,
            missing = %row.missing_ticket,
            available = %row.available_ticket,
            demand = row.demand,
            "borrowed factor"
        );
    }
    warn!("Movements below have no factors at all hence no growth has been applied");
    warn!(
        "Total demand proportion for these movements = {}% of which {}% is internal",
        s.unfactored_pct, s.unfactored_internal_pct
    );
    log_unfactored_rows(report);
}
