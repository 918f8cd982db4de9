use crate::records::{ClassifiedMovement, TicketDemand, TicketedMovement};
use crate::tables::TicketSplits;

/// Split each movement's demand into Full, Reduced and Season shares.
///
/// Movements with no band flow, no purpose or no matching split keep their
/// demand as [`TicketDemand::Unsplit`] so it is audited rather than lost.
pub fn apply_ticket_splits(
    movements: Vec<ClassifiedMovement>,
    splits: &TicketSplits,
) -> Vec<TicketedMovement> {
    movements
        .into_iter()
        .map(|movement| {
            let demand = movement.movement.demand;
            let proportions = match (&movement.distance_band_flow, movement.purpose) {
                (Some(flow), Some(purpose)) => splits.get(flow, purpose),
                _ => None,
            };
            let demand = match proportions {
                Some(p) => TicketDemand::Split([demand * p[0], demand * p[1], demand * p[2]]),
                None => TicketDemand::Unsplit(demand),
            };
            TicketedMovement { movement, demand }
        })
        .collect()
}
