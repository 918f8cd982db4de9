use crate::factors::{FactorTable, Resolution};
use crate::matrix::ZoneMatrix;
use crate::records::{Purpose, TicketDemand, TicketType, TicketedMovement};
use crate::segment::FactoringMethod;

/// Rate used when no factor is found in a direction.
pub const NO_GROWTH: f64 = 1.0;

/// Grown demand of one period and segment at zone level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrowthResult {
    pub matrix: ZoneMatrix,
    pub base_demand: f64,
    pub forecast_demand: f64,
}

/// Exact factor, else the ticket-type fallback, else [`NO_GROWTH`].
fn direct_rate(factors: &FactorTable, origin: &str, destination: &str, purpose: Purpose, ticket: TicketType) -> f64 {
    match factors.resolve(origin, destination, purpose, ticket) {
        Resolution::Resolved { rate, .. } => rate,
        Resolution::Unresolved => NO_GROWTH,
    }
}

/// Growth rate applied to one ticket of a station movement.
///
/// The bidirectional average resolves the reverse pair with the same
/// ticket-type fallback as the forward pair. A reverse factor borrowed here
/// is neither added to the table nor recorded in the substitution audit.
pub fn ticket_rate(
    factors: &FactorTable,
    method: FactoringMethod,
    origin: &str,
    destination: &str,
    purpose: Purpose,
    ticket: TicketType,
) -> f64 {
    match method {
        FactoringMethod::Direct => direct_rate(factors, origin, destination, purpose, ticket),
        FactoringMethod::BidirectionalAverage => {
            let forward = direct_rate(factors, origin, destination, purpose, ticket);
            let reverse = direct_rate(factors, destination, origin, purpose, ticket);
            (forward + reverse) / 2.0
        }
    }
}

/// Multiply resolved factors into ticket demand and regroup to zone pairs.
///
/// Tickets whose factor was borrowed grow at the borrowed rate, in either
/// direction. Anything still unresolved, including unsplit movements, grows
/// at [`NO_GROWTH`].
pub fn apply_growth(
    movements: &[TicketedMovement],
    factors: &FactorTable,
    method: FactoringMethod,
) -> GrowthResult {
    let mut result = GrowthResult::default();

    for tm in movements {
        let (origin_zone, destination_zone) = tm.zones();
        let base = tm.demand.total();
        let grown: f64 = match (tm.demand, tm.codes(), tm.purpose()) {
            (TicketDemand::Split(shares), Some((o, d)), Some(purpose)) => TicketType::ALL
                .into_iter()
                .map(|t| shares[t.index()] * ticket_rate(factors, method, o, d, purpose, t))
                .sum(),
            (demand, _, _) => demand.total() * NO_GROWTH,
        };
        result.base_demand += base;
        result.forecast_demand += grown;
        result.matrix.add(origin_zone, destination_zone, grown);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factors::FactorKey;
    use crate::records::{ClassifiedMovement, StationMovement};

    fn movement(demand: TicketDemand, zones: (u32, u32)) -> TicketedMovement {
        TicketedMovement {
            movement: ClassifiedMovement {
                movement: StationMovement {
                    origin_zone: zones.0,
                    destination_zone: zones.1,
                    origin_station: 10,
                    destination_station: 20,
                    user_class: 7,
                    distance: Some(50.0),
                    origin_code: Some("LDS".into()),
                    destination_code: Some("MAN".into()),
                    demand: demand.total(),
                },
                flow_category: Some("Urban".into()),
                distance_band_flow: Some("Urban".into()),
                purpose: Some(Purpose::Leisure),
            },
            demand,
        }
    }

    fn factors() -> FactorTable {
        let mut table = FactorTable::new();
        table.insert_observed(FactorKey::new("LDS", "MAN", Purpose::Leisure, TicketType::Full), 1.2);
        table.insert_observed(FactorKey::new("LDS", "MAN", Purpose::Leisure, TicketType::Season), 1.0);
        table.insert_observed(FactorKey::new("MAN", "LDS", Purpose::Leisure, TicketType::Reduced), 1.4);
        table
    }

    #[test]
    fn direct_method_borrows_missing_ticket() {
        let table = factors();
        let out = apply_growth(
            &[movement(TicketDemand::Split([10.0, 10.0, 10.0]), (1, 2))],
            &table,
            FactoringMethod::Direct,
        );
        assert!((out.forecast_demand - (12.0 + 12.0 + 10.0)).abs() < 1e-9);
        assert!((out.base_demand - 30.0).abs() < 1e-9);
        assert!((out.matrix.get(1, 2) - 34.0).abs() < 1e-9);
    }

    #[test]
    fn bidirectional_average_uses_both_directions() {
        let table = factors();
        let rate = |t| ticket_rate(&table, FactoringMethod::BidirectionalAverage, "LDS", "MAN", Purpose::Leisure, t);
        assert!((rate(TicketType::Full) - 1.3).abs() < 1e-12);
        assert!((rate(TicketType::Reduced) - 1.3).abs() < 1e-12);
        assert!((rate(TicketType::Season) - 1.2).abs() < 1e-12);
    }

    #[test]
    fn bidirectional_average_counts_missing_side_as_one() {
        let mut table = FactorTable::new();
        table.insert_observed(FactorKey::new("LDS", "MAN", Purpose::Leisure, TicketType::Full), 1.2);
        for t in TicketType::ALL {
            let rate = ticket_rate(&table, FactoringMethod::BidirectionalAverage, "LDS", "MAN", Purpose::Leisure, t);
            assert!((rate - 1.1).abs() < 1e-12);
        }
        let direct = ticket_rate(&table, FactoringMethod::Direct, "MAN", "LDS", Purpose::Leisure, TicketType::Full);
        assert_eq!(direct, NO_GROWTH);
    }

    #[test]
    fn reverse_borrow_leaves_table_untouched() {
        let table = factors();
        let before = table.len();
        let out = apply_growth(
            &[movement(TicketDemand::Split([10.0, 10.0, 10.0]), (1, 2))],
            &table,
            FactoringMethod::BidirectionalAverage,
        );
        // MAN->LDS Full and Season are borrowed from Reduced at 1.4
        assert!((out.forecast_demand - (13.0 + 13.0 + 12.0)).abs() < 1e-9);
        assert_eq!(table.len(), before);
        assert_eq!(table.borrowed_count(), 0);
        assert_eq!(
            table.exact("MAN", "LDS", Purpose::Leisure, TicketType::Full),
            Resolution::Unresolved
        );
    }

    #[test]
    fn unsplit_demand_passes_through() {
        let table = factors();
        let out = apply_growth(
            &[
                movement(TicketDemand::Unsplit(7.0), (1, 2)),
                movement(TicketDemand::Split([1.0, 0.0, 0.0]), (1, 2)),
            ],
            &table,
            FactoringMethod::Direct,
        );
        assert!((out.matrix.get(1, 2) - 8.2).abs() < 1e-9);
        assert_eq!(out.matrix.len(), 1);
    }

    #[test]
    fn unit_factors_conserve_demand() {
        let mut table = FactorTable::new();
        for t in TicketType::ALL {
            table.insert_observed(FactorKey::new("LDS", "MAN", Purpose::Leisure, t), 1.0);
            table.insert_observed(FactorKey::new("MAN", "LDS", Purpose::Leisure, t), 1.0);
        }
        let movements = [
            movement(TicketDemand::Split([3.0, 2.0, 1.0]), (1, 2)),
            movement(TicketDemand::Split([0.5, 0.25, 0.25]), (2, 1)),
        ];
        for method in [FactoringMethod::Direct, FactoringMethod::BidirectionalAverage] {
            let out = apply_growth(&movements, &table, method);
            assert!((out.forecast_demand - out.base_demand).abs() < 1e-9);
            assert!((out.matrix.total() - 7.0).abs() < 1e-9);
        }
    }
}
