use std::collections::BTreeMap;

use tracing::debug;

use crate::records::StationMovement;
use crate::tables::{DemandMatrix, SplitProbabilities, StationCodes, StationDistances};

/// Per-period lookups needed to route zone demand through stations.
pub struct StationNetwork<'a> {
    pub probabilities: &'a SplitProbabilities,
    pub distances: &'a StationDistances,
    pub stations: &'a StationCodes,
    pub no_station_id: u32,
}

/// Station-level movements of one segment matrix.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub movements: Vec<StationMovement>,
    /// Demand with no split probability or routed to the no-station sentinel.
    pub unrouted_demand: f64,
    /// Station pairs with no distance entry.
    pub missing_distance: usize,
}

/// Convert zone-to-zone demand into station-to-station movements.
///
/// To-home matrices are transposed first; their probabilities are indexed by
/// the outbound direction so the lookup key stays the untransposed pair.
/// Demand with no matching probability is dropped and counted as unrouted.
pub fn expand_movements(
    demand: &DemandMatrix,
    user_class: u8,
    to_home: bool,
    network: &StationNetwork<'_>,
) -> Expansion {
    let mut routed: BTreeMap<(u32, u32, u32, u32), f64> = BTreeMap::new();
    let mut unrouted_demand = 0.0;

    for row in demand.rows.iter().filter(|r| r.demand > 0.0) {
        let (origin, destination) = if to_home {
            (row.destination_zone, row.origin_zone)
        } else {
            (row.origin_zone, row.destination_zone)
        };
        let splits = network
            .probabilities
            .get(row.origin_zone, row.destination_zone, user_class);
        if splits.is_empty() {
            unrouted_demand += row.demand;
            continue;
        }
        for split in splits {
            *routed
                .entry((
                    origin,
                    destination,
                    split.origin_station,
                    split.destination_station,
                ))
                .or_insert(0.0) += row.demand * split.proportion;
        }
    }

    let mut movements = Vec::with_capacity(routed.len());
    let mut missing_distance = 0;
    for ((origin_zone, destination_zone, origin_station, destination_station), value) in routed {
        if origin_station == network.no_station_id {
            unrouted_demand += value;
            continue;
        }
        let distance = network.distances.get(origin_station, destination_station);
        if distance.is_none() {
            missing_distance += 1;
        }
        movements.push(StationMovement {
            origin_zone,
            destination_zone,
            origin_station,
            destination_station,
            user_class,
            distance,
            origin_code: network.stations.code(origin_station).map(str::to_string),
            destination_code: network.stations.code(destination_station).map(str::to_string),
            demand: value,
        });
    }

    debug!(
        movements = movements.len(),
        unrouted_demand, missing_distance, "expanded zone demand to station movements"
    );

    Expansion {
        movements,
        unrouted_demand,
        missing_distance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::ZoneDemand;
    use crate::tables::StationSplit;

    fn network_tables() -> (SplitProbabilities, StationDistances, StationCodes) {
        let mut probs = SplitProbabilities::default();
        probs.insert(1, 2, 7, StationSplit { origin_station: 10, destination_station: 20, proportion: 0.6 });
        probs.insert(1, 2, 7, StationSplit { origin_station: 11, destination_station: 20, proportion: 0.4 });
        probs.insert(3, 2, 7, StationSplit { origin_station: 0, destination_station: 20, proportion: 1.0 });
        let mut distances = StationDistances::default();
        distances.insert(10, 20, 30.0);
        let mut stations = StationCodes::default();
        stations.insert(10, "LDS", "Leeds");
        stations.insert(11, "YRK", "York");
        stations.insert(20, "MAN", "Manchester Piccadilly");
        (probs, distances, stations)
    }

    fn zone(o: u32, d: u32, demand: f64) -> ZoneDemand {
        ZoneDemand { origin_zone: o, destination_zone: d, demand }
    }

    #[test]
    fn splits_demand_across_station_pairs() {
        let (probabilities, distances, stations) = network_tables();
        let network = StationNetwork { probabilities: &probabilities, distances: &distances, stations: &stations, no_station_id: 0 };
        let mx = DemandMatrix::new(vec![zone(1, 2, 100.0)]);

        let out = expand_movements(&mx, 7, false, &network);
        assert_eq!(out.movements.len(), 2);
        let first = &out.movements[0];
        assert_eq!((first.origin_station, first.destination_station), (10, 20));
        assert!((first.demand - 60.0).abs() < 1e-9);
        assert_eq!(first.distance, Some(30.0));
        assert_eq!(first.origin_code.as_deref(), Some("LDS"));
        assert_eq!(out.movements[1].distance, None);
        assert_eq!(out.missing_distance, 1);
        assert_eq!(out.unrouted_demand, 0.0);
    }

    #[test]
    fn unmatched_and_no_station_demand_is_unrouted() {
        let (probabilities, distances, stations) = network_tables();
        let network = StationNetwork { probabilities: &probabilities, distances: &distances, stations: &stations, no_station_id: 0 };
        let mx = DemandMatrix::new(vec![zone(2, 1, 5.0), zone(3, 2, 7.0), zone(1, 2, 0.0)]);

        let out = expand_movements(&mx, 7, false, &network);
        assert!(out.movements.is_empty());
        assert!((out.unrouted_demand - 12.0).abs() < 1e-9);
    }

    #[test]
    fn to_home_transposes_zones_but_keeps_outbound_split() {
        let (probabilities, distances, stations) = network_tables();
        let network = StationNetwork { probabilities: &probabilities, distances: &distances, stations: &stations, no_station_id: 0 };
        let mx = DemandMatrix::new(vec![zone(1, 2, 10.0)]);

        let out = expand_movements(&mx, 7, true, &network);
        assert_eq!(out.movements.len(), 2);
        for m in &out.movements {
            assert_eq!((m.origin_zone, m.destination_zone), (2, 1));
        }
        let total: f64 = out.movements.iter().map(|m| m.demand).sum();
        assert!((total - 10.0).abs() < 1e-9);
    }
}
