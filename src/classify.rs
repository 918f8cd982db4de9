use crate::records::{ClassifiedMovement, Purpose, StationMovement};
use crate::tables::{FlowCategories, FlowLookup};

pub const OUTSIDE_SOUTH_EAST: &str = "Outside South East";
pub const OUTSIDE_SOUTH_EAST_LONDON: &str = "Outside South East to/from London";

/// Refine a broad flow label by distance in miles.
///
/// Only the two "Outside South East" groups are banded; other labels, and
/// movements with no known distance, keep the broad label.
pub fn distance_band_flow(broad_flow: &str, distance: Option<f64>) -> String {
    let Some(miles) = distance else {
        return broad_flow.to_string();
    };
    let banded = match broad_flow {
        OUTSIDE_SOUTH_EAST if miles < 25.0 => "Outside South East <25 miles",
        OUTSIDE_SOUTH_EAST if miles < 100.0 => "Outside South East 25 to 100 miles",
        OUTSIDE_SOUTH_EAST => "Outside South East  100 + miles - adjusted",
        OUTSIDE_SOUTH_EAST_LONDON if miles < 100.0 => {
            "Outside South East to/from London < 100 miles"
        }
        OUTSIDE_SOUTH_EAST_LONDON => "Outside South East to/from London 100 + miles",
        other => other,
    };
    banded.to_string()
}

/// Attach flow category, distance-band flow and purpose to each movement.
pub fn classify_movements(
    movements: Vec<StationMovement>,
    categories: &FlowCategories,
    lookup: &FlowLookup,
) -> Vec<ClassifiedMovement> {
    movements
        .into_iter()
        .map(|movement| {
            let category = match (&movement.origin_code, &movement.destination_code) {
                (Some(o), Some(d)) => categories.get(o, d),
                _ => None,
            };
            let flow_category = category.map(|c| c.name.clone());
            let distance_band_flow = category
                .and_then(|c| lookup.broad_flow(&c.name))
                .map(|broad| distance_band_flow(broad, movement.distance));
            let purpose = Purpose::from_user_class(movement.user_class);
            ClassifiedMovement {
                movement,
                flow_category,
                distance_band_flow,
                purpose,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::FlowCategory;

    #[test]
    fn outside_south_east_bands() {
        assert_eq!(distance_band_flow(OUTSIDE_SOUTH_EAST, Some(24.9)), "Outside South East <25 miles");
        assert_eq!(distance_band_flow(OUTSIDE_SOUTH_EAST, Some(25.0)), "Outside South East 25 to 100 miles");
        assert_eq!(distance_band_flow(OUTSIDE_SOUTH_EAST, Some(99.9)), "Outside South East 25 to 100 miles");
        assert_eq!(
            distance_band_flow(OUTSIDE_SOUTH_EAST, Some(100.0)),
            "Outside South East  100 + miles - adjusted"
        );
    }

    #[test]
    fn london_bands_split_at_one_hundred() {
        assert_eq!(
            distance_band_flow(OUTSIDE_SOUTH_EAST_LONDON, Some(40.0)),
            "Outside South East to/from London < 100 miles"
        );
        assert_eq!(
            distance_band_flow(OUTSIDE_SOUTH_EAST_LONDON, Some(180.0)),
            "Outside South East to/from London 100 + miles"
        );
    }

    #[test]
    fn unbanded_or_unknown_distance_keeps_broad_label() {
        assert_eq!(distance_band_flow("London Travelcard", Some(5.0)), "London Travelcard");
        assert_eq!(distance_band_flow(OUTSIDE_SOUTH_EAST, None), OUTSIDE_SOUTH_EAST);
    }

    fn movement(o: Option<&str>, d: Option<&str>, user_class: u8) -> StationMovement {
        StationMovement {
            origin_zone: 1,
            destination_zone: 2,
            origin_station: 10,
            destination_station: 20,
            user_class,
            distance: Some(60.0),
            origin_code: o.map(str::to_string),
            destination_code: d.map(str::to_string),
            demand: 1.0,
        }
    }

    #[test]
    fn classify_joins_codes_to_flow_and_purpose() {
        let mut categories = FlowCategories::default();
        categories.insert("LDS", "MAN", FlowCategory { id: Some(3), name: "Non-London Urban".into() });
        let mut lookup = FlowLookup::default();
        lookup.insert("Non-London Urban", OUTSIDE_SOUTH_EAST);

        let out = classify_movements(
            vec![movement(Some("LDS"), Some("MAN"), 5), movement(Some("MAN"), Some("LDS"), 8), movement(None, Some("MAN"), 1)],
            &categories,
            &lookup,
        );
        assert_eq!(out[0].flow_category.as_deref(), Some("Non-London Urban"));
        assert_eq!(out[0].distance_band_flow.as_deref(), Some("Outside South East 25 to 100 miles"));
        assert_eq!(out[0].purpose, Some(Purpose::Commuting));
        assert_eq!(out[1].flow_category, None);
        assert_eq!(out[1].distance_band_flow, None);
        assert_eq!(out[1].purpose, Some(Purpose::Leisure));
        assert_eq!(out[2].flow_category, None);
    }
}
