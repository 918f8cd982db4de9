use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EdgeError;

/// Modelled time period. Processed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Period {
    Am,
    Ip,
    Pm,
    Op,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Am, Period::Ip, Period::Pm, Period::Op];

    pub fn as_str(self) -> &'static str {
        match self {
            Period::Am => "AM",
            Period::Ip => "IP",
            Period::Pm => "PM",
            Period::Op => "OP",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse trip purpose derived from the numeric user class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Purpose {
    Business,
    Commuting,
    Leisure,
}

impl Purpose {
    /// User classes 1-3 are business, 4-6 commuting and 7-9 leisure.
    pub fn from_user_class(user_class: u8) -> Option<Self> {
        match user_class {
            1..=3 => Some(Purpose::Business),
            4..=6 => Some(Purpose::Commuting),
            7..=9 => Some(Purpose::Leisure),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Purpose::Business => "Business",
            Purpose::Commuting => "Commuting",
            Purpose::Leisure => "Leisure",
        }
    }
}

impl FromStr for Purpose {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Business" => Ok(Purpose::Business),
            "Commuting" => Ok(Purpose::Commuting),
            "Leisure" => Ok(Purpose::Leisure),
            other => Err(EdgeError::InvalidData(format!("Unknown purpose: '{other}'"))),
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fare category. Declaration order is the fallback priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketType {
    Full,
    Reduced,
    Season,
}

impl TicketType {
    pub const ALL: [TicketType; 3] = [TicketType::Full, TicketType::Reduced, TicketType::Season];

    /// Slot in per-movement ticket arrays.
    pub fn index(self) -> usize {
        match self {
            TicketType::Full => 0,
            TicketType::Reduced => 1,
            TicketType::Season => 2,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            TicketType::Full => "F",
            TicketType::Reduced => "R",
            TicketType::Season => "S",
        }
    }
}

impl FromStr for TicketType {
    type Err = EdgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "F" => Ok(TicketType::Full),
            "R" => Ok(TicketType::Reduced),
            "S" => Ok(TicketType::Season),
            other => Err(EdgeError::InvalidData(format!("Unknown ticket type: '{other}'"))),
        }
    }
}

impl fmt::Display for TicketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Base-year demand for one zone pair of a segment matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneDemand {
    pub origin_zone: u32,
    pub destination_zone: u32,
    pub demand: f64,
}

/// Zone demand routed through one station pair.
#[derive(Debug, Clone, PartialEq)]
pub struct StationMovement {
    pub origin_zone: u32,
    pub destination_zone: u32,
    pub origin_station: u32,
    pub destination_station: u32,
    pub user_class: u8,
    pub distance: Option<f64>,
    pub origin_code: Option<String>,
    pub destination_code: Option<String>,
    pub demand: f64,
}

impl StationMovement {
    /// Both zones sit strictly below the internal/external boundary.
    pub fn is_internal(&self, boundary: u32) -> bool {
        self.origin_zone < boundary && self.destination_zone < boundary
    }
}

/// A station movement with flow and purpose attached.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedMovement {
    pub movement: StationMovement,
    pub flow_category: Option<String>,
    pub distance_band_flow: Option<String>,
    pub purpose: Option<Purpose>,
}

/// Demand of one movement after the ticket split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TicketDemand {
    /// One slot per ticket type, indexed by [`TicketType::index`].
    Split([f64; 3]),
    /// No split proportions were available; the whole demand is kept together.
    Unsplit(f64),
}

impl TicketDemand {
    pub fn total(&self) -> f64 {
        match self {
            TicketDemand::Split(shares) => shares.iter().sum(),
            TicketDemand::Unsplit(demand) => *demand,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketedMovement {
    pub movement: ClassifiedMovement,
    pub demand: TicketDemand,
}

impl TicketedMovement {
    pub fn codes(&self) -> Option<(&str, &str)> {
        let m = &self.movement.movement;
        match (&m.origin_code, &m.destination_code) {
            (Some(o), Some(d)) => Some((o.as_str(), d.as_str())),
            _ => None,
        }
    }

    pub fn purpose(&self) -> Option<Purpose> {
        self.movement.purpose
    }

    pub fn zones(&self) -> (u32, u32) {
        let m = &self.movement.movement;
        (m.origin_zone, m.destination_zone)
    }
}
