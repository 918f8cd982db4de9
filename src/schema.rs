/// Column-name constants for every tabular input and output.
/// Names follow the files produced by the surrounding demand tooling.

// ── Zone demand matrices ────────────────────────────────────────────────────
pub mod demand {
    pub const FROM_ZONE: &str = "from_model_zone_id";
    pub const TO_ZONE: &str = "to_model_zone_id";
    pub const DEMAND: &str = "Demand";
}

// ── Station-pair costs ──────────────────────────────────────────────────────
pub mod distance {
    pub const FROM_STATION: &str = "from_stn_zone_id";
    pub const TO_STATION: &str = "to_stn_zone_id";
    pub const DISTANCE: &str = "tran_distance";
}

// ── Zone-to-station split probabilities ─────────────────────────────────────
pub mod probability {
    pub const FROM_ZONE: &str = "from_model_zone_id";
    pub const TO_ZONE: &str = "to_model_zone_id";
    pub const USER_CLASS: &str = "userclass";
    pub const FROM_STATION: &str = "from_stn_zone_id";
    pub const TO_STATION: &str = "to_stn_zone_id";
    pub const PROPORTION: &str = "proportion";
}

// ── Station zone → TLC lookup ───────────────────────────────────────────────
pub mod station {
    pub const STATION_ID: &str = "stn_zone_id";
    pub const CODE: &str = "STATIONCODE";
    pub const NAME: &str = "STATIONNAME";
}

// ── Flow categories by TLC pair ─────────────────────────────────────────────
pub mod flow {
    pub const FROM_CODE: &str = "FromCaseZoneID";
    pub const TO_CODE: &str = "ToCaseZoneID";
    pub const CATEGORY_ID: &str = "FlowCatID";
    pub const CATEGORY_NAME: &str = "FlowCatName";
}

// ── Flow category → broad (non-distance) flow ───────────────────────────────
pub mod flow_lookup {
    pub const CATEGORY_NAME: &str = "FlowCatName";
    pub const NON_DISTANCE_FLOW: &str = "TAG_NonDist";
}

// ── Ticket-type splits ──────────────────────────────────────────────────────
pub mod ticket_split {
    pub const FLOW: &str = "TAG_Flow";
    pub const PURPOSE: &str = "Purpose";
    pub const FULL: &str = "F";
    pub const REDUCED: &str = "R";
    pub const SEASON: &str = "S";
}

// ── Growth factors ──────────────────────────────────────────────────────────
pub mod factor {
    pub const FROM_CODE: &str = "ZoneCodeFrom";
    pub const TO_CODE: &str = "ZoneCodeTo";
    pub const PURPOSE: &str = "purpose";
    pub const TICKET_TYPE: &str = "TicketType";
    pub const GROWTH_RATE: &str = "Demand_rate";
}

// ── Segment → user class ────────────────────────────────────────────────────
pub mod segment {
    pub const SEGMENT: &str = "MX";
    pub const USER_CLASS: &str = "userclass";
}

// ── Audit tables ────────────────────────────────────────────────────────────
pub mod audit {
    pub const MISSING_TICKET: &str = "Missing_TicketType";
    pub const AVAILABLE_TICKET: &str = "Available_TicketType";
    pub const INTERNAL: &str = "Internal";
    pub const DEMAND: &str = "T_Demand";
}
