use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::{de, Deserialize, Deserializer};

/// SOG reported as "not available"
pub const SOG_NOT_AVAILABLE: f64 = 102.3;
/// SOG reported as 102.2 knots or faster
pub const SOG_FAST: f64 = 102.2;
pub const COG_NOT_AVAILABLE: f64 = 360.0;
pub const HEADING_NOT_AVAILABLE: f64 = 511.0;

const OUTPUT_TIME_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(from = "String")]
pub enum NavigationalStatus {
    UnderWayUsingEngine,
    AtAnchor,
    NotUnderCommand,
    RestrictedManeuverability,
    ConstrainedByDraught,
    Moored,
    Aground,
    EngagedInFishing,
    UnderWaySailing,
    /// Codes 9-13
    Reserved(u8),
    AisSart,
    Undefined,
    Other(String),
}

impl NavigationalStatus {
    pub fn code(&self) -> Option<u8> {
        let code = match self {
            NavigationalStatus::UnderWayUsingEngine => 0,
            NavigationalStatus::AtAnchor => 1,
            NavigationalStatus::NotUnderCommand => 2,
            NavigationalStatus::RestrictedManeuverability => 3,
            NavigationalStatus::ConstrainedByDraught => 4,
            NavigationalStatus::Moored => 5,
            NavigationalStatus::Aground => 6,
            NavigationalStatus::EngagedInFishing => 7,
            NavigationalStatus::UnderWaySailing => 8,
            NavigationalStatus::Reserved(code) => *code,
            NavigationalStatus::AisSart => 14,
            NavigationalStatus::Undefined => 15,
            NavigationalStatus::Other(_) => return None,
        };
        Some(code)
    }
}

impl From<String> for NavigationalStatus {
    fn from(token: String) -> Self {
        match token.trim() {
            "0" | "Under way using engine" => NavigationalStatus::UnderWayUsingEngine,
            "1" | "At anchor" => NavigationalStatus::AtAnchor,
            "2" | "Not under command" => NavigationalStatus::NotUnderCommand,
            "3" | "Restricted maneuverability" => NavigationalStatus::RestrictedManeuverability,
            "4" | "Constrained by her draught" => NavigationalStatus::ConstrainedByDraught,
            "5" | "Moored" => NavigationalStatus::Moored,
            "6" | "Aground" => NavigationalStatus::Aground,
            "7" | "Engaged in fishing" => NavigationalStatus::EngagedInFishing,
            "8" | "Under way sailing" => NavigationalStatus::UnderWaySailing,
            "14" | "AIS-SART" => NavigationalStatus::AisSart,
            "15" | "Unknown value" | "Not defined" => NavigationalStatus::Undefined,
            other => match other.parse::<u8>() {
                Ok(code @ 9..=13) => NavigationalStatus::Reserved(code),
                _ => NavigationalStatus::Other(other.to_string()),
            },
        }
    }
}

impl From<NavigationalStatus> for String {
    fn from(status: NavigationalStatus) -> Self {
        match status {
            NavigationalStatus::Other(text) => text,
            known => known.code().map(|c| c.to_string()).unwrap_or_default(),
        }
    }
}

// timestamp,message_id,mmsi,navigational_status,sog,cog,true_heading,
// latitude,longitude,position_accuracy
// example: 20150801_000312,1,316001234,0,12.3,271.5,270,49.0012,-123.2201,1
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PositionReport {
    #[serde(deserialize_with = "de_timestamp")]
    pub timestamp: DateTime<Utc>,
    pub message_id: String,
    pub mmsi: String,
    pub navigational_status: NavigationalStatus,
    #[serde(deserialize_with = "de_sog")]
    pub speed_over_ground: f64,
    #[serde(deserialize_with = "de_cog")]
    pub course_over_ground: f64,
    #[serde(deserialize_with = "de_heading")]
    pub true_heading: f64,
    #[serde(deserialize_with = "de_coordinate")]
    pub latitude: f64,
    #[serde(deserialize_with = "de_coordinate")]
    pub longitude: f64,
    pub position_accuracy: String,
}

impl PositionReport {
    /// A position-only report with every kinematic field marked unavailable.
    pub fn new(timestamp: DateTime<Utc>, mmsi: &str, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            message_id: "1".to_string(),
            mmsi: mmsi.to_string(),
            navigational_status: NavigationalStatus::UnderWayUsingEngine,
            speed_over_ground: SOG_NOT_AVAILABLE,
            course_over_ground: COG_NOT_AVAILABLE,
            true_heading: HEADING_NOT_AVAILABLE,
            latitude,
            longitude,
            position_accuracy: "0".to_string(),
        }
    }

    pub fn with_status(mut self, status: NavigationalStatus) -> Self {
        self.navigational_status = status;
        self
    }

    /// `(longitude, latitude)`, the argument order of the geodesy functions.
    pub fn lon_lat(&self) -> (f64, f64) {
        (self.longitude, self.latitude)
    }

    pub fn epoch_seconds(&self) -> i64 {
        self.timestamp.timestamp()
    }

    /// Strict bounds: 90 and 180 are vendor sentinels for "unavailable".
    pub fn is_coordinate_valid(&self) -> bool {
        self.latitude.abs() < 90.0 && self.longitude.abs() < 180.0
    }

    /// The report's fields as text, in input column order.
    pub fn to_fields(&self) -> Vec<String> {
        vec![
            self.timestamp.format(OUTPUT_TIME_FORMAT).to_string(),
            self.message_id.clone(),
            self.mmsi.clone(),
            String::from(self.navigational_status.clone()),
            self.speed_over_ground.to_string(),
            self.course_over_ground.to_string(),
            self.true_heading.to_string(),
            format_coordinate(self.latitude),
            format_coordinate(self.longitude),
            self.position_accuracy.clone(),
        ]
    }
}

fn format_coordinate(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        "n/a".to_string()
    }
}

fn is_missing(token: &str) -> bool {
    matches!(token.trim(), "n/a" | "None" | "")
}

/// Parse `%Y%m%d_%H%M%S` or `%Y%m%dT%H%M%S.fffZ`, truncated to whole seconds.
pub fn parse_timestamp(token: &str) -> Option<DateTime<Utc>> {
    let token = token.trim();
    let naive = if token.contains('_') {
        NaiveDateTime::parse_from_str(token, "%Y%m%d_%H%M%S").ok()?
    } else if token.contains('T') {
        NaiveDateTime::parse_from_str(token, "%Y%m%dT%H%M%S%.fZ").ok()?
    } else {
        return None;
    };
    let naive = naive.with_nanosecond(0)?;
    Some(Utc.from_utc_datetime(&naive))
}

fn parse_number<E: de::Error>(token: &str) -> Result<f64, E> {
    token
        .trim()
        .parse::<f64>()
        .map_err(|_| E::custom(format!("unparseable number '{}'", token)))
}

fn de_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let token = String::deserialize(deserializer)?;
    parse_timestamp(&token)
        .ok_or_else(|| de::Error::custom(format!("unrecognized date/time format '{}'", token)))
}

fn de_sog<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let token = String::deserialize(deserializer)?;
    if is_missing(&token) {
        Ok(SOG_NOT_AVAILABLE)
    } else if token.trim() == "fast" {
        Ok(SOG_FAST)
    } else {
        parse_number(&token)
    }
}

fn de_cog<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let token = String::deserialize(deserializer)?;
    if is_missing(&token) {
        Ok(COG_NOT_AVAILABLE)
    } else {
        parse_number(&token)
    }
}

fn de_heading<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let token = String::deserialize(deserializer)?;
    if is_missing(&token) {
        Ok(HEADING_NOT_AVAILABLE)
    } else {
        parse_number(&token)
    }
}

// Missing coordinates become NaN so they fail the coordinate check downstream.
fn de_coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let token = String::deserialize(deserializer)?;
    if is_missing(&token) {
        Ok(f64::NAN)
    } else {
        parse_number(&token)
    }
}
