/// Sensor readings and extraction of the single value each sensor reports
use core::fmt::{self, Write as _};

use heapless::String;
use serde::Deserialize;
use thiserror::Error;

use crate::settings::bounded_text;

/// Size of the reading buffer in bytes
pub const READING_CAPACITY: usize = 5;

/// State the sensor API reports when an entity has no value
pub const SENSOR_UNAVAILABLE: &str = "unavailable";

/// Shown instead of a value the sensor cannot provide
pub const SENSOR_NO_VALUE: &str = "-.-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Inside,
    Outside,
}

impl SensorKind {
    pub const ALL: [SensorKind; 2] = [SensorKind::Inside, SensorKind::Outside];

    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Inside => "inside",
            SensorKind::Outside => "outside",
        }
    }
}

/// Last known value of one sensor, bounded to [`READING_CAPACITY`] bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading(String<READING_CAPACITY>);

impl SensorReading {
    pub fn no_value() -> Self {
        Self::from_text(SENSOR_NO_VALUE)
    }

    /// Copy `text` into the reading, truncating anything past the bound.
    pub fn from_text(text: &str) -> Self {
        Self(bounded_text(text))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn is_no_value(&self) -> bool {
        self.0.as_str() == SENSOR_NO_VALUE
    }

    /// Raw bytes for retention in memory that survives deep sleep
    pub fn to_retained(&self) -> [u8; READING_CAPACITY] {
        let mut raw = [0u8; READING_CAPACITY];
        let bytes = self.0.as_bytes();
        raw[..bytes.len()].copy_from_slice(bytes);
        raw
    }

    /// Restore a retained reading; anything unreadable becomes "no value".
    pub fn from_retained(raw: &[u8; READING_CAPACITY]) -> Self {
        let end = raw.iter().position(|b| *b == 0).unwrap_or(READING_CAPACITY);
        match core::str::from_utf8(&raw[..end]) {
            Ok(text) if !text.is_empty() => Self::from_text(text),
            _ => Self::no_value(),
        }
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::no_value()
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum ReadingError {
    #[error("sensor payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sensor payload has no temperature attribute")]
    MissingTemperature,
}

#[derive(Deserialize)]
struct StateBody {
    state: std::string::String,
}

#[derive(Deserialize)]
struct AttributesBody {
    #[serde(default)]
    state: Option<std::string::String>,
    #[serde(default)]
    attributes: Option<Attributes>,
}

#[derive(Deserialize)]
struct Attributes {
    #[serde(default)]
    temperature: Option<f64>,
}

/// Format a temperature as `xx.y`, cut to the reading bound.
pub fn format_temperature(value: f64) -> SensorReading {
    let mut formatted: String<32> = String::new();
    if write!(formatted, "{:.1}", value).is_err() {
        return SensorReading::no_value();
    }
    SensorReading::from_text(&formatted)
}

/// Extract the reading for `kind` from a sensor API response body.
///
/// The inside sensor reports its value as the top-level `state`, the outside
/// sensor as the `attributes.temperature` number. The unavailable state maps to
/// [`SENSOR_NO_VALUE`] for both.
pub fn parse_reading(kind: SensorKind, body: &[u8]) -> Result<SensorReading, ReadingError> {
    match kind {
        SensorKind::Inside => {
            let parsed: StateBody = serde_json::from_slice(body)?;
            if parsed.state.as_str() == SENSOR_UNAVAILABLE {
                Ok(SensorReading::no_value())
            } else {
                Ok(SensorReading::from_text(&parsed.state))
            }
        }
        SensorKind::Outside => {
            let parsed: AttributesBody = serde_json::from_slice(body)?;
            if parsed.state.as_deref() == Some(SENSOR_UNAVAILABLE) {
                return Ok(SensorReading::no_value());
            }
            parsed
                .attributes
                .and_then(|attributes| attributes.temperature)
                .map(format_temperature)
                .ok_or(ReadingError::MissingTemperature)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_inside_state_is_copied() {
        let reading = parse_reading(SensorKind::Inside, br#"{"state":"21.4","entity_id":"sensor.x"}"#).unwrap();
        assert_eq!(reading.as_str(), "21.4");
    }

    #[test]
    fn test_inside_state_is_truncated() {
        let reading = parse_reading(SensorKind::Inside, br#"{"state":"1234.5678"}"#).unwrap();
        assert_eq!(reading.as_str(), "1234.");
    }

    #[test]
    fn test_outside_temperature_is_formatted() {
        let body = br#"{"state":"sunny","attributes":{"temperature":-3.46,"humidity":80}}"#;
        let reading = parse_reading(SensorKind::Outside, body).unwrap();
        assert_eq!(reading.as_str(), "-3.5");
    }

    #[test]
    fn test_outside_without_temperature_is_an_error() {
        let body = br#"{"state":"sunny","attributes":{}}"#;
        assert!(matches!(
            parse_reading(SensorKind::Outside, body),
            Err(ReadingError::MissingTemperature)
        ));
    }

    #[test]
    fn test_malformed_body_is_an_error() {
        assert!(matches!(
            parse_reading(SensorKind::Inside, b"<html>"),
            Err(ReadingError::Json(_))
        ));
    }

    #[test]
    fn test_retained_round_trip() {
        let reading = SensorReading::from_text("21.5");
        assert_eq!(SensorReading::from_retained(&reading.to_retained()), reading);
        assert!(SensorReading::from_retained(&[0; READING_CAPACITY]).is_no_value());
        assert!(SensorReading::from_retained(&[0xFF; READING_CAPACITY]).is_no_value());
    }

    proptest! {
        #[test]
        fn unavailable_always_yields_no_value(kind in prop_oneof![Just(SensorKind::Inside), Just(SensorKind::Outside)]) {
            let reading = parse_reading(kind, br#"{"state":"unavailable","attributes":{}}"#).unwrap();
            prop_assert_eq!(reading.as_str(), SENSOR_NO_VALUE);
        }

        #[test]
        fn temperature_has_one_decimal_and_stays_bounded(value in -999.0f64..999.0) {
            let body = format!(r#"{{"attributes":{{"temperature":{}}}}}"#, value);
            let reading = parse_reading(SensorKind::Outside, body.as_bytes()).unwrap();
            prop_assert!(reading.as_str().len() <= READING_CAPACITY);

            if value.abs() < 99.0 {
                let (_, decimals) = reading.as_str().split_once('.').unwrap();
                prop_assert_eq!(decimals.len(), 1);
            }
        }

        #[test]
        fn any_state_text_stays_bounded(state in "[ -~]{0,40}") {
            let reading = SensorReading::from_text(&state);
            prop_assert!(reading.as_str().len() <= READING_CAPACITY);
            prop_assert!(state.starts_with(reading.as_str()));
        }
    }
}
