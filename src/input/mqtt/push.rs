//! Push payload parsing for the change-notification topic.
//!
//! The broker publishes one JSON shape per domain, discriminated by a
//! free-form `type` string ("door_change", "temp_change", ...). A
//! message that cannot be fully decoded is rejected whole; pushes carry
//! no `eventTime`.

use crate::error::{BridgeError, Result};
use crate::state::Observation;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawPush {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    doorstatus: Option<i64>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    humidity: Option<f64>,
    #[serde(default)]
    battery: Option<i64>,
}

/// Decode one push message into an observation.
pub fn parse_push(payload: &str) -> Result<Observation> {
    let raw: RawPush = serde_json::from_str(payload)?;

    if raw.kind.contains("door") {
        let status_code = raw
            .doorstatus
            .ok_or(BridgeError::MissingField("doorstatus"))?;
        let battery = raw.battery.ok_or(BridgeError::MissingField("battery"))?;
        Ok(Observation::Door {
            status_code,
            battery_low: battery != 0,
            event_time: None,
        })
    } else if raw.kind.contains("temp") {
        let temperature = raw
            .temperature
            .ok_or(BridgeError::MissingField("temperature"))?;
        let humidity = raw.humidity.ok_or(BridgeError::MissingField("humidity"))?;
        let battery = raw.battery.ok_or(BridgeError::MissingField("battery"))?;
        Ok(Observation::Climate {
            temperature,
            humidity,
            battery_low: battery != 0,
            event_time: None,
        })
    } else {
        Err(BridgeError::UnknownPushType(raw.kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn door_push_maps_status_and_battery() {
        let obs = parse_push(r#"{"type":"door_change","doorstatus":1,"battery":1}"#).unwrap();
        assert_eq!(
            obs,
            Observation::Door {
                status_code: 1,
                battery_low: true,
                event_time: None,
            }
        );
    }

    #[test]
    fn temp_push_maps_climate_fields() {
        let obs =
            parse_push(r#"{"type":"temp_change","temperature":72.4,"humidity":41.0,"battery":0}"#)
                .unwrap();
        assert_eq!(
            obs,
            Observation::Climate {
                temperature: 72.4,
                humidity: 41.0,
                battery_low: false,
                event_time: None,
            }
        );
    }

    #[test]
    fn type_match_is_substring_based() {
        assert!(parse_push(r#"{"type":"garage_door","doorstatus":0,"battery":0}"#).is_ok());
    }

    #[test]
    fn missing_field_rejects_message() {
        let err = parse_push(r#"{"type":"door_change","battery":1}"#).unwrap_err();
        assert!(matches!(err, BridgeError::MissingField("doorstatus")));

        let err = parse_push(r#"{"type":"temp_change","temperature":70.0,"battery":0}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::MissingField("humidity")));
    }

    #[test]
    fn mistyped_field_rejects_message() {
        let err = parse_push(r#"{"type":"door_change","doorstatus":"open","battery":0}"#)
            .unwrap_err();
        assert!(matches!(err, BridgeError::SerdeJsonError(_)));
    }

    #[test]
    fn unknown_type_rejects_message() {
        let err = parse_push(r#"{"type":"lights","doorstatus":1,"battery":0}"#).unwrap_err();
        assert!(matches!(err, BridgeError::UnknownPushType(_)));
    }

    #[test]
    fn malformed_json_rejects_message() {
        assert!(parse_push("not json").is_err());
    }
}
