//! The merged door/climate view published to readers.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Last known position of the garage door.
///
/// `Unknown` is the pre-first-observation placeholder and renders as
/// dashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum DoorState {
    Open,
    Closed,
    #[strum(serialize = "-----")]
    Unknown,
}

/// Current merged view of door and climate state.
///
/// Owned and mutated exclusively by the reconciler task; everyone else
/// sees whole cloned snapshots through a watch channel, never a
/// half-applied update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Display string, rounded to the nearest integer (e.g. "72").
    pub temperature: String,
    /// Display string, rounded to the nearest integer (e.g. "41").
    pub humidity: String,
    pub temperature_battery_low: bool,
    pub door_battery_low: bool,
    pub door: DoorState,
    /// True when the most recently accepted event timestamp is older
    /// than the freshness window. Recomputed on accept, never by timer.
    pub stale: bool,
    /// Timestamp of the newest accepted observation that carried one.
    pub last_event: Option<NaiveDateTime>,
}

impl Default for SensorSnapshot {
    fn default() -> Self {
        Self {
            temperature: "0".to_string(),
            humidity: "0".to_string(),
            temperature_battery_low: false,
            door_battery_low: false,
            door: DoorState::Unknown,
            stale: false,
            last_event: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_values() {
        let snapshot = SensorSnapshot::default();
        assert_eq!(snapshot.temperature, "0");
        assert_eq!(snapshot.humidity, "0");
        assert_eq!(snapshot.door, DoorState::Unknown);
        assert!(!snapshot.stale);
        assert!(snapshot.last_event.is_none());
    }

    #[test]
    fn door_state_display() {
        assert_eq!(DoorState::Open.to_string(), "Open");
        assert_eq!(DoorState::Closed.to_string(), "Closed");
        assert_eq!(DoorState::Unknown.to_string(), "-----");
    }
}
