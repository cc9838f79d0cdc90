//! Merge rules for the two observation channels.
//!
//! The HTTP poller and the MQTT push feed both produce [`Observation`]s;
//! the reconciler is the single authority that folds them into one
//! [`SensorSnapshot`]. All mutation happens on one actor task, so the
//! presentation side can never see a torn update. Observations that
//! fail validation are dropped whole, leaving the snapshot untouched.

use super::snapshot::{DoorState, SensorSnapshot};
use crate::error::{BridgeError, Result};
use chrono::{Duration, Local, NaiveDateTime};
use log::{debug, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Fixed local-time pattern used by every `eventTime` field.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One observation from either input channel.
///
/// Poll responses carry an `eventTime`; broker pushes do not.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Door {
        status_code: i64,
        battery_low: bool,
        event_time: Option<String>,
    },
    Climate {
        temperature: f64,
        humidity: f64,
        battery_low: bool,
        event_time: Option<String>,
    },
}

/// Pure merge core. Takes `now` explicitly so the freshness window is
/// testable without a clock.
pub struct Reconciler {
    snapshot: SensorSnapshot,
    freshness_window: Duration,
}

impl Reconciler {
    pub fn new(freshness_window_mins: i64) -> Self {
        Self {
            snapshot: SensorSnapshot::default(),
            freshness_window: Duration::minutes(freshness_window_mins),
        }
    }

    /// The current merged view.
    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    /// Fold one observation into the snapshot, or reject it whole.
    pub fn apply(&mut self, observation: Observation, now: NaiveDateTime) -> Result<()> {
        match observation {
            Observation::Door {
                status_code,
                battery_low,
                event_time,
            } => self.apply_door(status_code, battery_low, event_time.as_deref(), now),
            Observation::Climate {
                temperature,
                humidity,
                battery_low,
                event_time,
            } => self.apply_climate(temperature, humidity, battery_low, event_time.as_deref(), now),
        }
    }

    /// Accept a door observation from either channel.
    ///
    /// Status code 1 maps to Closed and 0 to Open; anything else
    /// rejects the observation without touching a single field. The
    /// battery flag only lands together with an accepted status.
    pub fn apply_door(
        &mut self,
        status_code: i64,
        battery_low: bool,
        event_time: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<()> {
        let door = match status_code {
            1 => DoorState::Closed,
            0 => DoorState::Open,
            other => return Err(BridgeError::UnknownDoorStatus(other)),
        };
        let freshness = self.validate_event_time(event_time, now)?;

        self.snapshot.door = door;
        self.snapshot.door_battery_low = battery_low;
        self.record_event(freshness);
        debug!("Door observation accepted: {}", self.snapshot.door);
        Ok(())
    }

    /// Accept a climate observation from either channel.
    ///
    /// Temperature and humidity are rounded to integer display strings
    /// and land together with the battery flag as one unit.
    pub fn apply_climate(
        &mut self,
        temperature: f64,
        humidity: f64,
        battery_low: bool,
        event_time: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<()> {
        let freshness = self.validate_event_time(event_time, now)?;

        self.snapshot.temperature = format!("{temperature:.0}");
        self.snapshot.humidity = format!("{humidity:.0}");
        self.snapshot.temperature_battery_low = battery_low;
        self.record_event(freshness);
        debug!(
            "Climate observation accepted: {}deg / {}%",
            self.snapshot.temperature, self.snapshot.humidity
        );
        Ok(())
    }

    /// Parse an `eventTime` and decide whether it lies outside the
    /// freshness window. An unparseable timestamp is an error: the
    /// whole observation gets dropped rather than applied with a
    /// guessed freshness.
    pub fn evaluate_staleness(
        &self,
        event_time: &str,
        now: NaiveDateTime,
    ) -> Result<(NaiveDateTime, bool)> {
        let parsed = NaiveDateTime::parse_from_str(event_time, EVENT_TIME_FORMAT)
            .map_err(|e| BridgeError::InvalidTimestamp(event_time.to_string(), e))?;
        let stale = now.signed_duration_since(parsed) > self.freshness_window;
        Ok((parsed, stale))
    }

    /// Validate an optional `eventTime` before any field is touched.
    ///
    /// Observations older than the newest accepted event are rejected,
    /// so a delayed poll response cannot roll the view backwards.
    /// Pushes carry no timestamp and always pass.
    fn validate_event_time(
        &self,
        event_time: Option<&str>,
        now: NaiveDateTime,
    ) -> Result<Option<(NaiveDateTime, bool)>> {
        let Some(ts) = event_time else {
            return Ok(None);
        };
        let (observed, stale) = self.evaluate_staleness(ts, now)?;
        if let Some(stored) = self.snapshot.last_event
            && observed < stored
        {
            return Err(BridgeError::OutOfOrder { observed, stored });
        }
        Ok(Some((observed, stale)))
    }

    fn record_event(&mut self, freshness: Option<(NaiveDateTime, bool)>) {
        if let Some((observed, stale)) = freshness {
            self.snapshot.last_event = Some(observed);
            self.snapshot.stale = stale;
        }
    }
}

/// Handle to the reconciler actor task.
///
/// Writers clone the observation sender; readers subscribe to the
/// snapshot watch channel. Rejected observations are logged and
/// produce no snapshot change.
pub struct ReconcilerHandle {
    observations: mpsc::Sender<Observation>,
    snapshots: watch::Receiver<SensorSnapshot>,
    task: JoinHandle<()>,
}

impl ReconcilerHandle {
    /// Spawn the actor that owns the snapshot.
    pub fn spawn(freshness_window_mins: i64) -> Self {
        let (obs_tx, mut obs_rx) = mpsc::channel::<Observation>(64);
        let (snap_tx, snap_rx) = watch::channel(SensorSnapshot::default());

        let task = tokio::spawn(async move {
            let mut reconciler = Reconciler::new(freshness_window_mins);
            while let Some(observation) = obs_rx.recv().await {
                let now = Local::now().naive_local();
                match reconciler.apply(observation, now) {
                    Ok(()) => {
                        if snap_tx.send(reconciler.snapshot().clone()).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Observation dropped: {}", e);
                    }
                }
            }
            debug!("Reconciler task finished");
        });

        Self {
            observations: obs_tx,
            snapshots: snap_rx,
            task,
        }
    }

    /// Sender for the input channels to report observations into.
    pub fn sender(&self) -> mpsc::Sender<Observation> {
        self.observations.clone()
    }

    /// Subscribe to whole-snapshot updates.
    pub fn subscribe(&self) -> watch::Receiver<SensorSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SensorSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn abort(&self) {
        self.task.abort();
    }
}
