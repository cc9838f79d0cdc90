//! Shared snapshot state and the reconciler that owns it.
//!
//! Both input channels (HTTP poller, MQTT pushes) report observations
//! here; the presentation side only ever reads published snapshots.

pub mod reconciler;
pub mod snapshot;

pub use reconciler::{EVENT_TIME_FORMAT, Observation, Reconciler, ReconcilerHandle};
pub use snapshot::{DoorState, SensorSnapshot};
