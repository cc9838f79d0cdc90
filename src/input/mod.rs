//! Input sources feeding the reconciler: HTTP polls and MQTT pushes.

pub mod http;
pub mod mqtt;
