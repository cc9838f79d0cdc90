//! MQTT input source for broker-pushed state changes.

mod client;
mod push;
mod subscriber;

pub use client::{LinkState, MqttClient, MqttMessage, ReconnectPolicy};
pub use push::parse_push;
pub use subscriber::PushSubscriber;
