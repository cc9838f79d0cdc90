//! Garage bridge library.
//!
//! Reconciles a garage-door HTTP service and an MQTT push feed into one
//! shared snapshot of door state, temperature, humidity, and battery
//! health, and exposes the door toggle command.

pub mod config;
pub mod error;
pub mod input;
pub mod state;
