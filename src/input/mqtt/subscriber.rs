//! Push channel orchestration.
//!
//! Glues the supervised MQTT client to the reconciler: every publish on
//! the change topic is decoded and reported as an observation. Keeps
//! MQTT internals out of main.rs.

use super::client::{LinkState, MqttClient, MqttMessage};
use super::push::parse_push;
use crate::config::MqttConfig;
use crate::state::Observation;
use log::{info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Owns the push-channel lifecycle.
pub struct PushSubscriber {
    config: MqttConfig,
}

impl PushSubscriber {
    pub fn new(config: MqttConfig) -> Self {
        Self { config }
    }

    /// Connect, subscribe, and forward decoded pushes to the reconciler.
    ///
    /// Returns the task handle (abort on shutdown) and a receiver for
    /// the link state, which ends in `GaveUp` once the reconnect budget
    /// is spent.
    pub fn start(
        self,
        observations: mpsc::Sender<Observation>,
    ) -> (JoinHandle<()>, watch::Receiver<LinkState>) {
        let (client, link) = MqttClient::new(&self.config);

        let handle = tokio::spawn(async move {
            info!(
                "Push subscriber connecting to {}:{} (topic {})",
                self.config.broker_host, self.config.broker_port, self.config.topic
            );

            let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);
            let event_loop = tokio::spawn(client.run(msg_tx));

            while let Some(msg) = msg_rx.recv().await {
                match parse_push(&msg.payload) {
                    Ok(obs) => {
                        if observations.send(obs).await.is_err() {
                            warn!("Reconciler channel closed, stopping push subscriber");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Push message dropped: {}", e);
                    }
                }
            }

            event_loop.abort();
        });

        (handle, link)
    }
}
