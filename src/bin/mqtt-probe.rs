//! Test binary for the push channel.
//!
//! Usage:
//!   cargo run --bin mqtt-probe
//!
//! Connects to the broker under a throwaway client id, subscribes to
//! the change topic, and logs every push both raw and decoded. Runs
//! happily next to the main bridge.

use garage_bridge::config::{self, Config};
use garage_bridge::input::mqtt::{MqttClient, MqttMessage, parse_push};
use log::{info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

#[tokio::main]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config = Config::from_env();
    // Distinct client id so the broker doesn't kick the real bridge off
    config.mqtt.client_id = format!("garage-probe-{}", Uuid::new_v4().simple());

    info!(
        "Probing {}:{} topic {}",
        config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.topic
    );

    let (client, mut link) = MqttClient::new(&config.mqtt);
    let (msg_tx, mut msg_rx) = mpsc::channel::<MqttMessage>(64);

    let event_loop = tokio::spawn(client.run(msg_tx));

    let link_watch = tokio::spawn(async move {
        while link.changed().await.is_ok() {
            info!("Link state: {:?}", *link.borrow_and_update());
        }
    });

    while let Some(msg) = msg_rx.recv().await {
        match parse_push(&msg.payload) {
            Ok(obs) => info!("{} -> {:?}", msg.topic, obs),
            Err(e) => warn!("{} -> dropped ({}): {}", msg.topic, e, msg.payload),
        }
    }

    event_loop.abort();
    link_watch.abort();
    info!("Probe finished");
}
