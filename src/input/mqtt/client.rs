//! MQTT client wrapper and connection supervisor for the push channel.
//!
//! Wraps the rumqttc event loop with a counted reconnect policy: I/O
//! failures and broker-initiated closes re-dial until the retry budget
//! is spent, refused connections and protocol errors stop immediately.
//! The link state, including the terminal give-up, is published on a
//! watch channel so the daemon can see a dead push feed.

use crate::config::MqttConfig;
use log::{debug, error, info, warn};
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Message received from the broker.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// Observable state of the broker link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Connecting,
    Connected,
    /// Stopped without retrying (refused or protocol error).
    Disconnected,
    /// Retry budget spent. Terminal: the feed stays dead.
    GaveUp,
}

/// Counted reconnect budget. One decision per qualifying disconnect;
/// the counter never resets, even across successful reconnects.
pub struct ReconnectPolicy {
    retries: u32,
    cap: u32,
}

impl ReconnectPolicy {
    pub fn new(cap: u32) -> Self {
        Self { retries: 0, cap }
    }

    /// Spend one retry if any remain.
    pub fn allow_retry(&mut self) -> bool {
        if self.retries >= self.cap {
            false
        } else {
            self.retries += 1;
            true
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn cap(&self) -> u32 {
        self.cap
    }
}

/// What to do with a failed poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Retry,
    Fatal,
}

/// Refused connections and protocol-level failures never re-dial;
/// everything else is a transient transport fault.
fn classify(error: &ConnectionError) -> Disposition {
    match error {
        ConnectionError::ConnectionRefused(_)
        | ConnectionError::MqttState(_)
        | ConnectionError::NotConnAck(_) => Disposition::Fatal,
        _ => Disposition::Retry,
    }
}

/// MQTT client for the push channel.
pub struct MqttClient {
    client: AsyncClient,
    event_loop: EventLoop,
    topic: String,
    policy: ReconnectPolicy,
    link: watch::Sender<LinkState>,
}

impl MqttClient {
    /// Create a new client from configuration. Returns the client and
    /// a receiver observing the link state.
    pub fn new(config: &MqttConfig) -> (Self, watch::Receiver<LinkState>) {
        let mut options =
            MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
        options.set_keep_alive(Duration::from_secs(30));

        // Set credentials if provided
        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            options.set_credentials(username, password);
        }

        let (client, event_loop) = AsyncClient::new(options, 100);
        let (link_tx, link_rx) = watch::channel(LinkState::Connecting);

        (
            Self {
                client,
                event_loop,
                topic: config.topic.clone(),
                policy: ReconnectPolicy::new(config.max_reconnects),
                link: link_tx,
            },
            link_rx,
        )
    }

    /// Run the event loop until the link dies, forwarding publishes to
    /// the provided channel.
    pub async fn run(mut self, tx: mpsc::Sender<MqttMessage>) {
        info!("Starting MQTT event loop");

        loop {
            match self.event_loop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    info!("MQTT connected, subscribing to {}", self.topic);
                    let _ = self.link.send(LinkState::Connected);
                    if let Err(e) = self.client.subscribe(&self.topic, QoS::AtMostOnce).await {
                        warn!("Failed to subscribe to {}: {}", self.topic, e);
                    }
                }
                Ok(Event::Incoming(Packet::SubAck(_))) => {
                    debug!("Subscription to {} acknowledged", self.topic);
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    let topic = publish.topic.clone();
                    let payload = match String::from_utf8(publish.payload.to_vec()) {
                        Ok(s) => s,
                        Err(e) => {
                            warn!("Invalid UTF-8 in MQTT payload: {}", e);
                            continue;
                        }
                    };

                    debug!("Received MQTT message on {}: {}", topic, payload);

                    let msg = MqttMessage { topic, payload };
                    if tx.send(msg).await.is_err() {
                        error!("MQTT message channel closed");
                        break;
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    // Broker-initiated close; the next poll surfaces the
                    // transport error and spends the retry there.
                    warn!("Broker closed the connection");
                }
                Ok(_) => {}
                Err(ConnectionError::RequestsDone) => {
                    debug!("MQTT request channel closed, stopping");
                    break;
                }
                Err(e) => match classify(&e) {
                    Disposition::Fatal => {
                        error!("MQTT connection failed, not retrying: {:?}", e);
                        let _ = self.link.send(LinkState::Disconnected);
                        break;
                    }
                    Disposition::Retry => {
                        if self.policy.allow_retry() {
                            warn!(
                                "MQTT connection error ({:?}), reconnect {} of {}",
                                e,
                                self.policy.retries(),
                                self.policy.cap()
                            );
                            let _ = self.link.send(LinkState::Connecting);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        } else {
                            error!(
                                "MQTT connection error ({:?}), retry budget of {} spent, giving up",
                                e,
                                self.policy.cap()
                            );
                            let _ = self.link.send(LinkState::GaveUp);
                            break;
                        }
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rumqttc::ConnectReturnCode;

    #[test]
    fn policy_spends_exactly_cap_retries() {
        let mut policy = ReconnectPolicy::new(9);
        for i in 1..=9 {
            assert!(policy.allow_retry(), "retry {} should be allowed", i);
        }
        // The tenth attempt never happens.
        assert!(!policy.allow_retry());
        assert!(!policy.allow_retry());
        assert_eq!(policy.retries(), 9);
    }

    #[test]
    fn policy_with_zero_cap_never_retries() {
        let mut policy = ReconnectPolicy::new(0);
        assert!(!policy.allow_retry());
        assert_eq!(policy.retries(), 0);
    }

    #[test]
    fn transport_faults_retry() {
        let io = ConnectionError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionAborted));
        assert_eq!(classify(&io), Disposition::Retry);
        assert_eq!(
            classify(&ConnectionError::NetworkTimeout),
            Disposition::Retry
        );
        assert_eq!(classify(&ConnectionError::FlushTimeout), Disposition::Retry);
    }

    #[test]
    fn refusals_do_not_retry() {
        let refused = ConnectionError::ConnectionRefused(ConnectReturnCode::BadUserNamePassword);
        assert_eq!(classify(&refused), Disposition::Fatal);
    }
}
