use garage_bridge::config::{self, Config};
use garage_bridge::input::http::Poller;
use garage_bridge::input::mqtt::{LinkState, PushSubscriber};
use garage_bridge::state::ReconcilerHandle;
use log::{error, info, warn};
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main]
async fn main() {
    init_logger();
    config::load_dotenv();
    info!("Starting garage bridge");

    let config = Config::from_env();
    info!("Configuration loaded:");
    info!("  Door service: {}", config.http.base_url);
    info!(
        "  Broker: {}:{} (topic {})",
        config.mqtt.broker_host, config.mqtt.broker_port, config.mqtt.topic
    );
    info!("  Freshness window: {} min", config.freshness_window_mins);
    info!("  Poll interval: {} s", config.poll_interval_secs);

    let reconciler = ReconcilerHandle::spawn(config.freshness_window_mins);
    let observations = reconciler.sender();
    let cancel = CancellationToken::new();

    // Push channel
    let (push_task, mut link) = PushSubscriber::new(config.mqtt.clone()).start(observations.clone());

    let link_cancel = cancel.clone();
    let link_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = link_cancel.cancelled() => break,
                changed = link.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match *link.borrow_and_update() {
                        LinkState::Connected => info!("Push feed connected"),
                        LinkState::Connecting => {}
                        LinkState::Disconnected => warn!("Push feed stopped, polls remain the only input"),
                        LinkState::GaveUp => {
                            error!("Push feed gave up after spending its reconnect budget")
                        }
                    }
                }
            }
        }
    });

    // Presentation surface: log every published snapshot.
    let mut snapshots = reconciler.subscribe();
    let display_cancel = cancel.clone();
    let display_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = display_cancel.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let s = snapshots.borrow_and_update().clone();
                    info!(
                        "Door {} | {} deg / {} % | stale: {}",
                        s.door, s.temperature, s.humidity, s.stale
                    );
                    if s.temperature_battery_low {
                        warn!("Low temp/humidity sensor battery");
                    }
                    if s.door_battery_low {
                        warn!("Low tilt sensor battery");
                    }
                }
            }
        }
    });

    // Startup refresh, then the scheduled re-poll.
    let poller = Poller::new(config.http.clone());
    let poll_cancel = cancel.clone();
    let poll_interval = config.poll_interval_secs;
    let poll_task = tokio::spawn(async move {
        poller.refresh_into(&observations).await;
        if poll_interval == 0 {
            return;
        }
        let mut interval = tokio::time::interval(Duration::from_secs(poll_interval));
        // The immediate first tick is the startup refresh above.
        interval.tick().await;
        loop {
            tokio::select! {
                _ = poll_cancel.cancelled() => break,
                _ = interval.tick() => {
                    poller.refresh_into(&observations).await;
                }
            }
        }
    });

    info!("Garage bridge is running, press Ctrl+C to exit");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal");
        }
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
        }
    }

    cancel.cancel();
    push_task.abort();
    let _ = poll_task.await;
    let _ = display_task.await;
    let _ = link_task.await;
    reconciler.abort();

    info!("Garage bridge stopped");
}
