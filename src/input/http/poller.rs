//! HTTP poller for the door service.
//!
//! Stateless request/response helper over the three GET endpoints.
//! Every response is wrapped in a `Result` integer envelope; a non-zero
//! result or any decode failure discards the whole reading. There is no
//! retry or backoff here: polls happen only on explicit request or on
//! the daemon's schedule.

use crate::config::HttpConfig;
use crate::error::{BridgeError, Result};
use crate::state::Observation;
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::mpsc;

/// `GET /getTemp` response body.
#[derive(Debug, Deserialize)]
struct ClimateResponse {
    #[serde(rename = "Result")]
    result: i64,
    temperature: f64,
    humidity: f64,
    #[serde(rename = "eventTime")]
    event_time: String,
    batterylow: i64,
}

/// `GET /getDoorStatus` response body.
#[derive(Debug, Deserialize)]
struct DoorStatusResponse {
    #[serde(rename = "Result")]
    result: i64,
    status: i64,
    batterylow: i64,
    #[serde(rename = "eventTime")]
    event_time: String,
}

/// Thin wrapper around `reqwest::Client` for the door service.
pub struct Poller {
    http: reqwest::Client,
    config: HttpConfig,
}

impl Poller {
    pub fn new(config: HttpConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    /// Fetch the current temperature/humidity reading.
    pub async fn fetch_climate(&self) -> Result<Observation> {
        let url = self.config.climate_url();
        debug!("GET {}", url);
        let body: ClimateResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.result != 0 {
            return Err(BridgeError::NonZeroResult(body.result));
        }

        Ok(Observation::Climate {
            temperature: body.temperature,
            humidity: body.humidity,
            battery_low: body.batterylow != 0,
            event_time: Some(body.event_time),
        })
    }

    /// Fetch the current door position.
    pub async fn fetch_door(&self) -> Result<Observation> {
        let url = self.config.door_status_url();
        debug!("GET {}", url);
        let body: DoorStatusResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if body.result != 0 {
            return Err(BridgeError::NonZeroResult(body.result));
        }

        Ok(Observation::Door {
            status_code: body.status,
            battery_low: body.batterylow != 0,
            event_time: Some(body.event_time),
        })
    }

    /// Command the door to toggle. Fire-and-forget: only the HTTP
    /// status is checked, no body is parsed.
    pub async fn command_door(&self) -> Result<()> {
        let url = self.config.door_command_url();
        debug!("GET {}", url);
        self.http.get(&url).send().await?.error_for_status()?;
        Ok(())
    }

    /// Poll both endpoints and report whatever succeeds to the
    /// reconciler. Failed polls are logged and dropped, mirroring the
    /// per-endpoint drop rule.
    pub async fn refresh_into(&self, observations: &mpsc::Sender<Observation>) {
        match self.fetch_climate().await {
            Ok(obs) => {
                if observations.send(obs).await.is_err() {
                    warn!("Reconciler channel closed, climate reading lost");
                }
            }
            Err(e) => warn!("Climate poll dropped: {}", e),
        }
        match self.fetch_door().await {
            Ok(obs) => {
                if observations.send(obs).await.is_err() {
                    warn!("Reconciler channel closed, door reading lost");
                }
            }
            Err(e) => warn!("Door poll dropped: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn poller_for(server: &MockServer) -> Poller {
        Poller::new(HttpConfig {
            base_url: server.uri(),
        })
    }

    #[tokio::test]
    async fn climate_fetch_yields_observation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getTemp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": 0,
                "temperature": 72.4,
                "humidity": 41.0,
                "eventTime": "2026-08-31 10:00:00",
                "batterylow": 0
            })))
            .mount(&server)
            .await;

        let obs = poller_for(&server).fetch_climate().await.unwrap();
        assert_eq!(
            obs,
            Observation::Climate {
                temperature: 72.4,
                humidity: 41.0,
                battery_low: false,
                event_time: Some("2026-08-31 10:00:00".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn non_zero_result_discards_reading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getTemp"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": 1,
                "temperature": 72.4,
                "humidity": 41.0,
                "eventTime": "2026-08-31 10:00:00",
                "batterylow": 0
            })))
            .mount(&server)
            .await;

        let err = poller_for(&server).fetch_climate().await.unwrap_err();
        assert!(matches!(err, BridgeError::NonZeroResult(1)));
    }

    #[tokio::test]
    async fn missing_field_discards_reading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDoorStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": 0,
                "batterylow": 1
            })))
            .mount(&server)
            .await;

        let err = poller_for(&server).fetch_door().await.unwrap_err();
        assert!(matches!(err, BridgeError::Http(_)));
    }

    #[tokio::test]
    async fn door_fetch_carries_status_and_battery() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/getDoorStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": 0,
                "status": 1,
                "batterylow": 1,
                "eventTime": "2026-08-31 10:00:00"
            })))
            .mount(&server)
            .await;

        let obs = poller_for(&server).fetch_door().await.unwrap();
        assert_eq!(
            obs,
            Observation::Door {
                status_code: 1,
                battery_low: true,
                event_time: Some("2026-08-31 10:00:00".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn door_command_checks_http_status_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opendoor"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        poller_for(&server).command_door().await.unwrap();
    }

    #[tokio::test]
    async fn door_command_surfaces_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/opendoor"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = poller_for(&server).command_door().await.unwrap_err();
        assert!(matches!(err, BridgeError::Http(_)));
    }

    #[tokio::test]
    async fn refresh_drops_failures_and_forwards_successes() {
        let server = MockServer::start().await;
        // Climate endpoint broken, door endpoint healthy.
        Mock::given(method("GET"))
            .and(path("/getTemp"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/getDoorStatus"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Result": 0,
                "status": 0,
                "batterylow": 0,
                "eventTime": "2026-08-31 10:00:00"
            })))
            .mount(&server)
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        poller_for(&server).refresh_into(&tx).await;
        drop(tx);

        let forwarded: Vec<_> = {
            let mut v = Vec::new();
            while let Some(obs) = rx.recv().await {
                v.push(obs);
            }
            v
        };
        assert_eq!(forwarded.len(), 1);
        assert!(matches!(
            forwarded[0],
            Observation::Door { status_code: 0, .. }
        ));
    }
}
