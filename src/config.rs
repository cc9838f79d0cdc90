use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Load environment variables from .env file with robust parsing.
/// Handles values with spaces without requiring quotes.
pub fn load_dotenv() {
    let env_path = Path::new(".env");
    if !env_path.exists() {
        return;
    }

    let content = match fs::read_to_string(env_path) {
        Ok(c) => c,
        Err(_) => return,
    };

    for line in content.lines() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Find the first '=' and split there
        if let Some(eq_pos) = line.find('=') {
            let key = line[..eq_pos].trim();
            let mut value = line[eq_pos + 1..].trim();

            // Remove surrounding quotes if present
            if (value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\''))
            {
                value = &value[1..value.len() - 1];
            }

            // Only set if not already set (env vars take precedence)
            if std::env::var(key).is_err() {
                // SAFETY: We're single-threaded at this point (called before any async runtime)
                unsafe { std::env::set_var(key, value) };
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub mqtt: MqttConfig,
    /// Minutes after which the last sensor event is considered stale.
    pub freshness_window_mins: i64,
    /// Seconds between scheduled polls of both HTTP endpoints. 0 disables.
    pub poll_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Base URL of the door service, e.g. "http://192.168.1.75:5000"
    pub base_url: String,
}

impl HttpConfig {
    pub fn climate_url(&self) -> String {
        format!("{}/getTemp", self.base_url.trim_end_matches('/'))
    }

    pub fn door_status_url(&self) -> String {
        format!("{}/getDoorStatus", self.base_url.trim_end_matches('/'))
    }

    pub fn door_command_url(&self) -> String {
        format!("{}/opendoor", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Topic carrying door/climate change pushes.
    pub topic: String,
    /// Reconnects allowed after the initial connect. Never resets.
    pub max_reconnects: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                base_url: "http://192.168.1.75:5000".to_string(),
            },
            mqtt: MqttConfig {
                broker_host: "192.168.1.75".to_string(),
                broker_port: 1883,
                client_id: "garage-bridge".to_string(),
                username: None,
                password: None,
                topic: "Changed".to_string(),
                max_reconnects: 9,
            },
            freshness_window_mins: 60,
            poll_interval_secs: 300,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("GARAGE_HTTP_BASE_URL") {
            config.http.base_url = url;
        }
        if let Ok(mins) = std::env::var("GARAGE_FRESHNESS_WINDOW_MINS")
            && let Ok(m) = mins.parse()
        {
            config.freshness_window_mins = m;
        }
        if let Ok(secs) = std::env::var("GARAGE_POLL_INTERVAL_SECS")
            && let Ok(s) = secs.parse()
        {
            config.poll_interval_secs = s;
        }

        // MQTT configuration
        if let Ok(host) = std::env::var("MQTT_BROKER_HOST") {
            config.mqtt.broker_host = host;
        }
        if let Ok(port) = std::env::var("MQTT_BROKER_PORT")
            && let Ok(p) = port.parse()
        {
            config.mqtt.broker_port = p;
        }
        if let Ok(client_id) = std::env::var("MQTT_CLIENT_ID") {
            config.mqtt.client_id = client_id;
        }
        if let Ok(username) = std::env::var("MQTT_USERNAME") {
            config.mqtt.username = Some(username);
        }
        if let Ok(password) = std::env::var("MQTT_PASSWORD") {
            config.mqtt.password = Some(password);
        }
        if let Ok(topic) = std::env::var("MQTT_TOPIC") {
            config.mqtt.topic = topic;
        }
        if let Ok(cap) = std::env::var("MQTT_MAX_RECONNECTS")
            && let Ok(c) = cap.parse()
        {
            config.mqtt.max_reconnects = c;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_from_base() {
        let http = HttpConfig {
            base_url: "http://10.0.0.5:5000/".to_string(),
        };
        assert_eq!(http.climate_url(), "http://10.0.0.5:5000/getTemp");
        assert_eq!(http.door_status_url(), "http://10.0.0.5:5000/getDoorStatus");
        assert_eq!(http.door_command_url(), "http://10.0.0.5:5000/opendoor");
    }

    #[test]
    fn defaults_match_deployed_service() {
        let config = Config::default();
        assert_eq!(config.mqtt.broker_port, 1883);
        assert_eq!(config.mqtt.topic, "Changed");
        assert_eq!(config.mqtt.max_reconnects, 9);
        assert_eq!(config.freshness_window_mins, 60);
    }
}
