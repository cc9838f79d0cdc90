use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Door service returned non-zero result: {0}")]
    NonZeroResult(i64),

    #[error("Unknown door status code: {0}")]
    UnknownDoorStatus(i64),

    #[error("Missing field in push payload: {0}")]
    MissingField(&'static str),

    #[error("Unrecognized push message type: {0}")]
    UnknownPushType(String),

    #[error("Unparseable event timestamp {0:?}: {1}")]
    InvalidTimestamp(String, chrono::ParseError),

    #[error("Observation at {observed} is older than last accepted event at {stored}")]
    OutOfOrder {
        observed: chrono::NaiveDateTime,
        stored: chrono::NaiveDateTime,
    },

    #[error("MQTT reconnect attempts exhausted after {0} retries")]
    ReconnectExhausted(u32),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Mqtt(#[from] rumqttc::ClientError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
