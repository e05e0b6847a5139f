use crate::bridge::Lifecycle;
use crate::neato::{DeviceError, UnknownVariant};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    #[error("failed to publish {topic}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: rumqttc::ClientError,
    },

    #[error("invalid start payload: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("no cached value for {0}")]
    MissingState(String),

    #[error("cached value for {key} is invalid: {source}")]
    InvalidState {
        key: String,
        #[source]
        source: UnknownVariant,
    },

    #[error("cannot {action} bridge while {state:?}")]
    Lifecycle {
        action: &'static str,
        state: Lifecycle,
    },
}
