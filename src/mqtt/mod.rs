pub mod client;

use async_trait::async_trait;

use crate::error::Error;

/// An inbound message on one of the subscribed command topics.
#[derive(Debug, Clone)]
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
}

/// Delivers state values to the broker, retained and at least once.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, topic: &str, value: &str) -> Result<(), Error>;
}
