use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, QoS, TlsConfiguration,
    Transport,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::{Config, MqttConfig};
use crate::error::Error;

use super::{MqttMessage, Publisher};

pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
    status_topic: String,
    command_filter: String,
}

impl MqttClient {
    pub fn new(config: &Config) -> Self {
        let mut mqttopts = MqttOptions::new(
            &config.mqtt.client_id,
            &config.mqtt.broker_host,
            config.mqtt.broker_port,
        );
        mqttopts.set_keep_alive(Duration::from_secs(30));
        mqttopts.set_transport(transport(&config.mqtt));

        if let (Some(user), Some(pass)) = (&config.mqtt.username, &config.mqtt.password) {
            mqttopts.set_credentials(user, pass);
        }

        // LWT: the broker publishes "offline" for us if the connection drops.
        let status_topic = config.status_topic();
        mqttopts.set_last_will(LastWill::new(
            &status_topic,
            "offline".as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
        ));

        let (client, eventloop) = AsyncClient::new(mqttopts, 100);

        Self {
            client,
            eventloop,
            status_topic,
            command_filter: config.command_filter(),
        }
    }

    /// Handle for publishing state while the event loop runs elsewhere.
    pub fn publisher(&self) -> MqttPublisher {
        MqttPublisher::new(self.client.clone())
    }

    /// Run the MQTT event loop. On every connect, marks the robot online and
    /// (re)subscribes to its command topics; forwards incoming publishes
    /// through command_tx.
    pub async fn run(mut self, command_tx: mpsc::Sender<MqttMessage>) {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("Connected to MQTT broker");

                    if let Err(e) = self
                        .client
                        .publish(&self.status_topic, QoS::AtLeastOnce, true, "online")
                        .await
                    {
                        error!("Failed to publish online status: {}", e);
                    }

                    if let Err(e) = self
                        .client
                        .subscribe(&self.command_filter, QoS::AtLeastOnce)
                        .await
                    {
                        error!("Failed to subscribe to {}: {}", self.command_filter, e);
                    }
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    let msg = MqttMessage {
                        topic: publish.topic.clone(),
                        payload: String::from_utf8_lossy(&publish.payload).to_string(),
                    };
                    if command_tx.send(msg).await.is_err() {
                        warn!("Command channel closed");
                        return;
                    }
                }
                Ok(event) => debug!("MQTT event: {:?}", event),
                Err(e) => {
                    error!("MQTT connection error: {}. Reconnecting...", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }
        }
    }
}

/// Plain TCP unless TLS is enabled. Without a CA file the platform roots are used.
fn transport(config: &MqttConfig) -> Transport {
    if !config.use_tls {
        return Transport::Tcp;
    }
    let client_auth = config
        .client_cert_pem
        .clone()
        .zip(config.client_key_pem.clone());
    match &config.ca_cert_pem {
        Some(ca) => Transport::tls(ca.clone(), client_auth, None),
        None => Transport::tls_with_config(TlsConfiguration::default()),
    }
}

/// [`Publisher`] over a rumqttc client: retained, QoS 1.
#[derive(Clone)]
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    pub fn new(client: AsyncClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Publisher for MqttPublisher {
    async fn publish(&self, topic: &str, value: &str) -> Result<(), Error> {
        self.client
            .publish(topic, QoS::AtLeastOnce, true, value.as_bytes().to_vec())
            .await
            .map_err(|source| Error::Publish {
                topic: topic.to_string(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mqtt_config() -> MqttConfig {
        MqttConfig {
            broker_host: "broker.local".into(),
            broker_port: 8883,
            username: None,
            password: None,
            topic_prefix: "neato".into(),
            client_id: "neato-to-mqtt".into(),
            use_tls: false,
            ca_cert_pem: None,
            client_cert_pem: None,
            client_key_pem: None,
        }
    }

    #[test]
    fn plain_tcp_without_tls() {
        assert!(matches!(transport(&mqtt_config()), Transport::Tcp));
    }

    #[test]
    fn tls_with_ca_and_client_identity() {
        let config = MqttConfig {
            use_tls: true,
            ca_cert_pem: Some(b"ca".to_vec()),
            client_cert_pem: Some(b"cert".to_vec()),
            client_key_pem: Some(b"key".to_vec()),
            ..mqtt_config()
        };

        match transport(&config) {
            Transport::Tls(TlsConfiguration::Simple {
                ca,
                client_auth,
                alpn,
            }) => {
                assert_eq!(ca, b"ca");
                assert_eq!(client_auth, Some((b"cert".to_vec(), b"key".to_vec())));
                assert!(alpn.is_none());
            }
            _ => panic!("expected TLS with an explicit CA"),
        }
    }
}
