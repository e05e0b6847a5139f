use std::sync::Arc;
use std::time::Duration;

use neato_to_mqtt::bridge::Bridge;
use neato_to_mqtt::config::Config;
use neato_to_mqtt::mqtt::MqttMessage;
use neato_to_mqtt::mqtt::client::MqttClient;
use neato_to_mqtt::neato::client::NucleoClient;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Starting neato-to-mqtt bridge (mqtt={}:{}, robot={}, root={})",
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.neato.name,
        config.topic_root(),
    );

    let robot = match NucleoClient::new(&config.neato) {
        Ok(robot) => robot,
        Err(e) => {
            error!("Failed to create Nucleo client: {}", e);
            std::process::exit(1);
        }
    };

    // Create MQTT client and spawn its event loop; commands arrive on mqtt_cmd_rx
    let (mqtt_cmd_tx, mut mqtt_cmd_rx) = mpsc::channel::<MqttMessage>(100);
    let mqtt_client = MqttClient::new(&config);
    let publisher = mqtt_client.publisher();
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(mqtt_cmd_tx).await;
    });

    let bridge = Arc::new(Bridge::new(
        config.topic_root(),
        robot,
        publisher,
        Duration::from_secs(config.neato.refresh_interval_secs),
    ));

    if let Err(e) = bridge.start().await {
        error!("Initial state publish failed: {}", e);
        mqtt_handle.abort();
        std::process::exit(1);
    }

    // Main loop: hand each command to its own task + handle shutdown
    loop {
        tokio::select! {
            msg = mqtt_cmd_rx.recv() => {
                let Some(msg) = msg else {
                    warn!("MQTT task ended, shutting down");
                    break;
                };
                let bridge = Arc::clone(&bridge);
                tokio::spawn(async move {
                    bridge.handle_message(&msg.topic, &msg.payload).await;
                });
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                break;
            }
            _ = async {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("Failed to register SIGTERM handler");
                sigterm.recv().await;
            } => {
                info!("Received SIGTERM, shutting down");
                break;
            }
        }
    }

    // Cleanup
    bridge.stop();
    mqtt_handle.abort();
    info!("neato-to-mqtt bridge stopped");
}
