use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, DATE};
use serde_json::{Value, json};
use sha2::Sha256;
use tracing::debug;

use crate::config::NeatoConfig;

use super::{DeviceError, Robot, RobotState, StartCleaningParameters};

type HmacSha256 = Hmac<Sha256>;

const NUCLEO_ACCEPT: &str = "application/vnd.neato.nucleo.v1";
const DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Nucleo messaging API client for a single robot.
pub struct NucleoClient {
    http: reqwest::Client,
    messages_url: String,
    serial_number: String,
    secret_key: String,
    next_req_id: AtomicU64,
}

impl NucleoClient {
    pub fn new(config: &NeatoConfig) -> Result<Self, DeviceError> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs));

        if let Some(pem) = &config.ca_cert_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }

        Ok(Self {
            http: builder.build()?,
            messages_url: format!(
                "{}/vendors/neato/robots/{}/messages",
                config.api_url.trim_end_matches('/'),
                config.serial_number
            ),
            serial_number: config.serial_number.clone(),
            secret_key: config.secret_key.clone(),
            next_req_id: AtomicU64::new(1),
        })
    }

    /// Send one signed message and return the decoded response body.
    async fn call(&self, command: &str, params: Option<Value>) -> Result<Value, DeviceError> {
        let req_id = self.next_req_id.fetch_add(1, Ordering::Relaxed);
        let mut message = json!({ "reqId": req_id.to_string(), "cmd": command });
        if let Some(params) = params {
            message["params"] = params;
        }
        let body = message.to_string();

        let date = Utc::now().format(DATE_FORMAT).to_string();
        let signature = sign(&self.secret_key, &self.serial_number, &date, &body)?;

        debug!("Nucleo request {}: {}", req_id, body);

        let response = self
            .http
            .post(&self.messages_url)
            .header(ACCEPT, NUCLEO_ACCEPT)
            .header(CONTENT_TYPE, "application/json")
            .header(DATE, &date)
            .header(AUTHORIZATION, format!("NEATOAPP {signature}"))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(_) if !status.is_success() => return Err(DeviceError::Status(status)),
            Err(source) => {
                return Err(DeviceError::InvalidResponse {
                    command: command.to_string(),
                    source,
                });
            }
        };

        match value.get("result").and_then(Value::as_str) {
            Some("ok") if status.is_success() => Ok(value),
            Some(result) => Err(DeviceError::Rejected {
                command: command.to_string(),
                result: result.to_string(),
            }),
            None if !status.is_success() => Err(DeviceError::Status(status)),
            None => Err(DeviceError::Rejected {
                command: command.to_string(),
                result: "missing result".to_string(),
            }),
        }
    }

    async fn command(&self, command: &str) -> Result<(), DeviceError> {
        self.call(command, None).await.map(|_| ())
    }
}

/// `NEATOAPP` signature over the lowercased serial, the `Date` header and the body.
pub fn sign(
    secret_key: &str,
    serial_number: &str,
    date: &str,
    body: &str,
) -> Result<String, DeviceError> {
    let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
        .map_err(|e| DeviceError::Signing(e.to_string()))?;
    let message = format!("{}\n{}\n{}", serial_number.to_lowercase(), date, body);
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

#[async_trait]
impl Robot for NucleoClient {
    async fn get_robot_state(&self) -> Result<RobotState, DeviceError> {
        let value = self.call("getRobotState", None).await?;
        serde_json::from_value(value).map_err(|source| DeviceError::InvalidResponse {
            command: "getRobotState".to_string(),
            source,
        })
    }

    async fn send_to_base(&self) -> Result<(), DeviceError> {
        self.command("sendToBase").await
    }

    async fn find_me(&self) -> Result<(), DeviceError> {
        self.command("findMe").await
    }

    async fn start_cleaning(&self, params: &StartCleaningParameters) -> Result<(), DeviceError> {
        self.call("startCleaning", Some(json!(params))).await.map(|_| ())
    }

    async fn stop_cleaning(&self) -> Result<(), DeviceError> {
        self.command("stopCleaning").await
    }

    async fn pause_cleaning(&self) -> Result<(), DeviceError> {
        self.command("pauseCleaning").await
    }

    async fn resume_cleaning(&self) -> Result<(), DeviceError> {
        self.command("resumeCleaning").await
    }

    async fn start_persistent_map_exploration(&self) -> Result<(), DeviceError> {
        self.command("startPersistentMapExploration").await
    }

    async fn enable_schedule(&self) -> Result<(), DeviceError> {
        self.command("enableSchedule").await
    }

    async fn disable_schedule(&self) -> Result<(), DeviceError> {
        self.command("disableSchedule").await
    }

    async fn dismiss_current_alert(&self) -> Result<(), DeviceError> {
        self.command("dismissCurrentAlert").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATE: &str = "Tue, 06 Mar 2018 12:00:00 GMT";

    #[test]
    fn signature_is_hex_sha256() {
        let sig = sign("secret", "OPS01234-ABCDEF", DATE, "{}").unwrap();
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn signature_ignores_serial_case() {
        let upper = sign("secret", "OPS01234-ABCDEF", DATE, "{}").unwrap();
        let lower = sign("secret", "ops01234-abcdef", DATE, "{}").unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn signature_covers_date_and_body() {
        let base = sign("secret", "serial", DATE, r#"{"cmd":"findMe"}"#).unwrap();
        let other_body = sign("secret", "serial", DATE, r#"{"cmd":"sendToBase"}"#).unwrap();
        let other_date = sign("secret", "serial", "Wed, 07 Mar 2018 12:00:00 GMT", r#"{"cmd":"findMe"}"#).unwrap();
        let other_key = sign("other", "serial", DATE, r#"{"cmd":"findMe"}"#).unwrap();
        assert_ne!(base, other_body);
        assert_ne!(base, other_date);
        assert_ne!(base, other_key);
    }
}
