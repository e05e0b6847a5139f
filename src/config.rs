use std::env;

use crate::error::Error;

pub const DEFAULT_API_URL: &str = "https://nucleo.neatocloud.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub neato: NeatoConfig,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub topic_prefix: String,
    pub client_id: String,
    pub use_tls: bool,
    /// PEM CA bundle for the broker; platform roots are used when absent
    pub ca_cert_pem: Option<Vec<u8>>,
    pub client_cert_pem: Option<Vec<u8>>,
    pub client_key_pem: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct NeatoConfig {
    pub name: String,
    /// Sanitized name for use in MQTT topics (lowercase, spaces to underscores)
    pub topic_name: String,
    pub serial_number: String,
    pub secret_key: String,
    pub refresh_interval_secs: u64,
    pub api_url: String,
    pub request_timeout_secs: u64,
    pub ca_cert_pem: Option<Vec<u8>>,
}

struct Vars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    fn required(&self, key: &str) -> Result<String, Error> {
        self.optional(key)
            .ok_or_else(|| Error::Config(format!("{key} environment variable is required")))
    }

    fn optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    fn or_default<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, Error> {
        match self.optional(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}"))),
            None => Ok(default),
        }
    }

    /// Contents of the file named by `key`, if set.
    fn file(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match self.optional(key) {
            Some(path) => std::fs::read(&path)
                .map(Some)
                .map_err(|e| Error::Config(format!("Failed to read {key} ({path}): {e}"))),
            None => Ok(None),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let vars = Vars { lookup };

        let name = vars.required("NEATO_NAME")?;
        let topic_name = sanitize_topic_name(&name);

        let config = Self {
            mqtt: MqttConfig {
                broker_host: vars.required("MQTT_BROKER_HOST")?,
                broker_port: vars.or_default("MQTT_BROKER_PORT", 1883)?,
                username: vars.optional("MQTT_USERNAME"),
                password: vars.optional("MQTT_PASSWORD"),
                topic_prefix: vars.or_default("MQTT_TOPIC_PREFIX", "neato".to_string())?,
                client_id: vars.or_default("MQTT_CLIENT_ID", "neato-to-mqtt".to_string())?,
                use_tls: vars.or_default("MQTT_USE_TLS", false)?,
                ca_cert_pem: vars.file("MQTT_CA_CERT")?,
                client_cert_pem: vars.file("MQTT_CLIENT_CERT")?,
                client_key_pem: vars.file("MQTT_CLIENT_KEY")?,
            },
            neato: NeatoConfig {
                name,
                topic_name,
                serial_number: vars.required("NEATO_SERIAL_NUMBER")?,
                secret_key: vars.required("NEATO_SECRET_KEY")?,
                refresh_interval_secs: vars.or_default("NEATO_REFRESH_INTERVAL_SECS", 30)?,
                api_url: vars.or_default("NEATO_API_URL", DEFAULT_API_URL.to_string())?,
                request_timeout_secs: vars.or_default("NEATO_REQUEST_TIMEOUT_SECS", 10)?,
                ca_cert_pem: vars.file("NEATO_CA_CERT")?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.neato.topic_name.is_empty() {
            return Err(Error::Config(
                "NEATO_NAME must contain at least one alphanumeric character".into(),
            ));
        }
        if self.neato.refresh_interval_secs == 0 {
            return Err(Error::Config("NEATO_REFRESH_INTERVAL_SECS must be > 0".into()));
        }
        if self.neato.request_timeout_secs == 0 {
            return Err(Error::Config("NEATO_REQUEST_TIMEOUT_SECS must be > 0".into()));
        }

        let mqtt = &self.mqtt;
        if mqtt.client_cert_pem.is_some() != mqtt.client_key_pem.is_some() {
            return Err(Error::Config(
                "MQTT_CLIENT_CERT and MQTT_CLIENT_KEY must be set together".into(),
            ));
        }
        let has_tls_files = mqtt.ca_cert_pem.is_some() || mqtt.client_cert_pem.is_some();
        if has_tls_files && !mqtt.use_tls {
            return Err(Error::Config(
                "MQTT_CA_CERT, MQTT_CLIENT_CERT and MQTT_CLIENT_KEY require MQTT_USE_TLS=true"
                    .into(),
            ));
        }
        // rumqttc only takes a client identity together with an explicit CA
        if mqtt.client_cert_pem.is_some() && mqtt.ca_cert_pem.is_none() {
            return Err(Error::Config("MQTT_CLIENT_CERT requires MQTT_CA_CERT".into()));
        }
        Ok(())
    }

    /// Root of every topic owned by this robot: `{prefix}/{topic_name}`.
    pub fn topic_root(&self) -> String {
        format!("{}/{}", self.mqtt.topic_prefix, self.neato.topic_name)
    }

    pub fn status_topic(&self) -> String {
        format!("{}/status", self.topic_root())
    }

    pub fn command_filter(&self) -> String {
        format!("{}/+/set", self.topic_root())
    }
}

/// Convert a robot name into a safe MQTT topic segment.
/// "Living Room" → "living_room"
fn sanitize_topic_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect::<String>()
        .trim_matches('_')
        .to_string()
}
