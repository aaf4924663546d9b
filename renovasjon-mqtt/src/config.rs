//! Daemon configuration loaded once from a TOML file.

use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use url::{Host, Url};

use renovasjon_core::{
    DEFAULT_NONE_LABEL, DiscoverySettings, PropertyId, SyncSettings, WasteCategory,
};
use renovasjon_provider_time::UpstreamSettings;

const DEFAULT_UPDATE_INTERVAL_MS: u64 = 3_600_000;
const DEFAULT_MQTT_PORT: u16 = 1883;

/// Configuration error; always fatal at startup.
#[derive(Debug, Error)]
pub(crate) enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(&'static str),

    /// Field present but unusable
    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// MQTT connection settings as written in the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub(crate) struct MqttSettings {
    /// Broker URL, `mqtt://host:port` or `tcp://host:port`.
    pub(crate) broker: String,
    /// Optional user name; empty means anonymous.
    pub(crate) username: Option<String>,
    /// Password used together with `username`.
    pub(crate) password: Option<String>,
    /// MQTT client identifier.
    pub(crate) client_id: String,
    /// Keep-alive interval in seconds.
    pub(crate) keep_alive_secs: u64,
}

impl Default for MqttSettings {
    fn default() -> Self {
        Self {
            broker: String::from("mqtt://localhost:1883"),
            username: None,
            password: None,
            client_id: String::from("renovasjon-mqtt"),
            keep_alive_secs: 60,
        }
    }
}

impl MqttSettings {
    /// User name and password, if a non-empty user name is configured.
    pub(crate) fn credentials(&self) -> Option<(String, String)> {
        let username = self.username.as_deref().map(str::trim).filter(|name| !name.is_empty())?;
        Some((
            username.to_owned(),
            self.password.clone().unwrap_or_default(),
        ))
    }
}

/// Host and port of the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BrokerAddress {
    pub(crate) host: String,
    pub(crate) port: u16,
}

/// Property ids may be written as a TOML string or a bare integer.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPropertyId {
    Text(String),
    Number(u64),
}

impl RawPropertyId {
    fn into_text(self) -> String {
        match self {
            RawPropertyId::Text(text) => text,
            RawPropertyId::Number(number) => number.to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    property_id: Option<RawPropertyId>,
    update_interval_ms: Option<u64>,
    none_label: Option<String>,
    mqtt: MqttSettings,
    upstream: UpstreamSettings,
    discovery: DiscoverySettings,
    categories: Vec<WasteCategory>,
}

/// Validated daemon configuration.
#[derive(Debug, Clone)]
pub(crate) struct Config {
    pub(crate) property_id: PropertyId,
    pub(crate) poll_interval: Duration,
    pub(crate) none_label: String,
    pub(crate) mqtt: MqttSettings,
    pub(crate) broker: BrokerAddress,
    pub(crate) upstream: UpstreamSettings,
    pub(crate) discovery: DiscoverySettings,
    pub(crate) categories: Vec<WasteCategory>,
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub(crate) fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text.
    pub(crate) fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(contents)?;

        let property_id = raw
            .property_id
            .map(RawPropertyId::into_text)
            .map(|id| id.trim().to_owned())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingField("property_id"))?;

        let interval_ms = raw.update_interval_ms.unwrap_or(DEFAULT_UPDATE_INTERVAL_MS);
        if interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "update_interval_ms",
                reason: String::from("must be greater than zero"),
            });
        }

        let categories = if raw.categories.is_empty() {
            WasteCategory::reference_set()
        } else {
            raw.categories
        };
        validate_categories(&categories)?;

        let broker = parse_broker(&raw.mqtt.broker)?;

        Ok(Self {
            property_id: PropertyId(property_id),
            poll_interval: Duration::from_millis(interval_ms),
            none_label: raw
                .none_label
                .unwrap_or_else(|| DEFAULT_NONE_LABEL.to_owned()),
            mqtt: raw.mqtt,
            broker,
            upstream: raw.upstream,
            discovery: raw.discovery,
            categories,
        })
    }

    /// Settings handed to the sync scheduler.
    pub(crate) fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            property: self.property_id.clone(),
            categories: self.categories.clone(),
            interval: self.poll_interval,
            none_label: self.none_label.clone(),
            discovery: self.discovery.clone(),
        }
    }
}

fn validate_categories(categories: &[WasteCategory]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for category in categories {
        let sensor_id = category.sensor_id();
        if sensor_id.trim_matches('_').is_empty() {
            return Err(ConfigError::Invalid {
                field: "categories",
                reason: format!("category {:?} has no usable sensor id", category.name),
            });
        }
        if !seen.insert(sensor_id.clone()) {
            return Err(ConfigError::Invalid {
                field: "categories",
                reason: format!("sensor id {sensor_id} is used twice"),
            });
        }
    }
    Ok(())
}

fn parse_broker(raw: &str) -> Result<BrokerAddress, ConfigError> {
    let invalid = |reason: String| ConfigError::Invalid {
        field: "mqtt.broker",
        reason,
    };

    let url = Url::parse(raw.trim()).map_err(|err| invalid(err.to_string()))?;
    match url.scheme() {
        "mqtt" | "tcp" => {}
        other => return Err(invalid(format!("unsupported scheme {other}"))),
    }

    // IPv6 literals are bracketed in the URL but not in a socket address.
    let host = match url.host() {
        Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_owned(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        _ => return Err(invalid(String::from("missing host"))),
    };

    Ok(BrokerAddress {
        host,
        port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
    })
}
