//! Home Assistant MQTT discovery: topic layout and retained sensor configs.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::model::WasteCategory;
use crate::ports::{PublishError, Publisher};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Device all sensors are grouped under.
pub struct DeviceInfo {
    /// Stable device identifiers.
    pub identifiers: Vec<String>,
    /// Device display name.
    pub name: String,
    /// Manufacturer shown in the device card.
    pub manufacturer: String,
    /// Model shown in the device card.
    pub model: String,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            identifiers: vec![String::from("renovasjon_tomming")],
            name: String::from("Tømming"),
            manufacturer: String::from("Time Kommune"),
            model: String::from("Renovasjon"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
/// Topic layout and identity of the published sensors.
pub struct DiscoverySettings {
    /// Discovery prefix Home Assistant listens on.
    pub prefix: String,
    /// Node segment shared by all sensors.
    pub node_id: String,
    /// Prefix of every sensor `unique_id`.
    pub unique_id_prefix: String,
    /// Shared device metadata.
    pub device: DeviceInfo,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            prefix: String::from("homeassistant"),
            node_id: String::from("tomming"),
            unique_id_prefix: String::from("renovasjon"),
            device: DeviceInfo::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Topics belonging to one sensor.
pub struct SensorTopics {
    /// Retained discovery config.
    pub config: String,
    /// Plain state value.
    pub state: String,
    /// JSON attributes.
    pub attributes: String,
}

impl DiscoverySettings {
    /// Topics of the sensor with the given id.
    #[must_use]
    pub fn topics(&self, sensor_id: &str) -> SensorTopics {
        let base = format!("{}/sensor/{}/{sensor_id}", self.prefix, self.node_id);
        SensorTopics {
            config: format!("{base}/config"),
            state: format!("{base}/state"),
            attributes: format!("{base}/attributes"),
        }
    }
}

#[derive(Debug, Serialize)]
struct SensorConfig<'a> {
    name: &'a str,
    unique_id: String,
    state_topic: String,
    json_attributes_topic: String,
    icon: &'a str,
    device: &'a DeviceInfo,
}

/// Discovery payload for `category`.
///
/// # Errors
///
/// Returns a [`serde_json::Error`] if the payload cannot be serialized.
pub fn discovery_payload(
    settings: &DiscoverySettings,
    category: &WasteCategory,
) -> Result<String, serde_json::Error> {
    let sensor_id = category.sensor_id();
    let topics = settings.topics(&sensor_id);
    serde_json::to_string(&SensorConfig {
        name: &category.name,
        unique_id: format!("{}_{sensor_id}", settings.unique_id_prefix),
        state_topic: topics.state,
        json_attributes_topic: topics.attributes,
        icon: &category.icon,
        device: &settings.device,
    })
}

/// Announces every tracked category to Home Assistant.
#[derive(Debug, Clone)]
pub struct DiscoveryPublisher {
    settings: DiscoverySettings,
}

impl DiscoveryPublisher {
    /// Create a publisher for the given topic layout.
    #[must_use]
    pub fn new(settings: DiscoverySettings) -> Self {
        Self { settings }
    }

    /// Publish one retained config per category. Failures are logged and the
    /// remaining categories are still announced.
    pub async fn publish_all(&self, publisher: &dyn Publisher, categories: &[WasteCategory]) {
        for category in categories {
            match self.publish_one(publisher, category).await {
                Ok(()) => info!(category = %category.name, "published discovery config"),
                Err(err) => warn!(category = %category.name, %err, "discovery publish failed"),
            }
        }
    }

    async fn publish_one(
        &self,
        publisher: &dyn Publisher,
        category: &WasteCategory,
    ) -> Result<(), PublishError> {
        let payload = discovery_payload(&self.settings, category)
            .map_err(|err| PublishError::Bus(Box::new(err)))?;
        let topic = self.settings.topics(&category.sensor_id()).config;
        publisher.publish(&topic, payload, true).await
    }
}
