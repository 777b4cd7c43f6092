use crate::{
    classifier::Thresholds, motion_sink::DeviceConfig, presence::debounce::DebounceConfig,
};
use rand::{distributions::Alphanumeric, Rng};
use rumqttc::MqttOptions;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub(crate) struct Config {
    pub mqtt: MqttConfig,

    /// Topic filter the sensor nodes publish their JSON events under
    #[serde(default = "default_ingest_topic")]
    pub ingest_topic: String,

    #[serde(default)]
    pub thresholds: Thresholds,

    #[serde(default)]
    pub debounce: DebounceConfig,

    pub devices: Vec<DeviceConfig>,
}

fn default_ingest_topic() -> String {
    "presence/motion".into()
}

#[derive(Debug, Deserialize)]
pub(crate) struct MqttConfig {
    host: String,
    port: u16,

    username: Option<String>,
    password: Option<String>,
}

fn generate_client_id() -> String {
    let r: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(5)
        .map(char::from)
        .collect();
    format!("presence-bridge-{r}")
}

impl From<MqttConfig> for MqttOptions {
    fn from(value: MqttConfig) -> Self {
        let mut options = Self::new(generate_client_id(), value.host, value.port);
        if let Some(username) = value.username {
            options.set_credentials(username, value.password.unwrap_or_default());
        }
        options.set_keep_alive(Duration::from_secs(5));
        options
    }
}
