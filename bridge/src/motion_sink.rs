use log::info;
use rumqttc::{AsyncClient, QoS};
use serde::Deserialize;

/// Receives the debounced output of one device.
///
/// Only called when the stable output actually changes.
pub(crate) trait MotionSink: Send + Sync + 'static {
    fn set_motion_detected(&self, detected: bool) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct DeviceConfig {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) state_topic: String,
}

/// Publishes `on`/`off` to a device's state topic, in the same form an
/// ESPHome binary sensor uses.
#[derive(Clone)]
pub(crate) struct MqttMotionSink {
    mqtt_client: AsyncClient,
    config: DeviceConfig,
}

impl MqttMotionSink {
    pub(crate) fn new(mqtt_client: AsyncClient, config: DeviceConfig) -> Self {
        Self {
            mqtt_client,
            config,
        }
    }
}

impl MotionSink for MqttMotionSink {
    fn set_motion_detected(&self, detected: bool) -> anyhow::Result<()> {
        info!("Motion detected for {}: {}", self.config.name, detected);

        // Must not wait on the MQTT event loop, it may be blocked handing a
        // reading to this very device.
        self.mqtt_client.try_publish(
            &self.config.state_topic,
            QoS::AtLeastOnce,
            true,
            state_payload(detected),
        )?;

        Ok(())
    }
}

fn state_payload(detected: bool) -> &'static str {
    if detected {
        "on"
    } else {
        "off"
    }
}
