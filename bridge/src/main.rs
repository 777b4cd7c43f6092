mod app_config;
mod classifier;
mod maybe_timer;
mod motion_sink;
mod presence;

use clap::Parser;
use log::{debug, info, trace, warn};
use motion_sink::MqttMotionSink;
use presence::{DeviceRegistry, PresenceTracker};
use presence_bridge_protocol::MotionEvent;
use rumqttc::{AsyncClient, Event, Packet, Publish, QoS};
use std::collections::HashMap;

#[derive(Debug, Parser)]
#[command(version = env!("VERSION"), about)]
struct Cli {
    /// Configuration file
    #[arg(short, long)]
    config: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    env_logger::init();

    let config = config::Config::builder()
        .add_source(config::File::with_name(&args.config))
        .build()?;
    let config = config.try_deserialize::<app_config::Config>()?;
    debug!("Thresholds: {:#?}", config.thresholds);
    debug!("Debounce: {:#?}", config.debounce);

    let (mqtt_client, mut mqtt_connection) = AsyncClient::new(config.mqtt.into(), 16);

    let device_ids: Vec<String> = config.devices.iter().map(|d| d.id.clone()).collect();

    let registry: HashMap<String, MqttMotionSink> = config
        .devices
        .into_iter()
        .map(|device| {
            info!("Registering sensor {} as \"{}\"", device.id, device.name);
            (
                device.id.clone(),
                MqttMotionSink::new(mqtt_client.clone(), device),
            )
        })
        .collect();

    let tracker = PresenceTracker::new(registry, config.thresholds, config.debounce);

    info!("Subscribing to MQTT topic: {}", config.ingest_topic);
    mqtt_client
        .subscribe(&config.ingest_topic, QoS::AtLeastOnce)
        .await?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Exiting");
                log_final_states(&tracker, &device_ids).await;
                break;
            }
            event = mqtt_connection.poll() => {
                trace!("MQTT event: {:?}", event);
                match event {
                    // The ingest filter is the only subscription and may contain wildcards
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if let Err(e) = handle_motion_message(&tracker, &msg) {
                            warn!("Failed to handle motion event on {}: {:?}", msg.topic, e);
                        }
                    },
                    Err(e) => warn!("MQTT error: {:?}", e),
                    _ => {}
                }
            }
        };
    }

    Ok(())
}

async fn log_final_states<R: DeviceRegistry>(tracker: &PresenceTracker<R>, device_ids: &[String]) {
    for id in device_ids {
        match tracker.motion_detected(id).await {
            Ok(Some(detected)) => info!("Sensor {} motion detected: {}", id, detected),
            Ok(None) => info!("Sensor {} never reported", id),
            Err(e) => warn!("Failed to get state of sensor {}: {:?}", id, e),
        }
    }
}

fn handle_motion_message<R: DeviceRegistry>(
    tracker: &PresenceTracker<R>,
    msg: &Publish,
) -> anyhow::Result<()> {
    let event: MotionEvent = serde_json::from_slice(&msg.payload)?;
    debug!(
        "Received motion event from {}: {:?}",
        event.device_id, event.data
    );

    tracker.on_reading(&event.device_id, event.data)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        classifier::Thresholds,
        motion_sink::testing::{drain, RecordingSink},
        presence::debounce::DebounceConfig,
    };

    #[tokio::test]
    async fn motion_message_reaches_device() {
        let (sink, mut rx) = RecordingSink::new();
        let tracker = PresenceTracker::new(
            HashMap::from([("ESP32-LD2410".to_owned(), sink)]),
            Thresholds::default(),
            DebounceConfig::default(),
        );

        let msg = Publish::new(
            "presence/motion",
            QoS::AtLeastOnce,
            r#"{"deviceId": "ESP32-LD2410", "data": {"movingDistance": 45, "movingSignal": 60}}"#,
        );
        handle_motion_message(&tracker, &msg).unwrap();

        assert_eq!(
            tracker.motion_detected("ESP32-LD2410").await.unwrap(),
            Some(true)
        );
        assert_eq!(drain(&mut rx), vec![true]);
    }

    #[tokio::test]
    async fn unknown_device_message_is_an_error() {
        let (sink, mut rx) = RecordingSink::new();
        let tracker = PresenceTracker::new(
            HashMap::from([("ESP32-LD2410".to_owned(), sink)]),
            Thresholds::default(),
            DebounceConfig::default(),
        );

        let msg = Publish::new(
            "presence/motion",
            QoS::AtLeastOnce,
            r#"{"deviceId": "nonexistent-device", "data": {"motionDetected": true}}"#,
        );

        assert!(handle_motion_message(&tracker, &msg).is_err());
        assert_eq!(
            tracker.motion_detected("nonexistent-device").await.unwrap(),
            None
        );
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_an_error() {
        let (sink, mut rx) = RecordingSink::new();
        let tracker = PresenceTracker::new(
            HashMap::from([("ESP32-LD2410".to_owned(), sink)]),
            Thresholds::default(),
            DebounceConfig::default(),
        );

        let msg = Publish::new("presence/motion", QoS::AtLeastOnce, "motion!");

        assert!(handle_motion_message(&tracker, &msg).is_err());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn message_on_wildcard_matched_topic_reaches_device() {
        let (sink, mut rx) = RecordingSink::new();
        let tracker = PresenceTracker::new(
            HashMap::from([("ESP32-LD2410".to_owned(), sink)]),
            Thresholds::default(),
            DebounceConfig::default(),
        );

        let msg = Publish::new(
            "presence/living-room/motion",
            QoS::AtLeastOnce,
            r#"{"deviceId": "ESP32-LD2410", "data": {"motionDetected": true}}"#,
        );
        handle_motion_message(&tracker, &msg).unwrap();

        assert_eq!(
            tracker.motion_detected("ESP32-LD2410").await.unwrap(),
            Some(true)
        );
        assert_eq!(drain(&mut rx), vec![true]);
    }
}
