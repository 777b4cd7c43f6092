pub(crate) mod debounce;
mod device;

use self::{
    debounce::{DebounceConfig, DeviceState},
    device::{DeviceHandle, Settings},
};
use crate::{classifier::Thresholds, motion_sink::MotionSink};
use anyhow::anyhow;
use log::{info, warn};
use presence_bridge_protocol::Reading;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

pub(crate) trait DeviceRegistry {
    type Sink: MotionSink;

    fn resolve(&self, device_id: &str) -> Option<Self::Sink>;
}

impl<S: MotionSink + Clone> DeviceRegistry for HashMap<String, S> {
    type Sink = S;

    fn resolve(&self, device_id: &str) -> Option<S> {
        self.get(device_id).cloned()
    }
}

/// Each device gets its own task the first time one of its readings arrives,
/// so devices never wait on each other. The table lock only covers looking up
/// or inserting a handle.
pub(crate) struct PresenceTracker<R> {
    registry: R,
    settings: Arc<Settings>,
    devices: Mutex<HashMap<String, DeviceHandle>>,
}

impl<R: DeviceRegistry> PresenceTracker<R> {
    pub(crate) fn new(registry: R, thresholds: Thresholds, debounce: DebounceConfig) -> Self {
        info!("Debouncing with {:?} policy", debounce.policy);

        Self {
            registry,
            settings: Arc::new(Settings {
                thresholds,
                debounce,
            }),
            devices: Mutex::new(HashMap::new()),
        }
    }

    /// Fails without touching any state if the registry does not know the
    /// device, or if that device's queue is full.
    pub(crate) fn on_reading(&self, device_id: &str, reading: Reading) -> anyhow::Result<()> {
        self.device(device_id)?.reading(reading)
    }

    /// `None` until a reading for the device has been accepted. Answered by
    /// the device's own task, so it reflects every reading fed before it.
    pub(crate) async fn snapshot(&self, device_id: &str) -> anyhow::Result<Option<DeviceState>> {
        let device = self.lock_devices()?.get(device_id).cloned();

        match device {
            Some(device) => Ok(Some(device.snapshot().await?)),
            None => Ok(None),
        }
    }

    pub(crate) async fn motion_detected(&self, device_id: &str) -> anyhow::Result<Option<bool>> {
        Ok(self
            .snapshot(device_id)
            .await?
            .map(|state| state.motion_detected()))
    }

    fn device(&self, device_id: &str) -> anyhow::Result<DeviceHandle> {
        let mut devices = self.lock_devices()?;

        if let Some(device) = devices.get(device_id) {
            if !device.is_stopped() {
                return Ok(device.clone());
            }
            warn!("Task for sensor {} has stopped, starting over", device_id);
        }

        let Some(sink) = self.registry.resolve(device_id) else {
            anyhow::bail!("no device registered for id {device_id}");
        };

        info!("Tracking new sensor {}", device_id);
        let device = DeviceHandle::spawn(device_id.to_owned(), self.settings.clone(), sink);
        devices.insert(device_id.to_owned(), device.clone());

        Ok(device)
    }

    fn lock_devices(
        &self,
    ) -> anyhow::Result<std::sync::MutexGuard<'_, HashMap<String, DeviceHandle>>> {
        self.devices
            .lock()
            .map_err(|_| anyhow!("device table lock poisoned"))
    }
}
