use super::debounce::{DebounceConfig, DeviceState, PendingTimer};
use crate::{classifier::Thresholds, maybe_timer::MaybeTimer, motion_sink::MotionSink};
use anyhow::anyhow;
use log::{debug, warn};
use presence_bridge_protocol::Reading;
use std::sync::Arc;
use tokio::{
    sync::{
        mpsc::{self, error::TrySendError},
        oneshot,
    },
    time::Instant,
};

pub(crate) const QUEUE_DEPTH: usize = 16;

#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) thresholds: Thresholds,
    pub(crate) debounce: DebounceConfig,
}

enum Command {
    Reading(Reading),
    Snapshot(oneshot::Sender<DeviceState>),
}

/// The task behind this handle is the only writer of one device's state.
#[derive(Clone)]
pub(crate) struct DeviceHandle {
    tx: mpsc::Sender<Command>,
}

impl DeviceHandle {
    pub(crate) fn spawn<S: MotionSink>(device_id: String, settings: Arc<Settings>, sink: S) -> Self {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        tokio::spawn(run(device_id, settings, sink, rx));
        Self { tx }
    }

    /// Never waits, a backed up device must not hold up the caller.
    pub(crate) fn reading(&self, reading: Reading) -> anyhow::Result<()> {
        match self.tx.try_send(Command::Reading(reading)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(anyhow!("device queue full, reading dropped")),
            Err(TrySendError::Closed(_)) => Err(anyhow!("device task has stopped")),
        }
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    pub(crate) async fn snapshot(&self) -> anyhow::Result<DeviceState> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.tx
            .send(Command::Snapshot(reply_tx))
            .await
            .map_err(|_| anyhow!("device task has stopped"))?;

        Ok(reply_rx.await?)
    }
}

async fn run<S: MotionSink>(
    device_id: String,
    settings: Arc<Settings>,
    sink: S,
    mut rx: mpsc::Receiver<Command>,
) {
    let mut state = DeviceState::default();

    loop {
        let timer = MaybeTimer::at(state.timer().map(|t| t.deadline()));

        let change = tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Reading(reading)) => {
                    let detected = settings.thresholds.classify(&reading);
                    let change = state.handle_signal(&settings.debounce, detected, Instant::now());

                    debug!(
                        "Sensor {}: motion signal {}, {} consecutive no-motion, timer {:?}",
                        device_id,
                        detected,
                        state.no_motion_count(),
                        state.timer()
                    );

                    change
                }
                Some(Command::Snapshot(reply)) => {
                    // Asker may have given up, nothing to do about it
                    let _ = reply.send(state.clone());
                    None
                }
                None => break,
            },
            _ = timer => {
                match state.timer() {
                    Some(PendingTimer::Silence(_)) => {
                        debug!("Sensor {} went silent, forcing motion = false", device_id)
                    }
                    Some(PendingTimer::NoMotion(_)) => {
                        debug!("Sensor {}: no motion confirmed, setting false", device_id)
                    }
                    None => {}
                }

                state.handle_timer(Instant::now())
            }
        };

        if let Some(detected) = change {
            if let Err(e) = sink.set_motion_detected(detected) {
                warn!(
                    "Failed to set motion detected for sensor {} to {}, downstream may be stale until the next change: {:?}",
                    device_id, detected, e
                );
            }
        }
    }

    debug!("Stopped tracking sensor {}", device_id);
}
