use serde::Deserialize;
use std::{num::NonZeroU32, time::Duration};
use tokio::time::Instant;

const DEFAULT_NO_MOTION_THRESHOLD: NonZeroU32 = match NonZeroU32::new(3) {
    Some(v) => v,
    None => unreachable!(),
};

/// Every policy turns motion on at the first positive signal. They differ in
/// what it takes to turn it off again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub(crate) enum DebouncePolicy {
    SilenceTimeout,
    DualTimer,
    #[default]
    ConsecutiveCount,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct DebounceConfig {
    pub(crate) policy: DebouncePolicy,
    pub(crate) no_motion_threshold: NonZeroU32,

    /// Seconds
    pub(crate) motion_off_delay: u64,
    /// Seconds
    pub(crate) no_motion_delay: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            policy: DebouncePolicy::default(),
            no_motion_threshold: DEFAULT_NO_MOTION_THRESHOLD,
            motion_off_delay: 10,
            no_motion_delay: 5,
        }
    }
}

impl DebounceConfig {
    pub(crate) fn motion_off_delay(&self) -> Duration {
        Duration::from_secs(self.motion_off_delay)
    }

    pub(crate) fn no_motion_delay(&self) -> Duration {
        Duration::from_secs(self.no_motion_delay)
    }
}

/// Durations too large to add to the clock mean the timer is never armed.
fn deadline_after(now: Instant, delay: Duration) -> Option<Instant> {
    now.checked_add(delay)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PendingTimer {
    Silence(Instant),
    NoMotion(Instant),
}

impl PendingTimer {
    pub(crate) fn deadline(&self) -> Instant {
        match self {
            Self::Silence(at) | Self::NoMotion(at) => *at,
        }
    }
}

// A single optional timer, so silence and no-motion can never both be armed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct DeviceState {
    motion_detected: bool,
    no_motion_count: u32,
    timer: Option<PendingTimer>,
}

impl DeviceState {
    pub(crate) fn motion_detected(&self) -> bool {
        self.motion_detected
    }

    pub(crate) fn no_motion_count(&self) -> u32 {
        self.no_motion_count
    }

    pub(crate) fn timer(&self) -> Option<PendingTimer> {
        self.timer
    }

    /// Returns the new stable output if (and only if) it changed.
    pub(crate) fn handle_signal(
        &mut self,
        config: &DebounceConfig,
        detected: bool,
        now: Instant,
    ) -> Option<bool> {
        match (config.policy, detected) {
            (DebouncePolicy::SilenceTimeout, true) => {
                self.no_motion_count = 0;
                self.timer =
                    deadline_after(now, config.motion_off_delay()).map(PendingTimer::Silence);
                self.set_motion(true)
            }
            (DebouncePolicy::SilenceTimeout, false) => {
                if self.count_no_motion(config) {
                    self.cancel_silence();
                    self.set_motion(false)
                } else {
                    None
                }
            }

            (DebouncePolicy::DualTimer, true) => {
                self.cancel_no_motion();
                self.timer =
                    deadline_after(now, config.motion_off_delay()).map(PendingTimer::Silence);
                self.set_motion(true)
            }
            (DebouncePolicy::DualTimer, false) => {
                self.cancel_silence();
                if self.timer.is_none() {
                    self.timer =
                        deadline_after(now, config.no_motion_delay()).map(PendingTimer::NoMotion);
                }
                None
            }

            (DebouncePolicy::ConsecutiveCount, true) => {
                self.no_motion_count = 0;
                self.set_motion(true)
            }
            (DebouncePolicy::ConsecutiveCount, false) => {
                if self.count_no_motion(config) {
                    self.set_motion(false)
                } else {
                    None
                }
            }
        }
    }

    pub(crate) fn handle_timer(&mut self, now: Instant) -> Option<bool> {
        match self.timer {
            Some(timer) if timer.deadline() <= now => {
                self.timer = None;
                self.set_motion(false)
            }
            _ => None,
        }
    }

    fn count_no_motion(&mut self, config: &DebounceConfig) -> bool {
        self.no_motion_count += 1;

        if self.no_motion_count >= config.no_motion_threshold.get() {
            self.no_motion_count = 0;
            true
        } else {
            false
        }
    }

    fn cancel_silence(&mut self) {
        if let Some(PendingTimer::Silence(_)) = self.timer {
            self.timer = None;
        }
    }

    fn cancel_no_motion(&mut self) {
        if let Some(PendingTimer::NoMotion(_)) = self.timer {
            self.timer = None;
        }
    }

    fn set_motion(&mut self, detected: bool) -> Option<bool> {
        if self.motion_detected == detected {
            None
        } else {
            self.motion_detected = detected;
            Some(detected)
        }
    }
}
