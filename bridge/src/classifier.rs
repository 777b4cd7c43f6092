use presence_bridge_protocol::Reading;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Thresholds {
    pub(crate) max_stationary_distance: f64,
    pub(crate) min_stationary_signal: f64,
    pub(crate) max_moving_distance: f64,
    pub(crate) min_moving_signal: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_stationary_distance: 150.0,
            min_stationary_signal: 15.0,
            max_moving_distance: 150.0,
            min_moving_signal: 15.0,
        }
    }
}

impl Thresholds {
    /// Raw motion signal for a single reading.
    ///
    /// A reading that carries its own `motion_detected` flag is taken as is.
    /// Otherwise either target (stationary or moving) must be in range and
    /// strong enough. Absent values fail every comparison, as does NaN.
    pub(crate) fn classify(&self, reading: &Reading) -> bool {
        if let Some(detected) = reading.motion_detected {
            return detected;
        }

        target_detected(
            reading.stationary_distance,
            reading.stationary_signal,
            self.max_stationary_distance,
            self.min_stationary_signal,
        ) || target_detected(
            reading.moving_distance,
            reading.moving_signal,
            self.max_moving_distance,
            self.min_moving_signal,
        )
    }
}

fn target_detected(
    distance: Option<f64>,
    signal: Option<f64>,
    max_distance: f64,
    min_signal: f64,
) -> bool {
    match (distance, signal) {
        (Some(distance), Some(signal)) => {
            distance > 0.0 && distance < max_distance && signal > min_signal
        }
        _ => false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn stationary(distance: f64, signal: f64) -> Reading {
        Reading {
            stationary_distance: Some(distance),
            stationary_signal: Some(signal),
            ..Default::default()
        }
    }

    fn moving(distance: f64, signal: f64) -> Reading {
        Reading {
            moving_distance: Some(distance),
            moving_signal: Some(signal),
            ..Default::default()
        }
    }

    #[test]
    fn defaults() {
        let t = Thresholds::default();
        assert_eq!(t.max_stationary_distance, 150.0);
        assert_eq!(t.min_stationary_signal, 15.0);
        assert_eq!(t.max_moving_distance, 150.0);
        assert_eq!(t.min_moving_signal, 15.0);
    }

    #[test]
    fn stationary_target() {
        let t = Thresholds::default();

        assert!(t.classify(&stationary(80.0, 40.0)));
        assert!(t.classify(&stationary(149.9, 15.1)));

        assert!(!t.classify(&stationary(0.0, 40.0)));
        assert!(!t.classify(&stationary(150.0, 40.0)));
        assert!(!t.classify(&stationary(80.0, 15.0)));
        assert!(!t.classify(&stationary(-5.0, 40.0)));
    }

    #[test]
    fn moving_target() {
        let t = Thresholds::default();

        assert!(t.classify(&moving(30.0, 90.0)));

        assert!(!t.classify(&moving(0.0, 90.0)));
        assert!(!t.classify(&moving(150.0, 90.0)));
        assert!(!t.classify(&moving(30.0, 15.0)));
    }

    #[test]
    fn either_target_is_enough() {
        let t = Thresholds::default();

        let reading = Reading {
            stationary_distance: Some(0.0),
            stationary_signal: Some(0.0),
            moving_distance: Some(60.0),
            moving_signal: Some(50.0),
            motion_detected: None,
        };
        assert!(t.classify(&reading));
    }

    #[test]
    fn custom_thresholds() {
        let t = Thresholds {
            max_stationary_distance: 50.0,
            min_stationary_signal: 60.0,
            ..Default::default()
        };

        assert!(!t.classify(&stationary(80.0, 70.0)));
        assert!(!t.classify(&stationary(40.0, 55.0)));
        assert!(t.classify(&stationary(40.0, 70.0)));
    }

    #[test]
    fn missing_fields_are_not_detected() {
        let t = Thresholds::default();

        assert!(!t.classify(&Reading::default()));
        assert!(!t.classify(&Reading {
            stationary_distance: Some(80.0),
            ..Default::default()
        }));
        assert!(!t.classify(&Reading {
            moving_signal: Some(99.0),
            ..Default::default()
        }));
        assert!(!t.classify(&stationary(f64::NAN, 40.0)));
    }

    #[test]
    fn simplified_mode_bypasses_thresholds() {
        let t = Thresholds::default();

        assert!(t.classify(&Reading::detected(true)));
        assert!(!t.classify(&Reading::detected(false)));

        let reading = Reading {
            motion_detected: Some(false),
            ..stationary(80.0, 40.0)
        };
        assert!(!t.classify(&reading));
    }
}
