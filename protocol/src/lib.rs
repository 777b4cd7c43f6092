use serde::{de::IgnoredAny, Deserialize, Deserializer, Serialize};

/// One event as published by a sensor node on the ingest topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionEvent {
    pub device_id: String,
    #[serde(default)]
    pub data: Reading,
}

/// A single radar sample.
///
/// Every field is optional. Numeric fields accept JSON numbers and numeric
/// strings; anything else decodes as `None` rather than failing the whole
/// event, so a partially garbled sample still reaches the classifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stationary_distance: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stationary_signal: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub moving_distance: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub moving_signal: Option<f64>,

    /// Pre-computed detection from nodes that do their own thresholding.
    #[serde(
        default,
        deserialize_with = "lenient_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub motion_detected: Option<bool>,
}

impl Reading {
    pub fn detected(motion_detected: bool) -> Self {
        Self {
            motion_detected: Some(motion_detected),
            ..Default::default()
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawNumber {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawNumber::deserialize(deserializer)? {
        RawNumber::Number(v) => Some(v),
        RawNumber::Text(s) => s.trim().parse().ok(),
        RawNumber::Other(_) => None,
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBool {
    Bool(bool),
    Other(IgnoredAny),
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawBool::deserialize(deserializer)? {
        RawBool::Bool(v) => Some(v),
        RawBool::Other(_) => None,
    })
}
