/// Settings submitted from the configuration page
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::settings::{
    bounded_text, parse_interval_secs, DeviceSettings, ScreenBrightness, SettingText,
    SleepTouchThreshold, DEFAULT_HTTP_REQUEST_INTERVAL_SECS, TEXT_CAPACITY,
};

/// The interval field arrives either as a form string or as a JSON number.
/// Anything else is kept so it can fall back to the default interval.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum IntervalInput {
    Number(u32),
    Text(String),
    Invalid(serde_json::Value),
}

impl IntervalInput {
    fn secs(&self) -> Option<u32> {
        match self {
            IntervalInput::Number(secs) => Some(*secs).filter(|secs| *secs > 0),
            IntervalInput::Text(text) => parse_interval_secs(text),
            IntervalInput::Invalid(_) => None,
        }
    }
}

/// A field of the wrong JSON type reads as absent instead of failing the
/// whole submission.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match serde_json::from_value(value.clone()) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => {
            log::warn!("Ignoring submitted value {}", value);
            Ok(None)
        }
    }
}

/// One submission of the settings form. Every field is optional; an absent
/// or malformed field takes its default value when the submission is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SettingsSubmission {
    #[serde(deserialize_with = "lenient")]
    pub reset_chip: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub is_setup: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub wifi_ssid: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub wifi_password: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub api_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub auth_token: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub in_sensor_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub out_sensor_id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub display_wifi_indicator: Option<bool>,
    pub http_request_interval: Option<IntervalInput>,
    #[serde(deserialize_with = "lenient")]
    pub sleep_touch_threshold: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub screen_brightness: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub invert_screen: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub debug_mode: Option<bool>,
}

impl SettingsSubmission {
    pub fn from_json(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }

    pub fn is_reset(&self) -> bool {
        self.reset_chip.unwrap_or(false)
    }

    /// Build the record this submission describes.
    ///
    /// A reset request wins over any fields sent along with it.
    pub fn resolve(&self, defaults: &DeviceSettings) -> DeviceSettings {
        if self.is_reset() {
            log::info!("Settings reset requested");
            return defaults.clone();
        }

        let text = |value: &Option<String>, fallback: &SettingText| {
            value
                .as_deref()
                .map(|v| bounded_text::<TEXT_CAPACITY>(v))
                .unwrap_or_else(|| fallback.clone())
        };

        let http_request_interval_secs = match &self.http_request_interval {
            Some(input) => input.secs().unwrap_or_else(|| {
                log::warn!("Submitted request interval {:?} is invalid", input);
                DEFAULT_HTTP_REQUEST_INTERVAL_SECS
            }),
            None => defaults.http_request_interval_secs,
        };

        let sleep_touch_threshold = self
            .sleep_touch_threshold
            .as_deref()
            .and_then(SleepTouchThreshold::parse)
            .unwrap_or(defaults.sleep_touch_threshold);

        let screen_brightness = self
            .screen_brightness
            .as_deref()
            .and_then(ScreenBrightness::parse)
            .unwrap_or(defaults.screen_brightness);

        DeviceSettings {
            is_setup: self.is_setup.unwrap_or(defaults.is_setup),
            wifi_ssid: text(&self.wifi_ssid, &defaults.wifi_ssid),
            wifi_password: text(&self.wifi_password, &defaults.wifi_password),
            base_url: text(&self.api_url, &defaults.base_url),
            auth_token: text(&self.auth_token, &defaults.auth_token),
            in_sensor_id: text(&self.in_sensor_id, &defaults.in_sensor_id),
            out_sensor_id: text(&self.out_sensor_id, &defaults.out_sensor_id),
            display_wifi_indicator: self
                .display_wifi_indicator
                .unwrap_or(defaults.display_wifi_indicator),
            http_request_interval_secs,
            sleep_touch_threshold,
            screen_brightness,
            invert_screen: self.invert_screen.unwrap_or(defaults.invert_screen),
            debug_mode: self.debug_mode.unwrap_or(defaults.debug_mode),
        }
    }
}
