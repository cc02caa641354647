/// Device settings and the fixed binary record they persist as.
///
/// The record layout is byte-stable: every text field occupies a
/// NUL-terminated 256-byte slot, booleans are single bytes, and the enum and
/// interval fields are stored as text so unknown values can fall back to a
/// default on load instead of being misread.
use core::fmt::Write as _;
use core::time::Duration;

use heapless::String;
use thiserror::Error;

/// Size of one text slot in the persisted record, terminator included
pub const TEXT_FIELD_LEN: usize = 256;

/// Usable bytes of a text field (one byte is reserved for the terminator)
pub const TEXT_CAPACITY: usize = TEXT_FIELD_LEN - 1;

/// Total size of the persisted record
pub const RECORD_LEN: usize = 1 + 6 * TEXT_FIELD_LEN + 1 + 3 * TEXT_FIELD_LEN + 1 + 1;

pub const DEFAULT_HTTP_REQUEST_INTERVAL_SECS: u32 = 60;

// Touch hold durations before the device turns itself off
const SLEEP_TOUCH_THRESHOLD_SHORT_MS: u32 = 1400;
const SLEEP_TOUCH_THRESHOLD_MEDIUM_MS: u32 = 4400;
const SLEEP_TOUCH_THRESHOLD_LONG_MS: u32 = 5900;

pub type SettingText = String<TEXT_CAPACITY>;

/// Copy `value` into a bounded text field, cutting at a char boundary.
pub fn bounded_text<const N: usize>(value: &str) -> String<N> {
    let mut out = String::new();
    for ch in value.chars() {
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SleepTouchThreshold {
    Short,
    Medium,
    #[default]
    Long,
}

impl SleepTouchThreshold {
    pub fn as_str(self) -> &'static str {
        match self {
            SleepTouchThreshold::Short => "short",
            SleepTouchThreshold::Medium => "medium",
            SleepTouchThreshold::Long => "long",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "short" => Some(SleepTouchThreshold::Short),
            "medium" => Some(SleepTouchThreshold::Medium),
            "long" => Some(SleepTouchThreshold::Long),
            _ => None,
        }
    }

    /// How long a touch must be held before the device goes to sleep
    pub fn hold_millis(self) -> u32 {
        match self {
            SleepTouchThreshold::Short => SLEEP_TOUCH_THRESHOLD_SHORT_MS,
            SleepTouchThreshold::Medium => SLEEP_TOUCH_THRESHOLD_MEDIUM_MS,
            SleepTouchThreshold::Long => SLEEP_TOUCH_THRESHOLD_LONG_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScreenBrightness {
    #[default]
    Dim,
    Medium,
    High,
}

impl ScreenBrightness {
    pub fn as_str(self) -> &'static str {
        match self {
            ScreenBrightness::Dim => "dim",
            ScreenBrightness::Medium => "medium",
            ScreenBrightness::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dim" => Some(ScreenBrightness::Dim),
            "medium" => Some(ScreenBrightness::Medium),
            "high" => Some(ScreenBrightness::High),
            _ => None,
        }
    }
}

/// Parse a poll interval in seconds; zero and garbage are rejected.
pub fn parse_interval_secs(s: &str) -> Option<u32> {
    s.trim().parse::<u32>().ok().filter(|secs| *secs > 0)
}

/// Build-time values the default record is made from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FactoryDefaults {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub base_url: &'static str,
    pub auth_token: &'static str,
    pub in_sensor_id: &'static str,
    pub out_sensor_id: &'static str,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("settings record is {actual} bytes, expected {expected}")]
    WrongLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSettings {
    // internal flags
    pub is_setup: bool,
    // wifi settings
    pub wifi_ssid: SettingText,
    pub wifi_password: SettingText,
    // sensor API settings
    pub base_url: SettingText,
    pub auth_token: SettingText,
    pub in_sensor_id: SettingText,
    pub out_sensor_id: SettingText,
    // device settings
    pub display_wifi_indicator: bool,
    pub http_request_interval_secs: u32,
    pub sleep_touch_threshold: SleepTouchThreshold,
    pub screen_brightness: ScreenBrightness,
    pub invert_screen: bool,
    pub debug_mode: bool,
}

impl DeviceSettings {
    pub fn defaults(factory: &FactoryDefaults) -> Self {
        Self {
            is_setup: false,
            wifi_ssid: bounded_text(factory.wifi_ssid),
            wifi_password: bounded_text(factory.wifi_password),
            base_url: bounded_text(factory.base_url),
            auth_token: bounded_text(factory.auth_token),
            in_sensor_id: bounded_text(factory.in_sensor_id),
            out_sensor_id: bounded_text(factory.out_sensor_id),
            display_wifi_indicator: true,
            http_request_interval_secs: DEFAULT_HTTP_REQUEST_INTERVAL_SECS,
            sleep_touch_threshold: SleepTouchThreshold::default(),
            screen_brightness: ScreenBrightness::default(),
            invert_screen: false,
            debug_mode: false,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.http_request_interval_secs.max(1)))
    }

    /// Whether switching from `self` to `next` only takes effect after a reboot.
    pub fn requires_restart(&self, next: &DeviceSettings) -> bool {
        self.is_setup != next.is_setup
            || self.wifi_ssid != next.wifi_ssid
            || self.wifi_password != next.wifi_password
            || self.http_request_interval_secs != next.http_request_interval_secs
    }

    pub fn to_record(&self) -> [u8; RECORD_LEN] {
        let mut record = [0u8; RECORD_LEN];
        let mut writer = RecordWriter { buf: &mut record, pos: 0 };

        let mut interval: String<10> = String::new();
        let _ = write!(interval, "{}", self.http_request_interval_secs);

        writer.flag(self.is_setup);
        writer.text(&self.wifi_ssid);
        writer.text(&self.wifi_password);
        writer.text(&self.base_url);
        writer.text(&self.auth_token);
        writer.text(&self.in_sensor_id);
        writer.text(&self.out_sensor_id);
        writer.flag(self.display_wifi_indicator);
        writer.text(&interval);
        writer.text(self.sleep_touch_threshold.as_str());
        writer.text(self.screen_brightness.as_str());
        writer.flag(self.invert_screen);
        writer.flag(self.debug_mode);

        record
    }

    /// Decode a persisted record. Only a wrong record size is an error;
    /// individual fields that fail to parse fall back to their defaults.
    pub fn from_record(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() != RECORD_LEN {
            return Err(RecordError::WrongLength {
                expected: RECORD_LEN,
                actual: bytes.len(),
            });
        }

        let mut reader = RecordReader { buf: bytes, pos: 0 };

        let is_setup = reader.flag();
        let wifi_ssid = reader.text();
        let wifi_password = reader.text();
        let base_url = reader.text();
        let auth_token = reader.text();
        let in_sensor_id = reader.text();
        let out_sensor_id = reader.text();
        let display_wifi_indicator = reader.flag();

        let raw_interval = reader.text();
        let http_request_interval_secs = parse_interval_secs(&raw_interval).unwrap_or_else(|| {
            log::warn!(
                "Stored request interval {:?} is invalid, using {}s",
                raw_interval.as_str(),
                DEFAULT_HTTP_REQUEST_INTERVAL_SECS
            );
            DEFAULT_HTTP_REQUEST_INTERVAL_SECS
        });

        let raw_threshold = reader.text();
        let sleep_touch_threshold = SleepTouchThreshold::parse(&raw_threshold).unwrap_or_else(|| {
            log::warn!("Stored sleep threshold {:?} is invalid", raw_threshold.as_str());
            SleepTouchThreshold::default()
        });

        let raw_brightness = reader.text();
        let screen_brightness = ScreenBrightness::parse(&raw_brightness).unwrap_or_else(|| {
            log::warn!("Stored brightness {:?} is invalid", raw_brightness.as_str());
            ScreenBrightness::default()
        });

        let invert_screen = reader.flag();
        let debug_mode = reader.flag();

        Ok(Self {
            is_setup,
            wifi_ssid,
            wifi_password,
            base_url,
            auth_token,
            in_sensor_id,
            out_sensor_id,
            display_wifi_indicator,
            http_request_interval_secs,
            sleep_touch_threshold,
            screen_brightness,
            invert_screen,
            debug_mode,
        })
    }
}

struct RecordWriter<'a> {
    buf: &'a mut [u8; RECORD_LEN],
    pos: usize,
}

impl RecordWriter<'_> {
    fn flag(&mut self, value: bool) {
        self.buf[self.pos] = u8::from(value);
        self.pos += 1;
    }

    // Slot is pre-zeroed, so the terminator and padding are already there
    fn text(&mut self, value: &str) {
        let bytes = value.as_bytes();
        let len = bytes.len().min(TEXT_CAPACITY);
        self.buf[self.pos..self.pos + len].copy_from_slice(&bytes[..len]);
        self.pos += TEXT_FIELD_LEN;
    }
}

struct RecordReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl RecordReader<'_> {
    fn flag(&mut self) -> bool {
        let value = self.buf[self.pos] != 0;
        self.pos += 1;
        value
    }

    fn text(&mut self) -> SettingText {
        let slot = &self.buf[self.pos..self.pos + TEXT_FIELD_LEN];
        self.pos += TEXT_FIELD_LEN;

        // An unterminated slot is cut to capacity so the terminator invariant holds
        let end = slot
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(TEXT_CAPACITY)
            .min(TEXT_CAPACITY);

        match core::str::from_utf8(&slot[..end]) {
            Ok(text) => bounded_text(text),
            Err(_) => bounded_text(&std::string::String::from_utf8_lossy(&slot[..end])),
        }
    }
}
