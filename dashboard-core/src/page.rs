/// Configuration page, pre-filled from the live settings record
use crate::settings::{DeviceSettings, ScreenBrightness, SleepTouchThreshold};

pub const SETTINGS_PAGE: &str = include_str!("settings.html");

fn checked(on: bool) -> &'static str {
    if on {
        "checked"
    } else {
        ""
    }
}

fn selected(on: bool) -> &'static str {
    if on {
        "selected"
    } else {
        ""
    }
}

fn escape_html(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

/// Append the value of one `%NAME%` placeholder; `false` if there is no such placeholder
fn placeholder(name: &str, settings: &DeviceSettings, version: &str, out: &mut String) -> bool {
    let text: &str = match name {
        "IS_SETUP" => checked(settings.is_setup),
        "WIFI_SSID" => settings.wifi_ssid.as_str(),
        "WIFI_PASSWORD" => settings.wifi_password.as_str(),
        "HA_API" => settings.base_url.as_str(),
        "AUTH_TOKEN" => settings.auth_token.as_str(),
        "IN_SENSOR_ID" => settings.in_sensor_id.as_str(),
        "OUT_SENSOR_ID" => settings.out_sensor_id.as_str(),
        "WIFI_ICON_STATE" => checked(settings.display_wifi_indicator),
        "HTTP_REQUEST_INTERVAL" => {
            out.push_str(&settings.http_request_interval_secs.to_string());
            return true;
        }
        "LONG_TOUCH_SELECTED" => selected(settings.sleep_touch_threshold == SleepTouchThreshold::Long),
        "MEDIUM_TOUCH_SELECTED" => selected(settings.sleep_touch_threshold == SleepTouchThreshold::Medium),
        "SHORT_TOUCH_SELECTED" => selected(settings.sleep_touch_threshold == SleepTouchThreshold::Short),
        "HIGH_BRIGHTNESS_SELECTED" => selected(settings.screen_brightness == ScreenBrightness::High),
        "MEDIUM_BRIGHTNESS_SELECTED" => selected(settings.screen_brightness == ScreenBrightness::Medium),
        "DIM_BRIGHTNESS_SELECTED" => selected(settings.screen_brightness == ScreenBrightness::Dim),
        "INVERT_SCREEN" => checked(settings.invert_screen),
        "ENABLE_DEBUG" => checked(settings.debug_mode),
        "SETUP_STATE" => {
            if settings.is_setup {
                "is successfully set up!"
            } else {
                "is not set up! Please fill out the form below to start."
            }
        }
        "DEBUG_MODE_STYLING" => {
            if settings.debug_mode {
                ""
            } else {
                " style=\"display:none\""
            }
        }
        "VERSION" => version,
        _ => return false,
    };

    // Markup-producing placeholders are trusted, user text is not
    match name {
        "DEBUG_MODE_STYLING" => out.push_str(text),
        _ => escape_html(text, out),
    }
    true
}

/// Fill every `%NAME%` placeholder of the page. A `%` that does not open a
/// known placeholder (CSS percentages) is copied through.
pub fn render_settings_page(settings: &DeviceSettings, version: &str) -> String {
    let mut out = String::with_capacity(SETTINGS_PAGE.len() + 512);
    let mut rest = SETTINGS_PAGE;

    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];

        let replaced = after
            .find('%')
            .map(|end| (end, &after[..end]))
            .filter(|(_, name)| !name.is_empty() && name.bytes().all(|b| b.is_ascii_uppercase() || b == b'_'))
            .filter(|(_, name)| placeholder(name, settings, version, &mut out));

        match replaced {
            Some((end, _)) => rest = &after[end + 1..],
            None => {
                out.push('%');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
