/// Hardware seams the runtime drives. The firmware implements these over
/// ESP-IDF; tests implement them over a simulated clock and framebuffer.
use core::fmt::Debug;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::DrawTarget};

use crate::clock::WallClock;
use crate::settings::ScreenBrightness;

/// Why the chip came out of reset, consumed once at boot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    PowerOn,
    Touch,
}

pub trait Board {
    type DrawError: Debug;
    type Canvas: DrawTarget<Color = BinaryColor, Error = Self::DrawError>;

    /// Milliseconds since boot, wrapping
    fn uptime_ms(&self) -> u32;

    /// Blocking pause. Only used on the boot, failure and sleep paths.
    fn delay_ms(&mut self, ms: u32);

    /// Raw capacitive reading of the sleep touch pad
    fn touch_value(&mut self) -> u16;

    /// Off-screen frame; cleared and redrawn by every render
    fn canvas(&mut self) -> &mut Self::Canvas;

    /// Push the frame to the panel
    fn present(&mut self) -> Result<(), Self::DrawError>;

    fn set_display_enabled(&mut self, on: bool) -> Result<(), Self::DrawError>;

    fn configure_display(
        &mut self,
        brightness: ScreenBrightness,
        invert: bool,
    ) -> Result<(), Self::DrawError>;
}

pub trait WifiLink {
    /// Start associating with an access point; returns immediately
    fn begin(&mut self, ssid: &str, password: &str);

    fn is_connected(&self) -> bool;

    /// Signal strength in dBm, meaningful only while connected
    fn rssi(&self) -> i32;
}

pub trait TimeSource {
    /// Sync if the refresh interval passed. `true` once the clock is valid.
    fn update(&mut self) -> bool;

    /// Request an immediate sync. `true` if the clock is valid afterwards.
    fn force_update(&mut self) -> bool;

    fn now(&self) -> WallClock;
}

/// Everything the runtime needs from the device
pub trait Platform: Board + WifiLink + TimeSource {}

impl<P: Board + WifiLink + TimeSource> Platform for P {}
