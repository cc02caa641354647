//! Dashboard Core - hardware-independent logic of the ESP32 sensor clock
//!
//! Settings persistence, sensor polling, the touch-to-sleep state machine,
//! link management, frame composition and the runtime that drives them all
//! live here so they can be tested on the host. The firmware crate only
//! implements the platform traits.

pub mod clock;
pub mod compositor;
pub mod connectivity;
pub mod form;
pub mod interaction;
pub mod page;
pub mod platform;
pub mod poller;
pub mod reading;
pub mod runtime;
pub mod settings;
pub mod store;

pub use form::SettingsSubmission;
pub use platform::{Board, Platform, TimeSource, WakeCause, WifiLink};
pub use poller::{HttpEvent, HttpTransport, SensorRequest, TransportError};
pub use reading::{SensorKind, SensorReading};
pub use runtime::{Control, Event, Runtime};
pub use settings::{DeviceSettings, FactoryDefaults};
pub use store::{ConfigStore, SettingsStorage, StoreError};
