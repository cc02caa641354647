/// Configuration store: the single reader/writer of the persisted settings record
use thiserror::Error;

use crate::settings::{DeviceSettings, FactoryDefaults, RECORD_LEN};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Non-volatile storage holding exactly one settings record.
pub trait SettingsStorage {
    /// Read the stored record into `buf`.
    ///
    /// Returns `Ok(None)` when no record exists, otherwise the size of the
    /// stored record. A size different from `buf.len()` means the stored
    /// record was not copied.
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StoreError>;

    /// Replace the stored record as a whole.
    fn write(&mut self, record: &[u8]) -> Result<(), StoreError>;
}

pub struct ConfigStore<S> {
    storage: S,
    factory: FactoryDefaults,
}

impl<S: SettingsStorage> ConfigStore<S> {
    pub fn new(storage: S, factory: FactoryDefaults) -> Self {
        Self { storage, factory }
    }

    pub fn defaults(&self) -> DeviceSettings {
        DeviceSettings::defaults(&self.factory)
    }

    /// Load the persisted record, creating it from defaults when it is
    /// missing or unusable so that a record always exists afterwards.
    pub fn load(&mut self) -> DeviceSettings {
        let mut buf = [0u8; RECORD_LEN];

        match self.storage.read(&mut buf) {
            Ok(Some(len)) if len == RECORD_LEN => match DeviceSettings::from_record(&buf) {
                Ok(settings) => {
                    log::info!("Device config exists, loaded {} bytes", len);
                    return settings;
                }
                Err(e) => log::warn!("Stored config unreadable: {}", e),
            },
            Ok(Some(len)) => {
                log::warn!("Stored config is {} bytes, expected {}, replacing it", len, RECORD_LEN)
            }
            Ok(None) => log::info!("Default config doesn't exist, creating..."),
            Err(e) => log::warn!("Failed to read config: {}, using defaults", e),
        }

        let settings = self.defaults();
        if let Err(e) = self.save(&settings) {
            log::warn!("Failed to persist default config: {}", e);
        }
        settings
    }

    /// Persist the whole record. There is no batching; callers save after
    /// every mutation.
    pub fn save(&mut self, settings: &DeviceSettings) -> Result<(), StoreError> {
        log::info!("Saving configuration...");
        self.storage.write(&settings.to_record())?;
        log::debug!("Configuration saved ({} bytes)", RECORD_LEN);
        Ok(())
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

/// RAM-backed storage, used on the host and as a stand-in when flash is unavailable.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    record: Option<Vec<u8>>,
    writes: usize,
    fail_writes: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: &[u8]) -> Self {
        Self {
            record: Some(record.to_vec()),
            ..Self::default()
        }
    }

    /// Make every following write fail, to exercise save error paths
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn record(&self) -> Option<&[u8]> {
        self.record.as_deref()
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl SettingsStorage for MemoryStorage {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        match &self.record {
            Some(record) if record.len() == buf.len() => {
                buf.copy_from_slice(record);
                Ok(Some(record.len()))
            }
            Some(record) => Ok(Some(record.len())),
            None => Ok(None),
        }
    }

    fn write(&mut self, record: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.record = Some(record.to_vec());
        self.writes += 1;
        Ok(())
    }
}

impl<S: SettingsStorage + ?Sized> SettingsStorage for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<Option<usize>, StoreError> {
        (**self).read(buf)
    }

    fn write(&mut self, record: &[u8]) -> Result<(), StoreError> {
        (**self).write(record)
    }
}
