//! Persistent configuration store.
//!
//! Layout of the non-volatile region, starting at offset 0:
//!
//! ```text
//! ┌────────┬────────┬──────────────────────────────┐
//! │ len hi │ len lo │ len bytes of JSON document   │
//! └────────┴────────┴──────────────────────────────┘
//! ```
//!
//! `len` outside `1..=MAX_DOCUMENT_LEN` means "nothing stored".  The JSON
//! document uses the same keys as the `get_config` / `set_config` wire
//! messages.  Remote partial updates go through
//! [`ConfigPort::apply_remote_update`].

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, LoadOutcome, StoragePort};
use crate::config::SystemConfig;

/// Size of the length prefix.
const HEADER_LEN: usize = 2;

/// Largest length prefix accepted as a stored document.
pub const MAX_DOCUMENT_LEN: usize = 4096;

/// Size of the region reserved for configuration.
pub const CONFIG_REGION_SIZE: usize = 1024;

/// Typed configuration view over a raw byte region.
pub struct ConfigStore<S: StoragePort> {
    storage: S,
}

impl<S: StoragePort> ConfigStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Built-in defaults.
    pub fn load_defaults() -> SystemConfig {
        SystemConfig::default()
    }

    /// Boot-time load.
    ///
    /// Starts from defaults and overlays a stored document if there is a
    /// valid one.  A region that holds nothing gets the defaults written so
    /// later boots find a document.
    pub fn seed(&mut self) -> SystemConfig {
        let mut cfg = Self::load_defaults();
        match self.load_into(&mut cfg) {
            LoadOutcome::Loaded => {}
            LoadOutcome::Absent => {
                info!("ConfigStore: first boot, writing defaults");
                // Failure is already logged by save(); defaults stay live.
                let _ = self.save(&cfg);
            }
            LoadOutcome::Corrupted => {
                warn!("ConfigStore: stored config unusable, running on defaults");
            }
        }
        cfg
    }

    /// Validate, serialise and commit `cfg`.
    pub fn save(&mut self, cfg: &SystemConfig) -> Result<(), ConfigError> {
        let result = self.write_document(cfg);
        match &result {
            Ok(len) => info!("ConfigStore: saved {} bytes", len),
            Err(e) => warn!("ConfigStore: save failed: {}", e),
        }
        result.map(|_| ())
    }

    /// Overlay the stored document onto `cfg`.
    ///
    /// `cfg` is only replaced when the whole document reads, parses and
    /// validates.  Keys missing from the document take their defaults.
    pub fn load_into(&self, cfg: &mut SystemConfig) -> LoadOutcome {
        let mut header = [0u8; HEADER_LEN];
        if let Err(e) = self.storage.read(0, &mut header) {
            warn!("ConfigStore: header read failed: {}", e);
            return LoadOutcome::Corrupted;
        }
        let len = usize::from(u16::from_be_bytes(header));
        info!("ConfigStore: stored length {}", len);
        if len == 0 || len > MAX_DOCUMENT_LEN {
            info!("ConfigStore: no stored config");
            return LoadOutcome::Absent;
        }

        let mut doc = vec![0u8; len];
        if let Err(e) = self.storage.read(HEADER_LEN, &mut doc) {
            warn!("ConfigStore: document read failed: {}", e);
            return LoadOutcome::Corrupted;
        }

        let parsed: SystemConfig = match serde_json::from_slice(&doc) {
            Ok(c) => c,
            Err(e) => {
                warn!("ConfigStore: stored config does not parse: {}", e);
                return LoadOutcome::Corrupted;
            }
        };
        if let Err(e) = parsed.validate() {
            warn!("ConfigStore: stored config rejected: {}", e);
            return LoadOutcome::Corrupted;
        }

        *cfg = parsed;
        LoadOutcome::Loaded
    }

    /// Borrow the underlying storage (tests and diagnostics).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    fn write_document(&mut self, cfg: &SystemConfig) -> Result<usize, ConfigError> {
        cfg.validate()?;
        let doc = serde_json::to_vec(cfg).map_err(|_| ConfigError::Encode)?;
        let len = doc.len();
        if len > MAX_DOCUMENT_LEN || HEADER_LEN + len > self.storage.capacity() {
            return Err(ConfigError::TooLarge(len));
        }
        let header = (len as u16).to_be_bytes();
        self.storage.write(0, &header)?;
        self.storage.write(HEADER_LEN, &doc)?;
        self.storage.commit()?;
        Ok(len)
    }
}

impl<S: StoragePort> ConfigPort for ConfigStore<S> {
    fn load_into(&self, cfg: &mut SystemConfig) -> LoadOutcome {
        ConfigStore::load_into(self, cfg)
    }

    fn save(&mut self, cfg: &SystemConfig) -> Result<(), ConfigError> {
        ConfigStore::save(self, cfg)
    }
}
