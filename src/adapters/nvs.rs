//! NVS-backed byte region.
//!
//! Implements [`StoragePort`] as an EEPROM-style region: a RAM shadow that
//! is read and written by offset, persisted as a single NVS blob on
//! [`commit`](StoragePort::commit).
//!
//! - **`target_os = "espidf"`**: the shadow is loaded from and committed to
//!   the `smartgarden/eeprom` blob in the default NVS partition.
//! - **`not(target_os = "espidf")`**: commit snapshots the shadow in memory
//!   so tests can observe what would survive a reboot.

use log::info;
#[cfg(target_os = "espidf")]
use log::warn;

use crate::app::ports::{StorageError, StoragePort};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
const NAMESPACE: &[u8] = b"smartgarden\0";
#[cfg(target_os = "espidf")]
const BLOB_KEY: &[u8] = b"eeprom\0";

pub struct NvsRegion {
    shadow: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    committed: Vec<u8>,
    #[cfg(not(target_os = "espidf"))]
    fail_commits: bool,
}

impl NvsRegion {
    /// A zero-filled region of `capacity` bytes, not yet backed by flash.
    pub fn new(capacity: usize) -> Self {
        Self {
            shadow: vec![0u8; capacity],
            #[cfg(not(target_os = "espidf"))]
            committed: vec![0u8; capacity],
            #[cfg(not(target_os = "espidf"))]
            fail_commits: false,
        }
    }

    /// Initialise NVS flash and load the persisted region into the shadow.
    ///
    /// On first boot (no blob) the shadow stays zero-filled.
    #[cfg(target_os = "espidf")]
    pub fn open(capacity: usize) -> Result<Self, StorageError> {
        // SAFETY: called once from the main task before any other NVS user.
        let ret = unsafe { nvs_flash_init() };
        if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
            warn!("NvsRegion: erasing and re-initialising flash partition");
            if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                return Err(StorageError::ReadFailed);
            }
        } else if ret != ESP_OK {
            return Err(StorageError::ReadFailed);
        }

        let mut region = Self::new(capacity);
        let shadow = &mut region.shadow;
        let loaded = with_nvs_handle(false, |handle| {
            let mut size = shadow.len();
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    BLOB_KEY.as_ptr() as *const _,
                    shadow.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(size)
        });
        match loaded {
            Ok(size) => info!("NvsRegion: loaded {} bytes", size),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => info!("NvsRegion: no stored region"),
            Err(e) => {
                warn!("NvsRegion: load failed (err={}), starting blank", e);
                region.shadow.fill(0);
            }
        }
        Ok(region)
    }

    /// Bytes that the last successful commit persisted.
    #[cfg(not(target_os = "espidf"))]
    pub fn committed(&self) -> &[u8] {
        &self.committed
    }

    /// Make subsequent commits fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_fail_commits(&mut self, fail: bool) {
        self.fail_commits = fail;
    }

    /// Drop uncommitted writes, as a power cycle would.
    #[cfg(not(target_os = "espidf"))]
    pub fn power_cycle(&mut self) {
        self.shadow.copy_from_slice(&self.committed);
    }

    fn span(&self, offset: usize, len: usize) -> Result<core::ops::Range<usize>, StorageError> {
        let end = offset.checked_add(len).ok_or(StorageError::OutOfBounds)?;
        if end > self.shadow.len() {
            return Err(StorageError::OutOfBounds);
        }
        Ok(offset..end)
    }
}

impl StoragePort for NvsRegion {
    fn capacity(&self) -> usize {
        self.shadow.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        let range = self.span(offset, buf.len())?;
        buf.copy_from_slice(&self.shadow[range]);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        let range = self.span(offset, data.len())?;
        self.shadow[range].copy_from_slice(data);
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn commit(&mut self) -> Result<(), StorageError> {
        if self.fail_commits {
            return Err(StorageError::CommitFailed);
        }
        self.committed.copy_from_slice(&self.shadow);
        info!("NvsRegion: committed (simulation)");
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn commit(&mut self) -> Result<(), StorageError> {
        let shadow = &self.shadow;
        let result = with_nvs_handle(true, |handle| {
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    BLOB_KEY.as_ptr() as *const _,
                    shadow.as_ptr() as *const _,
                    shadow.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => {
                info!("NvsRegion: committed {} bytes", shadow.len());
                Ok(())
            }
            Err(e) => {
                warn!("NvsRegion: commit failed (err={})", e);
                Err(StorageError::CommitFailed)
            }
        }
    }
}

/// Open the region's namespace, run `f` with the handle, then close.
#[cfg(target_os = "espidf")]
fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
where
    F: FnOnce(nvs_handle_t) -> Result<T, i32>,
{
    let mut handle: nvs_handle_t = 0;
    let mode = if write {
        nvs_open_mode_t_NVS_READWRITE
    } else {
        nvs_open_mode_t_NVS_READONLY
    };

    let ret = unsafe { nvs_open(NAMESPACE.as_ptr() as *const _, mode, &mut handle) };
    if ret != ESP_OK {
        return Err(ret);
    }

    let result = f(handle);
    unsafe {
        nvs_close(handle);
    }
    result
}
