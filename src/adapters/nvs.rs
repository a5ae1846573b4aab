//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`SettingsPort`]: the autosend flag lives in one postcard blob
//! under namespace `irtrans`, key `settings`.  It is kept apart from the
//! flash filesystem so that wiping `config.json` does not reset it.
//!
//! - **`target_os = "espidf"`**: `nvs_*` FFI on the default partition.
//! - **all other targets**: an in-memory map (lost on process exit).

use crate::app::ports::{ConfigError, SettingsPort};
use crate::config::DeviceSettings;
use log::info;

#[cfg(target_os = "espidf")]
use log::warn;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const SETTINGS_NAMESPACE: &str = "irtrans";
const SETTINGS_KEY: &str = "settings";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 64;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased and
    /// re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn key_buf(key: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let kb = key.as_bytes();
        let kl = kb.len().min(15);
        buf[..kl].copy_from_slice(&kb[..kl]);
        buf
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let key = Self::composite_key(SETTINGS_NAMESPACE, SETTINGS_KEY);
        Ok(self.store.borrow().get(&key).cloned())
    }

    #[cfg(target_os = "espidf")]
    fn read_blob(&self) -> Result<Option<Vec<u8>>, ConfigError> {
        let result = Self::with_nvs_handle(SETTINGS_NAMESPACE, false, |handle| {
            let key = Self::key_buf(SETTINGS_KEY);
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });

        match result {
            Ok(bytes) => Ok(Some(bytes)),
            // A namespace that was never written cannot be opened read-only.
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(None),
            Err(e) => {
                warn!("NvsAdapter: NVS read error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn write_blob(&mut self, bytes: Vec<u8>) -> Result<(), ConfigError> {
        let key = Self::composite_key(SETTINGS_NAMESPACE, SETTINGS_KEY);
        self.store.borrow_mut().insert(key, bytes);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(&mut self, bytes: Vec<u8>) -> Result<(), ConfigError> {
        let result = Self::with_nvs_handle(SETTINGS_NAMESPACE, true, |handle| {
            let key = Self::key_buf(SETTINGS_KEY);
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
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
        result.map_err(|e| {
            warn!("NvsAdapter: NVS write error {}", e);
            ConfigError::IoError
        })
    }
}

impl SettingsPort for NvsAdapter {
    fn load(&self) -> Result<DeviceSettings, ConfigError> {
        match self.read_blob()? {
            Some(bytes) => {
                let settings: DeviceSettings =
                    postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded settings ({} bytes)", bytes.len());
                Ok(settings)
            }
            None => {
                info!("NvsAdapter: no stored settings, using defaults");
                Ok(DeviceSettings::default())
            }
        }
    }

    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        let bytes = postcard::to_allocvec(settings).map_err(|_| ConfigError::IoError)?;
        let len = bytes.len();
        self.write_blob(bytes)?;
        info!("NvsAdapter: settings saved ({} bytes)", len);
        Ok(())
    }
}
