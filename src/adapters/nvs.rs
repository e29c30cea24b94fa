//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] and [`StoragePort`] for the remote.  The
//! configuration lives as a postcard blob under `remote/config`; device
//! state (the last known channel) goes through [`StoragePort`] under its
//! own namespace.
//!
//! On ESP-IDF every call opens the namespace, acts, commits and closes.
//! Host builds keep an in-memory map so the simulation and the tests share
//! the same code paths above the adapter.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::RemoteConfig;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "remote";
const CONFIG_KEY: &str = "config";

/// Largest config blob accepted from flash.
const MAX_CONFIG_BLOB: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.  A partition left full or written by a newer
    /// IDF is erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any NVS access.
            let mut ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing partition ({})", ret);
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                ret = unsafe { nvs_flash_init() };
            }
            if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NVS: ready");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// NVS names are at most 15 bytes plus the terminator.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let len = name.len().min(15);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        buf
    }

    #[cfg(target_os = "espidf")]
    fn with_handle<T>(
        namespace: &str,
        write: bool,
        f: impl FnOnce(nvs_handle_t) -> Result<T, esp_err_t>,
    ) -> Result<T, esp_err_t> {
        let ns = Self::c_name(namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        // SAFETY: `ns` is NUL-terminated and outlives the call.
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle).and_then(|v| {
            if write {
                // SAFETY: handle was opened read-write above.
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
            }
            Ok(v)
        });
        // SAFETY: handle is valid until closed here.
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn map_err(e: esp_err_t) -> StorageError {
        match e {
            ESP_ERR_NVS_NOT_FOUND => StorageError::NotFound,
            ESP_ERR_NVS_NOT_ENOUGH_SPACE => StorageError::Full,
            ESP_ERR_NVS_INVALID_LENGTH => StorageError::BufferTooSmall,
            _ => StorageError::IoError,
        }
    }

    /// Forget the stored configuration.  The next boot falls back to the
    /// compiled-in board layout.
    pub fn clear_config(&mut self) -> Result<(), StorageError> {
        self.delete(CONFIG_NAMESPACE, CONFIG_KEY)
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<RemoteConfig, ConfigError> {
        let mut buf = [0u8; MAX_CONFIG_BLOB];
        let len = match self.read(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("NVS: no stored config");
                return Err(ConfigError::NotFound);
            }
            Err(StorageError::BufferTooSmall) => return Err(ConfigError::Corrupted),
            Err(e) => {
                warn!("NVS: config read failed: {}", e);
                return Err(ConfigError::IoError);
            }
        };
        let config: RemoteConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        info!("NVS: loaded config ({} bytes)", len);
        Ok(config)
    }

    fn save(&self, config: &RemoteConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;
        if bytes.len() > MAX_CONFIG_BLOB {
            return Err(ConfigError::StorageFull);
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY), bytes.clone());
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(CONFIG_KEY);
            Self::with_handle(CONFIG_NAMESPACE, true, |h| {
                // SAFETY: key is NUL-terminated, bytes outlive the call.
                let ret = unsafe {
                    nvs_set_blob(h, key.as_ptr() as *const _, bytes.as_ptr() as *const _, bytes.len())
                };
                if ret == ESP_OK { Ok(()) } else { Err(ret) }
            })
            .map_err(|e| match Self::map_err(e) {
                StorageError::Full => ConfigError::StorageFull,
                _ => ConfigError::IoError,
            })?;
        }

        info!("NVS: config saved ({} bytes)", bytes.len());
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let store = self.store.borrow();
            let data = store
                .get(&Self::composite_key(namespace, key))
                .ok_or(StorageError::NotFound)?;
            if data.len() > buf.len() {
                return Err(StorageError::BufferTooSmall);
            }
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = Self::c_name(key);
            Self::with_handle(namespace, false, |h| {
                let mut size = buf.len();
                // SAFETY: buf is valid for `size` bytes.
                let ret = unsafe {
                    nvs_get_blob(h, k.as_ptr() as *const _, buf.as_mut_ptr() as *mut _, &mut size)
                };
                if ret == ESP_OK { Ok(size) } else { Err(ret) }
            })
            .map_err(Self::map_err)
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = Self::c_name(key);
            Self::with_handle(namespace, true, |h| {
                // SAFETY: data outlives the call.
                let ret = unsafe {
                    nvs_set_blob(h, k.as_ptr() as *const _, data.as_ptr() as *const _, data.len())
                };
                if ret == ESP_OK { Ok(()) } else { Err(ret) }
            })
            .map_err(Self::map_err)
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let k = Self::c_name(key);
            let res = Self::with_handle(namespace, true, |h| {
                // SAFETY: handle open read-write.
                let ret = unsafe { nvs_erase_key(h, k.as_ptr() as *const _) };
                if ret == ESP_OK || ret == ESP_ERR_NVS_NOT_FOUND {
                    Ok(())
                } else {
                    Err(ret)
                }
            });
            match res {
                // Opening a namespace that was never written also reports NOT_FOUND.
                Err(ESP_ERR_NVS_NOT_FOUND) => Ok(()),
                other => other.map_err(Self::map_err),
            }
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow()
                .contains_key(&Self::composite_key(namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let k = Self::c_name(key);
            Self::with_handle(namespace, false, |h| {
                // SAFETY: type pointer may be null.
                let ret = unsafe { nvs_find_key(h, k.as_ptr() as *const _, core::ptr::null_mut()) };
                Ok(ret == ESP_OK)
            })
            .unwrap_or(false)
        }
    }
}
