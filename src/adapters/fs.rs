//! Flash filesystem adapter.
//!
//! Implements [`FilePort`] on top of `std::fs`, rooted at one directory.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: the SPIFFS partition is registered with
//!   the ESP-IDF VFS at `/spiffs`, after which `std::fs` reaches it.
//!   SPIFFS is flat, so `ir/3.dat` is a file name, not a directory.
//! - **all other targets**: a plain directory on the host; directories are
//!   created as needed and the partition size is simulated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{FileEntry, FilePort, StorageError, StorageUsage};

/// Mount point of the SPIFFS partition.
#[cfg(target_os = "espidf")]
pub const SPIFFS_BASE: &str = "/spiffs";

/// Simulated partition size on the host (1 MiB, like the device layout).
pub const SIM_CAPACITY_BYTES: u64 = 1024 * 1024;

fn map_io(e: &io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::StorageFull => StorageError::Full,
        _ => StorageError::IoError,
    }
}

pub struct FlashFs {
    root: PathBuf,
    #[cfg(not(target_os = "espidf"))]
    capacity_bytes: u64,
}

impl FlashFs {
    /// Use `root` as the filesystem root, creating it if needed.
    #[cfg(not(target_os = "espidf"))]
    pub fn open(root: impl Into<PathBuf>, capacity_bytes: u64) -> Result<Self, StorageError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| {
            warn!("FlashFs: cannot create {}: {}", root.display(), e);
            map_io(&e)
        })?;
        info!("FlashFs: rooted at {}", root.display());
        Ok(Self {
            root,
            capacity_bytes,
        })
    }

    /// Register SPIFFS with the VFS, formatting it on first boot.
    #[cfg(target_os = "espidf")]
    pub fn mount_spiffs() -> Result<Self, StorageError> {
        use esp_idf_svc::sys::{esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register, ESP_OK};

        let conf = esp_vfs_spiffs_conf_t {
            base_path: c"/spiffs".as_ptr(),
            partition_label: core::ptr::null(),
            max_files: 5,
            format_if_mount_failed: true,
        };
        // SAFETY: called once from the main task before any file access;
        // `conf` outlives the call and the strings are 'static.
        let ret = unsafe { esp_vfs_spiffs_register(&conf) };
        if ret != ESP_OK {
            warn!("FlashFs: SPIFFS mount failed ({})", ret);
            return Err(StorageError::IoError);
        }
        info!("FlashFs: SPIFFS mounted at {}", SPIFFS_BASE);
        Ok(Self {
            root: PathBuf::from(SPIFFS_BASE),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a relative `/`-separated path below the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        if path.is_empty()
            || path.starts_with('/')
            || path.contains('\\')
            || path.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.root.join(path))
    }

    fn walk(dir: &Path, prefix: &str, out: &mut Vec<FileEntry>) -> io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let rel = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };
            let meta = entry.metadata()?;
            if meta.is_dir() {
                Self::walk(&entry.path(), &rel, out)?;
            } else {
                out.push(FileEntry {
                    path: rel,
                    size: meta.len(),
                });
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn used_bytes(&self) -> Result<u64, StorageError> {
        Ok(self.list()?.iter().map(|e| e.size).sum())
    }
}

impl FilePort for FlashFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full = self.resolve(path)?;
        fs::read(&full).map_err(|e| map_io(&e))
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        let full = self.resolve(path)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let existing = fs::metadata(&full).map(|m| m.len()).unwrap_or(0);
            let used = self.used_bytes()?;
            if used - existing.min(used) + data.len() as u64 > self.capacity_bytes {
                warn!("FlashFs: {} does not fit ({} bytes)", path, data.len());
                return Err(StorageError::Full);
            }
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).map_err(|e| map_io(&e))?;
            }
        }

        fs::write(&full, data).map_err(|e| {
            warn!("FlashFs: write {} failed: {}", path, e);
            map_io(&e)
        })
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let full = self.resolve(path)?;
        match fs::remove_file(&full) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(map_io(&e)),
        }
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.is_file()).unwrap_or(false)
    }

    fn list(&self) -> Result<Vec<FileEntry>, StorageError> {
        let mut out = Vec::new();
        Self::walk(&self.root, "", &mut out).map_err(|e| map_io(&e))?;
        out.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(out)
    }

    #[cfg(not(target_os = "espidf"))]
    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage {
            total_bytes: self.capacity_bytes,
            used_bytes: self.used_bytes()?,
        })
    }

    #[cfg(target_os = "espidf")]
    fn usage(&self) -> Result<StorageUsage, StorageError> {
        use esp_idf_svc::sys::{esp_spiffs_info, ESP_OK};

        let mut total: usize = 0;
        let mut used: usize = 0;
        // SAFETY: null label selects the default SPIFFS partition mounted
        // in `mount_spiffs`; both out-pointers are valid locals.
        let ret = unsafe { esp_spiffs_info(core::ptr::null(), &mut total, &mut used) };
        if ret != ESP_OK {
            return Err(StorageError::IoError);
        }
        Ok(StorageUsage {
            total_bytes: total as u64,
            used_bytes: used as u64,
        })
    }
}
