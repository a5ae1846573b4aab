//! Persistent slot store.
//!
//! Maps slot IDs to waveform records on the flash filesystem.  Each slot is
//! one file, `ir/<id>.dat`, holding newline-separated decimals whose last
//! line is the carrier frequency in kHz.
//!
//! The store does not range-check IDs; callers decide which IDs are
//! addressable.  It owns the [`FilePort`] so the dispatcher can reach the
//! same filesystem for listings and the config wipe.

use core::fmt;
use log::{debug, info, warn};

use crate::app::codec::{self, Waveform};
use crate::app::ports::{FilePort, StorageError};
use crate::config::{MAX_RECORD_BYTES, WAVE_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotError {
    NotFound,
    Read(StorageError),
    Write(StorageError),
    /// More than ticks + carrier; nothing was written.
    CapacityExceeded,
}

impl fmt::Display for SlotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "slot empty"),
            Self::Read(e) => write!(f, "read failed: {}", e),
            Self::Write(e) => write!(f, "write failed: {}", e),
            Self::CapacityExceeded => write!(f, "more than {} values", WAVE_CAPACITY),
        }
    }
}

pub struct SlotStore<F: FilePort> {
    fs: F,
}

impl<F: FilePort> SlotStore<F> {
    pub fn new(fs: F) -> Self {
        Self { fs }
    }

    /// Record path for `id`.
    pub fn slot_path(id: u32) -> String {
        format!("ir/{}.dat", id)
    }

    /// Read a slot.  Oversized records are truncated to the first
    /// [`WAVE_CAPACITY`] values with a warning.
    pub fn load(&self, id: u32) -> Result<Waveform, SlotError> {
        let path = Self::slot_path(id);
        let bytes = match self.fs.read(&path) {
            Ok(b) => b,
            Err(StorageError::NotFound) => return Err(SlotError::NotFound),
            Err(e) => {
                warn!("Slots: read {} failed: {}", path, e);
                return Err(SlotError::Read(e));
            }
        };
        if bytes.len() as u64 > MAX_RECORD_BYTES {
            warn!(
                "Slots: {} is {} bytes (limit {})",
                path,
                bytes.len(),
                MAX_RECORD_BYTES
            );
        }
        let record = codec::decode_record(&bytes);
        if record.dropped > 0 {
            warn!(
                "Slots: {} holds {} values, kept the first {}",
                path,
                record.values.len() + record.dropped,
                WAVE_CAPACITY
            );
        }
        debug!("Slots: loaded {} ({} values)", path, record.values.len());
        Ok(record.values)
    }

    /// Replace the content of a slot.
    pub fn save(&mut self, id: u32, values: &[u32]) -> Result<(), SlotError> {
        if values.len() > WAVE_CAPACITY {
            warn!(
                "Slots: refusing {} values for slot {} (max {})",
                values.len(),
                id,
                WAVE_CAPACITY
            );
            return Err(SlotError::CapacityExceeded);
        }
        let path = Self::slot_path(id);
        let text = codec::encode_record(values);
        self.fs
            .write(&path, text.as_bytes())
            .map_err(SlotError::Write)?;
        info!("Slots: wrote {} ({} values)", path, values.len());
        Ok(())
    }

    /// Remove a slot record.
    pub fn delete(&mut self, id: u32) -> Result<(), SlotError> {
        let path = Self::slot_path(id);
        if !self.fs.exists(&path) {
            return Err(SlotError::NotFound);
        }
        self.fs.remove(&path).map_err(SlotError::Write)?;
        info!("Slots: deleted {}", path);
        Ok(())
    }

    /// Underlying filesystem, for listings.
    pub fn files(&self) -> &F {
        &self.fs
    }

    pub fn files_mut(&mut self) -> &mut F {
        &mut self.fs
    }
}
