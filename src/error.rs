//! Unified error type for the gateway firmware.
//!
//! Port-level errors stay small and `Copy`, next to their traits.  The boot
//! path funnels them into [`Error`] so `main` can report any failure through
//! `anyhow` with one `?`.

use core::fmt;

use crate::app::ports::{ConfigError, IrError, StorageError, TransportError};
use crate::store::SlotError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    Storage(StorageError),
    Config(ConfigError),
    Slot(SlotError),
    Transport(TransportError),
    Ir(IrError),
    /// Peripheral initialisation failed.
    Init(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Slot(e) => write!(f, "slot: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Ir(e) => write!(f, "ir: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<SlotError> for Error {
    fn from(e: SlotError) -> Self {
        Self::Slot(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<IrError> for Error {
    fn from(e: IrError) -> Self {
        Self::Ir(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
