//! Error type for file-backed operations
//!
//! The core taxonomy ([`GmioError`]) covers everything decodable from
//! bytes; this enum adds the failure modes that only exist once real files
//! and allocations are involved.

use gmio_core::GmioError;
use std::collections::TryReserveError;
use thiserror::Error;

/// Errors raised by the loaders, converters, and writers
#[derive(Debug, Error)]
pub enum Error {
    /// Opening, mapping, sizing, or flushing a file failed
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    /// Format, width, contradiction, or unsupported-operation error
    #[error("{0}")]
    Core(GmioError),

    /// An output array could not be allocated
    #[error("output buffer allocation failed: {0}")]
    Alloc(#[from] TryReserveError),
}

impl From<GmioError> for Error {
    fn from(e: GmioError) -> Self {
        Error::Core(e)
    }
}

impl Error {
    /// The core error code, when this is a decode-level failure
    pub fn core(&self) -> Option<GmioError> {
        match self {
            Error::Core(e) => Some(*e),
            _ => None,
        }
    }
}

/// Result type for file-backed operations
pub type Result<T> = std::result::Result<T, Error>;
