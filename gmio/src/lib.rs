//! gmio - parallel sparse graph and matrix I/O
//!
//! This library ingests large textual edge lists, MatrixMarket files, and
//! adjacency-list graphs into in-memory COO arrays as fast as the I/O
//! subsystem allows, and persists/reloads them through a compact binary
//! snapshot format.
//!
//! Inputs are memory mapped and scanned by a pool of workers, each owning
//! a contiguous slice of the byte region; a counting pass sizes the output
//! arrays exactly, and a second pass populates them without any locking.
//! The same structure drives the writers in reverse: size, prefix-sum,
//! pre-extend the output file, emit in parallel.
//!
//! ```no_run
//! use gmio::{Coo, Flags};
//!
//! # fn main() -> gmio::Result<()> {
//! let flags = Flags::plain().with_weighted(true);
//! let coo = Coo::<u32, u64, f32>::from_file("edges.el", flags)?;
//! coo.save("edges.bin")?;
//! # Ok(())
//! # }
//! ```

// Re-export core functionality
pub use gmio_core::{
    Cursor, Emit, ErrorCategory, FileKind, Flags, GmioError, Label, MmField, MmPreamble,
    MmSymmetry, Weight, WeightKind,
};

mod coo;
mod csr;
mod error;
mod file_map;

pub use coo::Coo;
pub use csr::Csr;
pub use error::{Error, Result};
pub use file_map::FileMap;
