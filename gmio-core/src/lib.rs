#![no_std]

//! GMIO Core - sparse graph and matrix wire format specification
//!
//! This crate provides the pure specification layer for gmio: the text and
//! binary grammars, structural filter rules, and validation primitives used
//! by the I/O crate.
//!
//! ## Architecture
//!
//! This crate has no I/O dependencies and works in no-std environments:
//! - **Cursor and scanner**: byte-level navigation and token decoding over
//!   an in-memory region
//! - **Format definitions**: magic bytes, file kinds, and the MatrixMarket
//!   preamble grammar
//! - **Structural flags**: the construction-time filter table applied to
//!   every parsed entry
//! - **Element traits**: numeric label and weight types admissible in the
//!   stored arrays
//! - **Error taxonomy**: classified error codes shared by every consumer

pub mod cursor;
pub mod error;
pub mod flags;
pub mod format;
pub mod scan;
pub mod traits;

// Re-export core types for convenience
pub use cursor::Cursor;
pub use error::{ErrorCategory, GmioError};
pub use flags::{Emit, Flags};
pub use format::{FileKind, MmField, MmPreamble, MmSymmetry};
pub use traits::{Label, Weight, WeightKind};
