//! # strata-core
//!
//! A pull-based binary deserializer.
//!
//! This crate provides:
//! - A [`Deserializer`] decoding typed values from a forward-moving byte
//!   window, either over memory (zero-copy) or over a streaming
//!   [`ByteSource`]
//! - Two interchangeable encodings for unsigned 32-bit values: fixed-width
//!   big-endian or variable-length integers
//! - Bounded sub-readers over records located by a pluggable
//!   [`RecordFraming`] strategy
//!
//! ## Architecture
//!
//! - [`deserializer`]: window management, typed extraction, record framing
//! - [`source`]: the byte source capability and reader/file adapters
//! - [`varint`]: the variable-length integer codec
//! - [`layout`]: textual field layouts for generic dumping
//! - [`timer`]: elapsed-time reporting through `tracing`
//! - [`error`]: error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use strata_core::{Deserializer, DeserializerConfig, Encoding, FileSource, LengthPrefixed};
//!
//! let source = FileSource::open("records.bin")?;
//! let config = DeserializerConfig::new().encoding(Encoding::Varint);
//! let mut de = Deserializer::from_source(source, config);
//!
//! for record in de.records(&LengthPrefixed) {
//!     let mut record = record?;
//!     let id = record.read_u32()?;
//!     let name = record.read_string()?;
//!     println!("{id}: {name}");
//! }
//! # Ok::<(), strata_core::Error>(())
//! ```
//!
//! ## Extensibility
//!
//! - [`ByteSource`]: plug in any medium that can read, seek and close
//! - [`RecordFraming`]: describe where records end
//! - [`Extract`]: read custom types with [`Deserializer::extract`]
//!

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod deserializer;
pub mod error;
pub mod layout;
pub mod source;
pub mod timer;
pub mod varint;

// Re-export primary types for convenience
pub use deserializer::{
    Deserializer, DeserializerConfig, Encoding, Extract, Frame, LengthPrefixed, RawRead,
    RecordFraming, Records, Scalar, Terminated, DEFAULT_CHUNK_SIZE,
};
pub use error::{Error, Result};
pub use layout::{Field, Layout, Value};
pub use source::{ByteSource, FileSource, ReaderSource};
pub use timer::{TaskTimer, Verbosity};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
