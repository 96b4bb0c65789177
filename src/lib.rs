//! Reader for the wpress sequential archive container.
//!
//! An archive is a run of fixed 4377-byte headers, each followed by the raw
//! content of one file, closed by an all-zero sentinel header.  No index,
//! checksum or compression layer exists; everything is found by walking the
//! stream from offset 0.

pub mod archive;
pub mod error;
pub mod header;
pub mod path;
pub mod scanner;
pub mod writer;

pub use archive::{CancelFlag, ExtractOptions, DEFAULT_CHUNK_SIZE};
pub use error::{ArchiveError, ErrorKind, Field, Result};
pub use header::{is_sentinel, sentinel_bytes, Header, HEADER_SIZE};
pub use scanner::{Entry, WpressReader};
pub use writer::WpressWriter;
