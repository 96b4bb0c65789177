//! Fixed-width entry header: codec and sentinel detection.
//!
//! # Layout
//!
//! | Field  | Offset | Width | Contents                                  |
//! |--------|--------|-------|-------------------------------------------|
//! | Name   |      0 |   255 | file name, no path separators             |
//! | Size   |    255 |    14 | content length, decimal ASCII             |
//! | Mtime  |    269 |    12 | last modification, unix seconds, decimal  |
//! | Prefix |    281 |  4096 | directory path, no trailing separator     |
//!
//! Every field is zero-padded on write and read up to its first zero byte.
//! A block of [`HEADER_SIZE`] zero bytes is the end-of-archive sentinel.

use std::fmt;
use std::io::{self, Write};

use crate::error::{ArchiveError, Field, Result};
use crate::path::trim_nulls;

pub const NAME_SIZE:    usize = 255;
pub const SIZE_SIZE:    usize = 14;
pub const MTIME_SIZE:   usize = 12;
pub const PREFIX_SIZE:  usize = 4096;

pub const NAME_OFFSET:   usize = 0;
pub const SIZE_OFFSET:   usize = NAME_OFFSET + NAME_SIZE;
pub const MTIME_OFFSET:  usize = SIZE_OFFSET + SIZE_SIZE;
pub const PREFIX_OFFSET: usize = MTIME_OFFSET + MTIME_SIZE;

/// Width of one header block on disk.
pub const HEADER_SIZE: usize = PREFIX_OFFSET + PREFIX_SIZE;

const _: () = assert!(HEADER_SIZE == 4377);

/// One raw header block.
pub type HeaderBlock = [u8; HEADER_SIZE];

/// Decoded header.  Fields are the raw, zero-padded on-disk buffers.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    pub name:   [u8; NAME_SIZE],
    pub size:   [u8; SIZE_SIZE],
    pub mtime:  [u8; MTIME_SIZE],
    pub prefix: [u8; PREFIX_SIZE],
}

impl Header {
    // ── Decoding ─────────────────────────────────────────────────────────────

    pub fn decode(block: &HeaderBlock) -> Self {
        Self {
            name:   slice_field(block, NAME_OFFSET),
            size:   slice_field(block, SIZE_OFFSET),
            mtime:  slice_field(block, MTIME_OFFSET),
            prefix: slice_field(block, PREFIX_OFFSET),
        }
    }

    /// Declared content length.
    pub fn parse_size(&self) -> Result<u64> {
        parse_decimal(Field::Size, &self.size)
    }

    /// Last modification time in unix seconds.
    pub fn parse_mtime(&self) -> Result<u64> {
        parse_decimal(Field::Mtime, &self.mtime)
    }

    pub fn name_lossy(&self) -> String {
        trim_nulls(&self.name).into_owned()
    }

    pub fn prefix_lossy(&self) -> String {
        trim_nulls(&self.prefix).into_owned()
    }

    // ── Encoding ─────────────────────────────────────────────────────────────

    /// Build a header from entry metadata.  An empty `prefix` marks a
    /// root-level entry.
    pub fn from_metadata(name: &str, size: u64, mtime: u64, prefix: &str) -> Result<Self> {
        Ok(Self {
            name:   fill_field(Field::Name, name.as_bytes())?,
            size:   fill_field(Field::Size, size.to_string().as_bytes())?,
            mtime:  fill_field(Field::Mtime, mtime.to_string().as_bytes())?,
            prefix: fill_field(Field::Prefix, prefix.as_bytes())?,
        })
    }

    pub fn to_bytes(&self) -> HeaderBlock {
        let mut block = [0u8; HEADER_SIZE];
        block[NAME_OFFSET..SIZE_OFFSET].copy_from_slice(&self.name);
        block[SIZE_OFFSET..MTIME_OFFSET].copy_from_slice(&self.size);
        block[MTIME_OFFSET..PREFIX_OFFSET].copy_from_slice(&self.mtime);
        block[PREFIX_OFFSET..].copy_from_slice(&self.prefix);
        block
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())
    }
}

impl fmt::Debug for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Header")
            .field("name", &trim_nulls(&self.name))
            .field("size", &trim_nulls(&self.size))
            .field("mtime", &trim_nulls(&self.mtime))
            .field("prefix", &trim_nulls(&self.prefix))
            .finish()
    }
}

// ── Sentinel ──────────────────────────────────────────────────────────────────

pub fn is_sentinel(block: &HeaderBlock) -> bool {
    block.iter().all(|&b| b == 0)
}

pub fn sentinel_bytes() -> HeaderBlock {
    [0u8; HEADER_SIZE]
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn slice_field<const N: usize>(block: &HeaderBlock, offset: usize) -> [u8; N] {
    let mut field = [0u8; N];
    field.copy_from_slice(&block[offset..offset + N]);
    field
}

fn fill_field<const N: usize>(field: Field, bytes: &[u8]) -> Result<[u8; N]> {
    if bytes.len() > N {
        return Err(ArchiveError::Oversize { field, len: bytes.len(), max: N });
    }
    let mut buf = [0u8; N];
    buf[..bytes.len()].copy_from_slice(bytes);
    Ok(buf)
}

fn parse_decimal(field: Field, raw: &[u8]) -> Result<u64> {
    let text = trim_nulls(raw);
    let malformed = || ArchiveError::Format { field, value: text.to_string() };
    // `u64::from_str` accepts a leading '+', the format does not.
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    text.parse::<u64>().map_err(|_| malformed())
}
