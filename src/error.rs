//! Error type shared by the codec, the scanner and the writer.
//!
//! Every failure aborts the current scan.  Variants are grouped into coarse
//! [`ErrorKind`]s, which the binary turns into process exit codes.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// One of the four fixed-width header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Size,
    Mtime,
    Prefix,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Field::Name   => "name",
            Field::Size   => "size",
            Field::Mtime  => "mtime",
            Field::Prefix => "prefix",
        })
    }
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("truncated header at offset {offset}: read {read} of 4377 bytes")]
    TruncatedHeader { offset: u64, read: usize },

    #[error("unexpected end of content for {entry}: {missing} byte(s) missing")]
    TruncatedContent { entry: String, missing: u64 },

    #[error("malformed {field} field: {value:?}")]
    Format { field: Field, value: String },

    #[error("{field} field is {len} bytes, max allowed is {max}")]
    Oversize { field: Field, len: usize, max: usize },

    #[error("entry path escapes the output directory: {path}")]
    UnsafePath { path: String },

    #[error("extraction cancelled, {} is incomplete", .path.display())]
    Cancelled { path: PathBuf },
}

/// Coarse classification of [`ArchiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Format,
    Oversize,
    UnsafePath,
    Cancelled,
}

impl ArchiveError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ArchiveError::Io(_)
            | ArchiveError::TruncatedHeader { .. }
            | ArchiveError::TruncatedContent { .. } => ErrorKind::Io,
            ArchiveError::Format { .. }             => ErrorKind::Format,
            ArchiveError::Oversize { .. }           => ErrorKind::Oversize,
            ArchiveError::UnsafePath { .. }         => ErrorKind::UnsafePath,
            ArchiveError::Cancelled { .. }          => ErrorKind::Cancelled,
        }
    }

    /// Process exit status for this error (sysexits-style values).
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::Format     => 65,
            ErrorKind::Oversize   => 73,
            ErrorKind::Io         => 74,
            ErrorKind::UnsafePath => 77,
            ErrorKind::Cancelled  => 130,
        }
    }
}
