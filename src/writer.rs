//! Sequential archive writer.
//!
//! [`WpressWriter`] appends caller-supplied entries (header followed by the
//! content bytes) to any [`Write`] sink and terminates the stream with the
//! sentinel block on [`finish`](WpressWriter::finish).  It never walks a
//! directory tree; callers decide what goes in.

use std::io::{self, Read, Write};

use crate::error::{ArchiveError, Result};
use crate::header::{sentinel_bytes, Header};
use crate::path::entry_label;

pub struct WpressWriter<W: Write> {
    writer:  W,
    entries: usize,
}

impl<W: Write> WpressWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, entries: 0 }
    }

    /// Append one entry whose content is already in memory.
    pub fn add_entry(&mut self, name: &str, prefix: &str, mtime: u64, data: &[u8]) -> Result<()> {
        let header = Header::from_metadata(name, data.len() as u64, mtime, prefix)?;
        header.write(&mut self.writer)?;
        self.writer.write_all(data)?;
        self.entries += 1;
        Ok(())
    }

    /// Append one entry of exactly `size` bytes streamed from `content`.
    pub fn add_entry_from_reader<R: Read>(
        &mut self,
        name:    &str,
        prefix:  &str,
        mtime:   u64,
        size:    u64,
        content: R,
    ) -> Result<()> {
        let header = Header::from_metadata(name, size, mtime, prefix)?;
        header.write(&mut self.writer)?;
        let copied = io::copy(&mut content.take(size), &mut self.writer)?;
        if copied != size {
            return Err(ArchiveError::TruncatedContent {
                entry:   entry_label(prefix, name),
                missing: size - copied,
            });
        }
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Write the sentinel block and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        self.writer.write_all(&sentinel_bytes())?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}
