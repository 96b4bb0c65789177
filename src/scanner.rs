//! Sequential archive reader.
//!
//! # How it works
//!
//! Every operation is one pass of the same loop: rewind to offset 0, read a
//! [`HEADER_SIZE`] block, stop at the all-zero sentinel, otherwise decode the
//! header and hand its content to a per-entry action.  Extraction streams the
//! content into a file, counting and listing skip over it.  Whatever content
//! an action leaves unread is skipped before the next header is read, so the
//! cursor always sits on a header boundary at the top of the loop.
//!
//! # Failure model
//!
//! Any deviation from exactly `HEADER_SIZE` bytes at a header boundary,
//! including a clean end of stream, is [`ArchiveError::TruncatedHeader`]: a
//! well-formed archive always ends with the sentinel.  A zero-byte read while
//! content is still pending is [`ArchiveError::TruncatedContent`].  Every
//! error aborts the pass and no partial count is returned.
//!
//! Memory use is bounded by one header block plus one `chunk_size` buffer.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::archive::ExtractOptions;
use crate::error::{ArchiveError, Result};
use crate::header::{is_sentinel, Header, HeaderBlock, HEADER_SIZE};
use crate::path::{compose_destination, entry_label};

// ── Entry ─────────────────────────────────────────────────────────────────────

/// Listing record for one archive entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub name:           String,
    pub prefix:         String,
    pub size:           u64,
    /// `None` when the Mtime field is not a decimal number.
    pub mtime:          Option<u64>,
    /// Absolute byte offset of the header block.
    pub header_offset:  u64,
    /// Absolute byte offset of the first content byte.
    pub content_offset: u64,
}

impl Entry {
    /// `prefix/name` as stored in the archive.
    pub fn path(&self) -> String {
        entry_label(&self.prefix, &self.name)
    }
}

// ── EntryContent ──────────────────────────────────────────────────────────────

/// The `size` content bytes that follow one header.  Borrowed from the reader
/// for the duration of one entry action.
pub(crate) struct EntryContent<'a, R> {
    inner:       &'a mut R,
    position:    &'a mut u64,
    archive_len: u64,
    remaining:   u64,
    header:      &'a Header,
}

impl<R: Read + Seek> EntryContent<'_, R> {
    /// Absolute offset of the next unread content byte.
    pub(crate) fn offset(&self) -> u64 {
        *self.position
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Copy every remaining byte into `sink`, one `buf`-sized chunk at a time.
    /// `opts.cancel` is checked before each chunk; `dest` names the sink in a
    /// cancellation error.
    fn copy_to<W: Write>(
        &mut self,
        sink: &mut W,
        buf:  &mut [u8],
        opts: &ExtractOptions,
        dest: &Path,
    ) -> Result<()> {
        while self.remaining > 0 {
            if opts.is_cancelled() {
                return Err(ArchiveError::Cancelled { path: dest.to_path_buf() });
            }
            let want = usize::try_from(self.remaining).map_or(buf.len(), |r| r.min(buf.len()));
            let n = match self.inner.read(&mut buf[..want]) {
                Ok(0) => return Err(self.truncated(self.remaining)),
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            sink.write_all(&buf[..n])?;
            self.remaining -= n as u64;
            *self.position += n as u64;
        }
        Ok(())
    }

    /// Advance past every remaining byte without reading it.
    fn skip(&mut self) -> Result<()> {
        if self.remaining == 0 {
            return Ok(());
        }
        let available = self.archive_len.saturating_sub(*self.position);
        if available < self.remaining {
            return Err(self.truncated(self.remaining - available));
        }
        let target = *self.position + self.remaining;
        self.inner.seek(SeekFrom::Start(target))?;
        *self.position = target;
        self.remaining = 0;
        Ok(())
    }

    fn truncated(&self, missing: u64) -> ArchiveError {
        ArchiveError::TruncatedContent {
            entry: entry_label(&self.header.prefix_lossy(), &self.header.name_lossy()),
            missing,
        }
    }
}

// ── WpressReader ──────────────────────────────────────────────────────────────

/// Owns the archive stream and its cursor.  The stream is released when the
/// reader is dropped.
pub struct WpressReader<R> {
    inner:    R,
    len:      u64,
    position: u64,
}

impl WpressReader<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> WpressReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self { inner, len, position: 0 })
    }

    /// Archive length in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    // ── Operations ───────────────────────────────────────────────────────────

    /// Extract every entry below `opts.output_dir` and return how many were
    /// written.
    pub fn extract(&mut self, opts: &ExtractOptions) -> Result<usize> {
        let mut buf = vec![0u8; opts.chunk_size.max(1)];
        self.scan(|header, content| {
            let dest = compose_destination(opts.output_dir.as_deref(), &header.prefix, &header.name)?;
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            let size = content.remaining();
            let mut file = File::create(&dest)?;
            content.copy_to(&mut file, &mut buf, opts, &dest)?;

            if opts.preserve_mtime {
                match header.parse_mtime() {
                    Ok(secs) => file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))?,
                    Err(e)   => warn!(path = %dest.display(), error = %e, "mtime not restored"),
                }
            }
            debug!(path = %dest.display(), size, "extracted");
            Ok(())
        })
    }

    /// Count entries without touching the filesystem.
    pub fn count_entries(&mut self) -> Result<usize> {
        self.scan(|_, content| content.skip())
    }

    /// List every entry with its offsets, skipping all content.
    pub fn entries(&mut self) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        self.scan(|header, content| {
            let mtime = match header.parse_mtime() {
                Ok(secs) => Some(secs),
                Err(e) => {
                    warn!(entry = %header.name_lossy(), error = %e, "unreadable mtime");
                    None
                }
            };
            let content_offset = content.offset();
            entries.push(Entry {
                name:          header.name_lossy(),
                prefix:        header.prefix_lossy(),
                size:          content.remaining(),
                mtime,
                header_offset: content_offset - HEADER_SIZE as u64,
                content_offset,
            });
            content.skip()
        })?;
        Ok(entries)
    }

    // ── Scan primitive ───────────────────────────────────────────────────────

    fn scan<F>(&mut self, mut action: F) -> Result<usize>
    where
        F: FnMut(&Header, &mut EntryContent<'_, R>) -> Result<()>,
    {
        self.inner.seek(SeekFrom::Start(0))?;
        self.position = 0;

        let mut count = 0usize;
        loop {
            let offset = self.position;
            let block  = self.read_header_block()?;
            if is_sentinel(&block) {
                trace!(offset, count, "sentinel");
                return Ok(count);
            }

            let header = Header::decode(&block);
            let size   = header.parse_size()?;
            trace!(offset, size, name = %header.name_lossy(), "header");

            let mut content = EntryContent {
                inner:       &mut self.inner,
                position:    &mut self.position,
                archive_len: self.len,
                remaining:   size,
                header:      &header,
            };
            action(&header, &mut content)?;
            content.skip()?;
            count += 1;
        }
    }

    fn read_header_block(&mut self) -> Result<HeaderBlock> {
        let offset = self.position;
        let mut block = [0u8; HEADER_SIZE];
        let read = read_full(&mut self.inner, &mut block)?;
        self.position += read as u64;
        if read != HEADER_SIZE {
            return Err(ArchiveError::TruncatedHeader { offset, read });
        }
        Ok(block)
    }
}

/// Fill `buf` from `reader`, stopping early only at end of stream.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::CancelFlag;
    use crate::header::sentinel_bytes;
    use crate::writer::WpressWriter;
    use std::io::Cursor;

    /// Hands out at most one byte per `read` call.
    struct Trickle<R>(R);

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    impl<R: Seek> Seek for Trickle<R> {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.0.seek(pos)
        }
    }

    fn two_entry_archive() -> Vec<u8> {
        let pattern: Vec<u8> = (0..600u32).map(|i| (i % 251) as u8).collect();
        let mut w = WpressWriter::new(Vec::new());
        w.add_entry("a.txt", "", 1_700_000_000, b"hello").unwrap();
        w.add_entry("b.txt", "sub", 1_700_000_001, &pattern).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn counts_entries() {
        let mut r = WpressReader::new(Cursor::new(two_entry_archive())).unwrap();
        assert_eq!(r.count_entries().unwrap(), 2);
        // Every pass rewinds.
        assert_eq!(r.count_entries().unwrap(), 2);
    }

    #[test]
    fn sentinel_only_archive_is_empty() {
        let mut r = WpressReader::new(Cursor::new(sentinel_bytes().to_vec())).unwrap();
        assert_eq!(r.count_entries().unwrap(), 0);
        assert!(r.entries().unwrap().is_empty());
    }

    #[test]
    fn missing_sentinel_is_truncated_header() {
        let mut bytes = two_entry_archive();
        bytes.truncate(bytes.len() - HEADER_SIZE);
        let end = bytes.len() as u64;
        let mut r = WpressReader::new(Cursor::new(bytes)).unwrap();
        match r.count_entries() {
            Err(ArchiveError::TruncatedHeader { offset, read: 0 }) => assert_eq!(offset, end),
            other => panic!("expected truncated header, got {other:?}"),
        }
    }

    #[test]
    fn partial_header_is_truncated_header() {
        let mut r = WpressReader::new(Cursor::new(vec![0u8; 100])).unwrap();
        assert!(matches!(
            r.count_entries(),
            Err(ArchiveError::TruncatedHeader { offset: 0, read: 100 })
        ));
    }

    #[test]
    fn skipping_past_end_is_truncated_content() {
        let mut w = WpressWriter::new(Vec::new());
        w.add_entry("big.bin", "data", 0, &[7u8; 50]).unwrap();
        let mut bytes = w.finish().unwrap();
        bytes.truncate(HEADER_SIZE + 20);

        let mut r = WpressReader::new(Cursor::new(bytes)).unwrap();
        match r.count_entries() {
            Err(ArchiveError::TruncatedContent { entry, missing }) => {
                assert_eq!(entry, "data/big.bin");
                assert_eq!(missing, 30);
            }
            other => panic!("expected truncated content, got {other:?}"),
        }
    }

    #[test]
    fn bad_size_field_is_format_error() {
        let mut block = Header::from_metadata("a", 0, 0, "").unwrap().to_bytes();
        block[crate::header::SIZE_OFFSET] = b'x';
        let mut bytes = block.to_vec();
        bytes.extend_from_slice(&sentinel_bytes());

        let mut r = WpressReader::new(Cursor::new(bytes)).unwrap();
        assert!(matches!(r.count_entries(), Err(ArchiveError::Format { .. })));
    }

    #[test]
    fn entries_report_offsets() {
        let mut r = WpressReader::new(Cursor::new(two_entry_archive())).unwrap();
        let entries = r.entries().unwrap();
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].path(), "a.txt");
        assert_eq!(entries[0].header_offset, 0);
        assert_eq!(entries[0].content_offset, HEADER_SIZE as u64);
        assert_eq!(entries[0].size, 5);
        assert_eq!(entries[0].mtime, Some(1_700_000_000));

        assert_eq!(entries[1].path(), "sub/b.txt");
        assert_eq!(entries[1].header_offset, HEADER_SIZE as u64 + 5);
        assert_eq!(entries[1].content_offset, 2 * HEADER_SIZE as u64 + 5);
        assert_eq!(entries[1].size, 600);
    }

    #[test]
    fn copy_survives_short_reads() {
        let bytes = two_entry_archive();
        let mut r = WpressReader::new(Trickle(Cursor::new(bytes))).unwrap();
        let header = Header::from_metadata("b.txt", 600, 0, "sub").unwrap();

        // Position the cursor on the second entry's content by hand.
        let start = 2 * HEADER_SIZE as u64 + 5;
        r.inner.seek(SeekFrom::Start(start)).unwrap();
        r.position = start;

        let mut content = EntryContent {
            inner:       &mut r.inner,
            position:    &mut r.position,
            archive_len: r.len,
            remaining:   600,
            header:      &header,
        };
        let mut out = Vec::new();
        let mut buf = [0u8; 512];
        content
            .copy_to(&mut out, &mut buf, &ExtractOptions::default(), Path::new("b.txt"))
            .unwrap();
        assert_eq!(out.len(), 600);
        assert_eq!(out[599], (599 % 251) as u8);
        assert_eq!(r.position, start + 600);
    }

    #[test]
    fn zero_read_with_bytes_pending_is_fatal() {
        let header = Header::from_metadata("c", 10, 0, "").unwrap();
        let mut inner = Cursor::new(vec![1u8; 4]);
        let mut position = 0u64;
        let mut content = EntryContent {
            inner:       &mut inner,
            position:    &mut position,
            archive_len: 4,
            remaining:   10,
            header:      &header,
        };
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        match content.copy_to(&mut out, &mut buf, &ExtractOptions::default(), Path::new("c")) {
            Err(ArchiveError::TruncatedContent { missing: 6, .. }) => {}
            other => panic!("expected truncated content, got {other:?}"),
        }
        assert_eq!(out, vec![1u8; 4]);
    }

    #[test]
    fn cancelled_copy_stops_between_chunks() {
        let header = Header::from_metadata("d", 8, 0, "").unwrap();
        let mut inner = Cursor::new(vec![2u8; 8]);
        let mut position = 0u64;
        let mut content = EntryContent {
            inner:       &mut inner,
            position:    &mut position,
            archive_len: 8,
            remaining:   8,
            header:      &header,
        };
        let flag = CancelFlag::new();
        flag.cancel();
        let opts = ExtractOptions::new().cancel_flag(flag);
        let mut out = Vec::new();
        let mut buf = [0u8; 4];
        match content.copy_to(&mut out, &mut buf, &opts, Path::new("out/d")) {
            Err(ArchiveError::Cancelled { path }) => assert_eq!(path, Path::new("out/d")),
            other => panic!("expected cancellation, got {other:?}"),
        }
        assert!(out.is_empty());
        assert_eq!(content.remaining(), 8);
    }
}
