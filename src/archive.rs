//! Extraction options and cancellation.
//!
//! ```no_run
//! use wpress::{ExtractOptions, WpressReader};
//!
//! let mut reader = WpressReader::open("site.wpress")?;
//! let opts = ExtractOptions::new().output_dir("restore");
//! let n = reader.extract(&opts)?;
//! println!("{n} file(s) extracted");
//! # Ok::<(), wpress::ArchiveError>(())
//! ```

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default copy buffer: 64 KiB.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

// ── CancelFlag ────────────────────────────────────────────────────────────────

/// Shared flag checked between content chunks.  Clones observe the same flag,
/// so one can be handed to another thread or a signal handler.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

// ── ExtractOptions ────────────────────────────────────────────────────────────

/// Configuration for [`WpressReader::extract`](crate::WpressReader::extract).
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Destination root; the current directory when `None`.
    pub output_dir:     Option<PathBuf>,
    /// Bytes moved per read/write.  Affects speed only, never the output.
    pub chunk_size:     usize,
    /// Set each file's modification time from its Mtime field.
    pub preserve_mtime: bool,
    pub cancel:         Option<CancelFlag>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_dir:     None,
            chunk_size:     DEFAULT_CHUNK_SIZE,
            preserve_mtime: true,
            cancel:         None,
        }
    }
}

impl ExtractOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Zero is clamped to one byte.
    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.chunk_size = bytes.max(1);
        self
    }

    pub fn preserve_mtime(mut self, preserve: bool) -> Self {
        self.preserve_mtime = preserve;
        self
    }

    pub fn cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }
}
