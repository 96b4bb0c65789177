//! Destination paths for extracted entries.
//!
//! Prefix and name fields are split on both `/` and `\`, whatever platform
//! produced the archive, and rebuilt with host separators.  Components that
//! would leave the output directory (`..`, roots, drive prefixes) are
//! rejected rather than rewritten.

use std::borrow::Cow;
use std::path::{Component, Path, PathBuf};

use crate::error::{ArchiveError, Field, Result};

/// Text of a zero-padded field: everything before the first zero byte, or the
/// whole buffer when there is none.
pub fn trim_nulls(buf: &[u8]) -> Cow<'_, str> {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end])
}

/// Human-readable `prefix/name` label used in logs and errors.
pub fn entry_label(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_owned()
    } else {
        format!("{prefix}/{name}")
    }
}

/// Absolute destination of an entry below `output_dir` (the current directory
/// when `None`).
pub fn compose_destination(
    output_dir: Option<&Path>,
    prefix:     &[u8],
    name:       &[u8],
) -> Result<PathBuf> {
    let base = match output_dir {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let mut dest = normalize(&std::path::absolute(base)?);

    let prefix = trim_nulls(prefix);
    let name   = trim_nulls(name);
    let label  = entry_label(&prefix, &name);

    push_components(&mut dest, &prefix, &label)?;
    if push_components(&mut dest, &name, &label)? == 0 {
        return Err(ArchiveError::Format { field: Field::Name, value: name.into_owned() });
    }
    Ok(dest)
}

/// Resolve `.` and `..` lexically.  `..` at the root stays at the root.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir    => {}
            Component::ParentDir => { out.pop(); }
            other                => out.push(other),
        }
    }
    out
}

fn push_components(dest: &mut PathBuf, raw: &str, label: &str) -> Result<usize> {
    let mut pushed = 0;
    for part in raw.split(['/', '\\']) {
        match part {
            "" | "." => continue,
            ".."     => return Err(ArchiveError::UnsafePath { path: label.to_owned() }),
            _        => {}
        }
        // Catches drive prefixes such as `C:` on Windows.
        let mut components = Path::new(part).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {
                dest.push(part);
                pushed += 1;
            }
            _ => return Err(ArchiveError::UnsafePath { path: label.to_owned() }),
        }
    }
    Ok(pushed)
}
