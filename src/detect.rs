//! Source file sniffing.
//!
//! Readers are lenient about leading garbage, so the `%PDF-` marker is
//! searched for anywhere in the first kilobyte rather than only at offset 0.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";
const HEADER_WINDOW: usize = 1024;

/// Verify that `path` names a readable PDF and return its declared version.
///
/// A missing or unreadable file is reported as [`Error::Input`] so callers
/// can tell "wrong path" apart from "not a PDF" ([`Error::UnknownFormat`]).
pub fn check_source<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| Error::Input {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut header = Vec::with_capacity(HEADER_WINDOW);
    file.by_ref()
        .take(HEADER_WINDOW as u64)
        .read_to_end(&mut header)
        .map_err(|e| Error::Input {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    pdf_version(&header).ok_or(Error::UnknownFormat)
}

/// Find the `%PDF-x.y` marker in a header window.
pub fn pdf_version(header: &[u8]) -> Option<String> {
    let start = header
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)?
        + PDF_MAGIC.len();
    let version = header.get(start..start + 3)?;

    match version {
        [major, b'.', minor] if major.is_ascii_digit() && minor.is_ascii_digit() => {
            Some(String::from_utf8_lossy(version).into_owned())
        }
        _ => None,
    }
}
