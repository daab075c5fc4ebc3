//! Atomic output writing.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Write a file by filling a temporary sibling and renaming it into place.
///
/// The final path either keeps its previous contents or receives the
/// complete new file; a failure inside `write` leaves nothing behind.
pub fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;

    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Copy an existing file to `dest` atomically.
pub fn copy_atomically(src: &Path, dest: &Path) -> Result<()> {
    let mut input = File::open(src)?;
    write_atomically(dest, |out| {
        io::copy(&mut input, out)?;
        Ok(())
    })
}
