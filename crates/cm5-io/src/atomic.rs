//! Crash-safe file replacement.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::CodecError;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write a file by streaming into a sibling temporary and renaming it
/// over `path`.
///
/// The temporary is flushed and synced before the rename. On any error
/// it is removed and `path` is left as it was.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<(), CodecError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CodecError>,
{
    let tmp = temp_path(path)?;
    let result = write_then_rename(&tmp, path, write);
    if result.is_err() {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("could not remove temporary {}: {e}", tmp.display());
            }
        }
    }
    result
}

fn write_then_rename<F>(tmp: &Path, path: &Path, write: F) -> Result<(), CodecError>
where
    F: FnOnce(&mut dyn Write) -> Result<(), CodecError>,
{
    let file = OpenOptions::new().write(true).create_new(true).open(tmp)?;
    let mut w = BufWriter::new(file);
    write(&mut w)?;
    let file: File = w.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> Result<PathBuf, CodecError> {
    let name = path.file_name().ok_or_else(|| {
        CodecError::Io(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        ))
    })?;
    let mut tmp = OsString::from(".");
    tmp.push(name);
    tmp.push(format!(
        ".{}.{}.tmp",
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    Ok(path.with_file_name(tmp))
}
