//! Concatenate finished part files into the destination.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::part::Part;

#[derive(Debug, Error)]
pub(super) enum AssembleError {
    #[error("part {0} has no temp file")]
    MissingFile(String),
    #[error("create {path}: {source}")]
    Create { path: PathBuf, source: io::Error },
    #[error("copy part {part}: {source}")]
    Copy { part: String, source: io::Error },
    #[error("cancelled during assembly")]
    Cancelled,
}

/// Write every part, in list order, into `dest` and delete the part files.
///
/// A single part is renamed into place when possible. On any failure the
/// partial destination is removed. Returns the number of bytes written.
pub(super) fn concatenate(
    parts: &[Part],
    dest: &Path,
    cancelled: &AtomicBool,
) -> Result<u64, AssembleError> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| AssembleError::Create {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    if let [only] = parts {
        let src = part_file(only)?;
        if fs::rename(src, dest).is_ok() {
            let len = fs::metadata(dest).map(|m| m.len()).unwrap_or(0);
            tracing::debug!(part = %only.name(), dest = %dest.display(), "renamed single part");
            return Ok(len);
        }
        // Different filesystem; fall through to copy.
    }

    let result = copy_all(parts, dest, cancelled);
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result
}

fn copy_all(parts: &[Part], dest: &Path, cancelled: &AtomicBool) -> Result<u64, AssembleError> {
    let file = File::create(dest).map_err(|source| AssembleError::Create {
        path: dest.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    let mut total = 0u64;
    for part in parts {
        if cancelled.load(Ordering::Acquire) {
            return Err(AssembleError::Cancelled);
        }
        let copy_err = |source| AssembleError::Copy {
            part: part.name().to_string(),
            source,
        };
        let src = part_file(part)?;
        let mut input = File::open(src).map_err(copy_err)?;
        total += io::copy(&mut input, &mut out).map_err(copy_err)?;
        drop(input);
        if let Err(e) = fs::remove_file(src) {
            tracing::debug!(part = %part.name(), "remove part file after copy: {e}");
        }
    }
    out.flush().map_err(|source| AssembleError::Create {
        path: dest.to_path_buf(),
        source,
    })?;
    Ok(total)
}

fn part_file(part: &Part) -> Result<&Path, AssembleError> {
    part.file()
        .ok_or_else(|| AssembleError::MissingFile(part.name().to_string()))
}
