use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::Format;
use crate::error::EnaError;
use crate::manifest::file_name;

pub fn ensure_dir(dir: &Utf8Path) -> Result<(), EnaError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| EnaError::Filesystem(format!("create {dir}: {err}")))
}

/// `<dir>/<base>.<ext>` for record formats (xml, embl, fasta).
pub fn record_file(dir: &Utf8Path, base: &str, format: Format) -> Option<Utf8PathBuf> {
    format
        .record_extension()
        .map(|ext| dir.join(format!("{base}.{ext}")))
}

pub fn metadata_file(dir: &Utf8Path, accession: &str) -> Utf8PathBuf {
    dir.join(format!("{accession}.xml"))
}

/// Where a remote file lands inside `dir`.
pub fn local_file(dir: &Utf8Path, url: &str) -> Utf8PathBuf {
    dir.join(file_name(url))
}

/// True when no regular file exists anywhere below `dir`.
pub fn is_empty_dir(dir: &Utf8Path) -> bool {
    let mut stack = vec![dir.as_std_path().to_path_buf()];
    while let Some(path) = stack.pop() {
        let Ok(entries) = fs::read_dir(&path) else {
            continue;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                return false;
            }
        }
    }
    true
}

/// Removes `dir` (and any empty subdirectories) when it holds no files.
pub fn remove_if_empty(dir: &Utf8Path) -> Result<bool, EnaError> {
    if !dir.as_std_path().is_dir() || !is_empty_dir(dir) {
        return Ok(false);
    }
    fs::remove_dir_all(dir.as_std_path())
        .map_err(|err| EnaError::Filesystem(format!("remove {dir}: {err}")))?;
    Ok(true)
}

pub fn remove_file(path: &Utf8Path) -> Result<(), EnaError> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(EnaError::Filesystem(format!("remove {path}: {err}"))),
    }
}
