use std::fs::File;
use std::io;

use camino::Utf8Path;
use md5::{Digest, Md5};

use crate::error::EnaError;
use crate::fs_util;

pub fn file_md5(path: &Utf8Path) -> Result<String, EnaError> {
    let mut file = File::open(path.as_std_path())
        .map_err(|err| EnaError::Filesystem(format!("open {path}: {err}")))?;
    let mut hasher = Md5::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|err| EnaError::Filesystem(format!("read {path}: {err}")))?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Checks a downloaded file; a mismatching file is deleted before the error is returned.
pub fn verify(path: &Utf8Path, expected: &str) -> Result<(), EnaError> {
    let actual = file_md5(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }
    fs_util::remove_file(path)?;
    Err(EnaError::ChecksumMismatch {
        path: path.as_std_path().to_path_buf(),
        expected: expected.trim().to_string(),
        actual,
    })
}

/// True when `path` already holds a file with the expected checksum.
pub fn already_present(path: &Utf8Path, expected: &str) -> bool {
    path.as_std_path().is_file()
        && file_md5(path)
            .map(|actual| actual.eq_ignore_ascii_case(expected.trim()))
            .unwrap_or(false)
}
