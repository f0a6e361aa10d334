use std::fs;
use std::io::Write;

use camino::Utf8Path;
use tempfile::NamedTempFile;

use crate::error::KiraError;

pub fn ensure_dir(dir: &Utf8Path) -> Result<(), KiraError> {
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("create {dir}: {err}")))
}

/// Replaces `path` with `bytes` in one step, creating the parent directory
/// when needed. Readers see either the old file or the new one.
pub fn write_atomic(path: &Utf8Path, bytes: &[u8]) -> Result<(), KiraError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    ensure_dir(parent)?;

    let mut temp = NamedTempFile::new_in(parent.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("temp file in {parent}: {err}")))?;
    temp.write_all(bytes)
        .map_err(|err| KiraError::Filesystem(format!("write {path}: {err}")))?;
    temp.persist(path.as_std_path())
        .map_err(|err| KiraError::Filesystem(format!("persist {path}: {}", err.error)))?;
    Ok(())
}
