// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{BatchFile, RawBatchFile};
use crate::errors::Result;

/// Load a batch file from a given path and return the raw `RawBatchFile`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation (dependency correctness, etc.). Use
/// [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawBatchFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let batch: RawBatchFile = toml::from_str(&contents)?;

    Ok(batch)
}

/// Load a batch file from path and run validation.
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks for:
///   - unknown or self `after` references,
///   - dependency cycles,
///   - thread requests that are zero or larger than the configured grid.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<BatchFile> {
    let raw = load_from_path(&path)?;
    let batch = BatchFile::try_from(raw)?;
    Ok(batch)
}
