//! Platform data directory resolution.

use std::env;
use std::fs;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable overriding the data root.
pub const DATA_DIR_ENV: &str = "VOXRELAY_DATA_DIR";

/// Get the root directory for persistent data.
///
/// Resolution order:
/// 1. `VOXRELAY_DATA_DIR` environment variable
/// 2. `<system local data dir>/voxrelay`
///
/// The directory is created if missing.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(DATA_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("voxrelay"),
    };

    ensure_dir(root)
}

pub(crate) fn ensure_dir(path: PathBuf) -> Result<PathBuf, PathError> {
    if !path.exists() {
        fs::create_dir_all(&path).map_err(|e| PathError::CreateFailed {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    }
    Ok(path)
}
