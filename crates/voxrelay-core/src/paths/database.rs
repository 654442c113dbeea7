//! Database path resolution.

use std::path::{Path, PathBuf};

use super::error::PathError;
use super::platform::{data_root, ensure_dir};

const DATABASE_FILE: &str = "voxrelay.db";

/// Get the path to the voxrelay database file.
///
/// Returns `<data root>/data/voxrelay.db`; the `data/` subdirectory is
/// created if it doesn't exist.
pub fn database_path() -> Result<PathBuf, PathError> {
    database_path_in(&data_root()?)
}

/// Same as [`database_path`] but rooted at an explicit directory.
pub fn database_path_in(root: &Path) -> Result<PathBuf, PathError> {
    let data_dir = ensure_dir(root.join("data"))?;
    Ok(data_dir.join(DATABASE_FILE))
}
