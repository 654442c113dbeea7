//! Filesystem locations used by voxrelay.

mod database;
mod error;
mod platform;

pub use database::{database_path, database_path_in};
pub use error::PathError;
pub use platform::{DATA_DIR_ENV, data_root};
