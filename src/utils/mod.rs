//! Utility Functions
//!
//! Shared paths and logging.

mod logging;

pub use logging::*;

use crate::types::PROGRAM_NAME;
use std::path::PathBuf;

/// Directory holding profiles and the log file.
pub fn app_data_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(PROGRAM_NAME)
}

/// Ensure a directory exists.
pub fn ensure_dir(path: &PathBuf) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
