//! Default on-disk locations

use directories::ProjectDirs;
use entry_core::{Error, Result};
use std::env;
use std::path::PathBuf;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "ENTRY_DATA_DIR";

/// Application data directory, created if needed.
/// `ENTRY_DATA_DIR` overrides the platform default.
pub fn data_dir() -> Result<PathBuf> {
    let dir = if let Ok(dir) = env::var(DATA_DIR_ENV) {
        PathBuf::from(dir)
    } else {
        ProjectDirs::from("org", "EntryAssistant", "entry-assistant")
            .ok_or_else(|| Error::Storage("Could not determine data directory".to_string()))?
            .data_dir()
            .to_path_buf()
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::Storage(format!("Failed to create data directory: {}", e)))?;
    Ok(dir)
}

/// Default encrypted database path
pub fn database_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("entry-records.db"))
}

/// Default legacy store path
pub fn legacy_store_path() -> Result<PathBuf> {
    Ok(data_dir()?.join("legacy-store.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins() {
        let dir = tempfile::TempDir::new().unwrap();
        env::set_var(DATA_DIR_ENV, dir.path());
        let resolved = data_dir().unwrap();
        env::remove_var(DATA_DIR_ENV);
        assert_eq!(resolved, dir.path());
    }
}
