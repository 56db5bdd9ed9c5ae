use anyhow::Result;
use std::path::PathBuf;

pub mod history;
pub mod migrations;

pub use history::SqliteStore;

pub fn get_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskforge")
}

pub fn get_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskforge")
}

pub fn ensure_data_dir() -> Result<()> {
    let dir = get_data_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(())
}

pub fn ensure_cache_dir() -> Result<()> {
    let dir = get_cache_dir();
    std::fs::create_dir_all(&dir)?;
    Ok(())
}
