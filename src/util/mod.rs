use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use chrono::{DateTime, Local};
use directories::BaseDirs;

pub fn resolve_target_dir(path: Option<PathBuf>) -> Result<PathBuf> {
    let path = match path {
        Some(p) => p,
        None => std::env::current_dir().context("failed to get current working directory")?,
    };
    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize target path: {}", path.display()))?;
    Ok(canonical)
}

pub fn compute_dir_id(directory: &Path) -> Result<String> {
    let canonical = directory
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {}", directory.display()))?;
    let mut hasher = Hasher::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    let hash = hasher.finalize();
    let encoded = hex::encode(hash.as_bytes());
    Ok(encoded.chars().take(12).collect())
}

pub fn session_id(directory: &Path, started_at: DateTime<Local>) -> String {
    let mut hasher = Hasher::new();
    hasher.update(directory.to_string_lossy().as_bytes());
    hasher.update(&started_at.timestamp_millis().to_be_bytes());
    let hash = hasher.finalize();
    let encoded = hex::encode(hash.as_bytes());
    let short: String = encoded.chars().take(12).collect();
    format!("session_{short}")
}

pub fn datestamp_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("failed to locate home directory")?;
    let dir = base.home_dir().join(".datestamp");
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    Ok(dir)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))?;
    }
    Ok(())
}

pub fn now_local() -> DateTime<Local> {
    Local::now()
}

pub fn tool_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
