use std::{env, fs, path::PathBuf};

use anyhow::{Context, Result};

const APP_DIR: &str = "pmo";

/// Per-OS data directory holding the database, settings and log file.
/// Created on first use.
pub fn data_dir() -> Result<PathBuf> {
    let base = match env::consts::OS {
        "windows" => PathBuf::from(env::var("LOCALAPPDATA").context("LOCALAPPDATA is not set")?),
        "macos" => PathBuf::from(env::var("HOME").context("HOME is not set")?)
            .join("Library")
            .join("Application Support"),
        _ => PathBuf::from(env::var("HOME").context("HOME is not set")?)
            .join(".local")
            .join("share"),
    };

    let dir = base.join(APP_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create data directory {}", dir.display()))?;
    Ok(dir)
}
