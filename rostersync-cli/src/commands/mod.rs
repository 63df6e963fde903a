//! Subcommand implementations and shared input loading.

pub mod groups;
pub mod roster;
pub mod sync;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use rostersync_core::config::{self, SyncConfig};
use rostersync_core::types::SourceMember;

/// Resolve `--config`, defaulting to `~/.rostersync/config.yaml`.
pub(crate) fn resolve_config_path(flag: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = flag {
        return Ok(path);
    }
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".rostersync").join("config.yaml"))
}

pub(crate) fn load_config(flag: Option<PathBuf>) -> Result<SyncConfig> {
    let path = resolve_config_path(flag)?;
    config::load(&path).with_context(|| format!("failed to load config from {}", path.display()))
}

/// Read the loader's JSON export of source members.
pub(crate) fn load_members(path: &Path) -> Result<Vec<SourceMember>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read members file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse members file {}", path.display()))
}

/// Read a bearer token file, trimming the trailing newline.
pub(crate) fn read_token(path: &Path) -> Result<String> {
    let token = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read token file {}", path.display()))?;
    let token = token.trim();
    anyhow::ensure!(!token.is_empty(), "token file {} is empty", path.display());
    Ok(token.to_string())
}
