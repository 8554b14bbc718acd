//! Configuration layering (§6.5): built-in defaults → `flowboard.toml` → environment variables
//! (already folded into the parsed `Cli` by clap's `env` attribute) → explicit CLI flags.
//!
//! `clap` resolves the env-vs-flag half of the precedence chain during `Cli::parse()` for any
//! field marked `env = "FLOWBOARD_..."` with no hard-coded `default_value`: a field stays `None`
//! only if neither the flag nor the environment variable supplied it. `merge` then slots the
//! `flowboard.toml` layer in underneath that, and a built-in constant underneath everything.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct FileDefaults {
    #[serde(default)]
    pub max_cycles: Option<u64>,
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub log_format: Option<String>,
}

/// Looks for `flowboard.toml` in the current directory; a missing file is not an error (the
/// layer simply contributes nothing), but a malformed one is.
pub fn load_file_defaults() -> anyhow::Result<FileDefaults> {
    load_file_defaults_from(Path::new("flowboard.toml"))
}

pub fn load_file_defaults_from(path: &Path) -> anyhow::Result<FileDefaults> {
    if !path.exists() {
        return Ok(FileDefaults::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

pub fn merge_max_cycles(cli: Option<u64>, file: &FileDefaults) -> u64 {
    cli.or(file.max_cycles).unwrap_or(20)
}

pub fn merge_db_path(cli: Option<PathBuf>, file: &FileDefaults) -> Option<PathBuf> {
    cli.or_else(|| file.db_path.clone())
}

pub fn merge_log_format(cli: Option<String>, file: &FileDefaults) -> String {
    cli.or_else(|| file.log_format.clone()).unwrap_or_else(|| "pretty".to_string())
}
