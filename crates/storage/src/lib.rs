//! File-backed persistence: config, library discovery and reading state.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;
use brailleshelf_core::Config;

mod library;
mod reading_state;

pub use library::{MountProbe, SystemMounts, is_supported, scan_books};
pub use reading_state::{ProgressRecord, ReadingStateStore, SelectionRecord};

/// Reads the TOML config at `path`. A missing file gives the defaults.
pub fn load_config(path: impl AsRef<Path>) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Config::default()),
        Err(err) => {
            return Err(err).with_context(|| format!("read config {}", path.display()));
        }
    };
    let mut config: Config =
        toml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
    config.normalize();
    Ok(config)
}
