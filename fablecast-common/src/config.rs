//! Configuration file discovery and loading
//!
//! Service crates deserialize their own typed config structs from the TOML
//! table returned here, then layer environment-variable overrides on top;
//! anything CLI-settable comes in through clap with its own env fallback.

use crate::{Error, Result};
use std::path::PathBuf;

/// Load the whole config file as a TOML table, if one exists
pub fn load_config_table() -> Option<toml::Value> {
    let path = find_config_file().ok()?;
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str::<toml::Value>(&content).ok()
}

/// Locate the platform config file (`fablecast/config.toml`)
///
/// On Linux, `~/.config/fablecast/config.toml` is tried first, then
/// `/etc/fablecast/config.toml`.
pub fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("fablecast").join("config.toml"));

    if let Some(path) = user_config {
        if path.exists() {
            return Ok(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/fablecast/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    Err(Error::Config("No config file found".to_string()))
}
