//! Optional daemon configuration file (TOML). CLI flags override
//! anything set here.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default)]
    pub rates: RatesConfig,
    pub bus_port: Option<String>,
    pub transfer_relay: Option<bool>,
    pub cet_time: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatesConfig {
    pub inputs_hz: Option<f64>,
    pub fieldbus_hz: Option<f64>,
    pub network_hz: Option<f64>,
    pub flash_fpm: Option<f64>,
}

fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("atsc").join("config.toml"))
}

/// Load the config file. An explicit path that fails to parse is a hard
/// error; the implicit default path is best-effort.
pub fn load(path: Option<&Path>) -> Result<DaemonConfig, String> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => match default_path() {
            Some(path) if path.exists() => (path, false),
            _ => return Ok(DaemonConfig::default()),
        },
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if explicit => return Err(format!("cannot read {}: {e}", path.display())),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            return Ok(DaemonConfig::default());
        }
    };
    toml::from_str(&text).map_err(|e| format!("cannot parse {}: {e}", path.display()))
}
