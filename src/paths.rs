//! Config directory resolution for siteseed
//!
//! # Environment Variables
//!
//! - `SITESEED_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `SITESEED_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/siteseed` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\siteseed`
//!    - macOS/Linux: `~/.config/siteseed`

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::path::{Path, PathBuf};

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "SITESEED_CONFIG_DIR";

const APP_DIR: &str = "siteseed";

/// Get the siteseed config directory path
pub fn config_dir() -> Result<PathBuf> {
    resolve_config_dir(
        std::env::var(ENV_CONFIG_DIR).ok().as_deref(),
        std::env::var("XDG_CONFIG_HOME").ok().as_deref(),
        dirs::home_dir().as_deref(),
    )
}

/// Path of the settings file inside the config directory
pub fn settings_file() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

fn resolve_config_dir(
    override_dir: Option<&str>,
    xdg_config: Option<&str>,
    home: Option<&Path>,
) -> Result<PathBuf> {
    // 1. Explicit override
    if let Some(dir) = override_dir.filter(|d| !d.is_empty()) {
        let path = expand(dir);
        log::debug!("Using config dir from {ENV_CONFIG_DIR}: {}", path.display());
        return Ok(path);
    }

    // 2. XDG_CONFIG_HOME
    if let Some(xdg) = xdg_config.filter(|d| !d.is_empty()) {
        let path = PathBuf::from(xdg).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    // 3. Platform default
    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = home.context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Expand `~` and environment variables in a path
///
/// A path that fails to expand, such as one naming an unset variable, is
/// returned unchanged.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}
