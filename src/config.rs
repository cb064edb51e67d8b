//! Settings file and effective configuration
//!
//! Values are merged with the precedence CLI flag (or `CONFLUENCE_*`
//! variable) > `config.toml` > built-in default.

use anyhow::{Context, Result};
use confluence::ClientConfig;
use provision::Manifest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ConnectionArgs;
use crate::paths;

/// Site layout used when no manifest is configured
pub const DEFAULT_MANIFEST: &str = include_str!("../manifests/default.toml");

pub const DEFAULT_DELAY_MS: u64 = 1000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Contents of `config.toml`
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Site URL
    pub url: Option<String>,
    /// Account email
    pub email: Option<String>,
    /// Pause between mutating requests
    pub delay_ms: Option<u64>,
    /// Global request timeout
    pub timeout_secs: Option<u64>,
    /// Manifest path
    pub manifest: Option<String>,
}

impl Settings {
    /// Load the settings file from the config directory, if present
    pub fn load() -> Result<(Self, PathBuf)> {
        let path = paths::settings_file()?;
        let settings = Self::load_from(&path)?;
        Ok((settings, path))
    }

    /// Load settings from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings file at {}", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }
}

/// Where the manifest comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    BuiltIn,
    File(PathBuf),
}

impl ManifestSource {
    pub fn describe(&self) -> String {
        match self {
            Self::BuiltIn => "built-in default site".to_string(),
            Self::File(path) => path.display().to_string(),
        }
    }
}

/// Effective configuration after merging every source
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub delay: Duration,
    pub timeout: Duration,
    pub manifest: ManifestSource,
    pub settings_path: Option<PathBuf>,
}

impl Config {
    pub fn resolve(
        connection: &ConnectionArgs,
        manifest: Option<&Path>,
        settings: Settings,
        settings_path: Option<PathBuf>,
    ) -> Self {
        let manifest = match (manifest, settings.manifest.as_deref()) {
            (Some(path), _) => ManifestSource::File(path.to_path_buf()),
            (None, Some(path)) => ManifestSource::File(paths::expand(path)),
            (None, None) => ManifestSource::BuiltIn,
        };

        Self {
            url: non_empty(connection.url.clone()).or(settings.url),
            email: non_empty(connection.email.clone()).or(settings.email),
            token: non_empty(connection.token.clone()),
            delay: Duration::from_millis(settings.delay_ms.unwrap_or(DEFAULT_DELAY_MS)),
            timeout: Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            manifest,
            settings_path,
        }
    }

    /// Build the Confluence client configuration
    pub fn client_config(&self) -> Result<ClientConfig, confluence::Error> {
        let config = ClientConfig::new(
            self.url.clone().unwrap_or_default(),
            self.email.clone().unwrap_or_default(),
            self.token.clone().unwrap_or_default(),
        )?;
        Ok(config.with_timeout(self.timeout))
    }

    /// Load and parse the configured manifest
    pub fn load_manifest(&self) -> Result<Manifest> {
        match &self.manifest {
            ManifestSource::BuiltIn => {
                Manifest::from_toml_str(DEFAULT_MANIFEST).context("Built-in manifest is invalid")
            }
            ManifestSource::File(path) => Manifest::load(path)
                .with_context(|| format!("Could not load manifest {}", path.display())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use provision::Stage;
    use tempfile::TempDir;

    fn connection(url: Option<&str>) -> ConnectionArgs {
        ConnectionArgs {
            url: url.map(String::from),
            email: None,
            token: Some("token".to_string()),
        }
    }

    #[test]
    fn test_missing_settings_file_is_default() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
url = "https://acme.atlassian.net"
email = "ops@acme.io"
delay_ms = 250
timeout_secs = 5
manifest = "/srv/site.toml"
"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.url.as_deref(), Some("https://acme.atlassian.net"));
        assert_eq!(settings.delay_ms, Some(250));
        assert_eq!(settings.timeout_secs, Some(5));
    }

    #[test]
    fn test_unknown_setting_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_token = \"s3cret\"\n").unwrap();
        assert!(Settings::load_from(&path).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = Config::resolve(&ConnectionArgs::default(), None, Settings::default(), None);
        assert_eq!(config.delay, Duration::from_millis(DEFAULT_DELAY_MS));
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.manifest, ManifestSource::BuiltIn);
        assert!(config.url.is_none());
    }

    #[test]
    fn test_cli_overrides_settings() {
        let settings = Settings {
            url: Some("https://file.atlassian.net".to_string()),
            email: Some("file@acme.io".to_string()),
            delay_ms: Some(500),
            manifest: Some("/srv/file.toml".to_string()),
            ..Settings::default()
        };
        let config = Config::resolve(
            &connection(Some("https://cli.atlassian.net")),
            Some(Path::new("cli.toml")),
            settings,
            None,
        );

        assert_eq!(config.url.as_deref(), Some("https://cli.atlassian.net"));
        assert_eq!(config.email.as_deref(), Some("file@acme.io"));
        assert_eq!(config.delay, Duration::from_millis(500));
        assert_eq!(config.manifest, ManifestSource::File(PathBuf::from("cli.toml")));
    }

    #[test]
    fn test_settings_manifest_path_is_expanded() {
        let Ok(home) = std::env::var("HOME") else {
            return;
        };
        let settings = Settings {
            manifest: Some("$HOME/site.toml".to_string()),
            ..Settings::default()
        };
        let config = Config::resolve(&ConnectionArgs::default(), None, settings, None);
        assert_eq!(
            config.manifest,
            ManifestSource::File(Path::new(&home).join("site.toml"))
        );
    }

    #[test]
    fn test_empty_cli_value_falls_back() {
        let settings = Settings {
            url: Some("https://file.atlassian.net".to_string()),
            ..Settings::default()
        };
        let config = Config::resolve(&connection(Some("  ")), None, settings, None);
        assert_eq!(config.url.as_deref(), Some("https://file.atlassian.net"));
    }

    #[test]
    fn test_client_config_requires_credentials() {
        let config = Config::resolve(&ConnectionArgs::default(), None, Settings::default(), None);
        assert!(matches!(
            config.client_config(),
            Err(confluence::Error::MissingConfig(confluence::ENV_URL))
        ));

        let settings = Settings {
            url: Some("https://acme.atlassian.net".to_string()),
            email: Some("ops@acme.io".to_string()),
            timeout_secs: Some(7),
            ..Settings::default()
        };
        let config = Config::resolve(&connection(None), None, settings, None);
        let client = config.client_config().unwrap();
        assert_eq!(client.timeout, Duration::from_secs(7));
    }

    #[test]
    fn test_builtin_manifest() {
        let config = Config::resolve(&ConnectionArgs::default(), None, Settings::default(), None);
        let manifest = config.load_manifest().unwrap();

        assert_eq!(manifest.users.len(), 5);
        assert_eq!(manifest.admin(), Some("PepikM"));
        assert_eq!(manifest.default_group(), Some("standard-users"));
        assert_eq!(manifest.specs(Stage::Spaces).len(), 5);
        assert_eq!(manifest.pages.len(), 5);
        assert_eq!(manifest.blog_posts.len(), 4);
        assert!(manifest.validate().iter().all(|issue| !issue.is_error()));
    }

    #[test]
    fn test_manifest_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("site.toml");
        fs::write(&path, "[[groups]]\nname = \"writers\"\n").unwrap();

        let config =
            Config::resolve(&ConnectionArgs::default(), Some(&path), Settings::default(), None);
        let manifest = config.load_manifest().unwrap();
        assert_eq!(manifest.len(), 1);

        let missing = Config::resolve(
            &ConnectionArgs::default(),
            Some(&dir.path().join("nope.toml")),
            Settings::default(),
            None,
        );
        assert!(missing.load_manifest().is_err());
    }
}
