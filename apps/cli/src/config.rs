//! CLI configuration.
//!
//! Read from `~/.config/wspublish/config.json` (`%APPDATA%\wspublish` on
//! Windows). Every field is optional; command line flags win over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use wspublish_workshop::local::DEFAULT_QUOTA_BYTES;
use wspublish_workshop::{AppId, Visibility};

/// Test application most workshop tooling defaults to.
const DEFAULT_APP_ID: u32 = 480;

const DEFAULT_INTERVAL_MS: u64 = 1000;

/// Contents of the config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub app_id: u32,
    /// Directory backing the local workshop. Empty means the default.
    pub store_dir: PathBuf,
    pub update_interval_ms: u64,
    /// Per-call wait limit in seconds; 0 waits forever.
    pub timeout_secs: u64,
    pub quota_bytes: u64,
    pub visibility: Visibility,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_APP_ID,
            store_dir: PathBuf::new(),
            update_interval_ms: DEFAULT_INTERVAL_MS,
            timeout_secs: 0,
            quota_bytes: DEFAULT_QUOTA_BYTES,
            visibility: Visibility::Public,
        }
    }
}

impl CliConfig {
    /// Loads `path`, or the default location when `None`.
    ///
    /// A missing file gives defaults. A file that does not parse is logged
    /// and also gives defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<CliConfig>(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "failed to parse config, using defaults"
                    );
                    CliConfig::default()
                }
            }
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            CliConfig::default()
        };

        if config.store_dir.as_os_str().is_empty() {
            config.store_dir = default_store_dir()?;
        }
        Ok(config)
    }

    pub fn app_id(&self) -> AppId {
        AppId(self.app_id)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

fn config_path() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("wspublish").join("config.json"))
}

fn default_store_dir() -> anyhow::Result<PathBuf> {
    Ok(config_base_dir()?.join("wspublish").join("store"))
}

fn config_base_dir() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home).join(".config"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = CliConfig::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.app_id(), AppId(480));
        assert_eq!(config.update_interval(), Duration::from_secs(1));
        assert_eq!(config.timeout(), None);
        assert_eq!(config.quota_bytes, DEFAULT_QUOTA_BYTES);
        assert!(config.store_dir.ends_with("wspublish/store"));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"app_id": 4000, "timeout_secs": 30, "visibility": "friends_only", "store_dir": "/srv/ws"}"#,
        )
        .unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.app_id, 4000);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.visibility, Visibility::FriendsOnly);
        assert_eq!(config.store_dir, PathBuf::from("/srv/ws"));
        assert_eq!(config.update_interval_ms, 1000);
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = CliConfig::load(Some(&path)).unwrap();
        assert_eq!(config.app_id, 480);
    }
}
