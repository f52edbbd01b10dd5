//! Configuration management
//!
//! Loads and saves the s3nav configuration file. The file is TOML and lives at
//! `<config dir>/s3nav/config.toml`; `S3NAV_CONFIG_DIR` replaces the directory.
//!
//! Changes to `schema_version` require migration support.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::profile::Profile;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "S3NAV_CONFIG_DIR";

const DEFAULT_PROGRESS_INTERVAL_MS: u64 = 100;
const DEFAULT_PART_SIZE_MIB: u64 = 5;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Schema version for migration support
    pub schema_version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub profiles: Vec<Profile>,
}

/// Defaults applied to every command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Defaults {
    /// Where downloads land when no destination is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_dir: Option<PathBuf>,

    /// Minimum spacing between progress updates for one object
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Multipart upload part size
    #[serde(default = "default_part_size_mib")]
    pub part_size_mib: u64,
}

fn default_progress_interval_ms() -> u64 {
    DEFAULT_PROGRESS_INTERVAL_MS
}

fn default_part_size_mib() -> u64 {
    DEFAULT_PART_SIZE_MIB
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            download_dir: None,
            progress_interval_ms: DEFAULT_PROGRESS_INTERVAL_MS,
            part_size_mib: DEFAULT_PART_SIZE_MIB,
        }
    }
}

impl Defaults {
    /// Configured download directory, falling back to `~/Downloads`
    pub fn download_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        dirs::home_dir()
            .map(|home| home.join("Downloads"))
            .ok_or_else(|| Error::Config("Could not determine home directory".into()))
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn part_size_bytes(&self) -> u64 {
        self.part_size_mib * 1024 * 1024
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            profiles: Vec::new(),
        }
    }
}

/// Configuration manager handles loading and saving config
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for the default location
    pub fn new() -> Result<Self> {
        let config_dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::config_dir()
                .ok_or_else(|| Error::Config("Could not determine config directory".into()))?
                .join("s3nav"),
        };
        Ok(Self {
            config_path: config_dir.join("config.toml"),
        })
    }

    /// Create a ConfigManager with a custom path (useful for testing)
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from disk
    ///
    /// A missing file yields the default configuration.
    pub fn load(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.config_path)
            .map_err(|e| Error::local(&self.config_path, e))?;
        let config: Config = toml::from_str(&content)?;

        if config.schema_version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "Configuration file version {} is newer than supported version {}. Please upgrade s3nav.",
                config.schema_version, SCHEMA_VERSION
            )));
        }

        Ok(Config {
            schema_version: SCHEMA_VERSION,
            ..config
        })
    }

    /// Save configuration to disk
    ///
    /// Creates parent directories and restricts the file to its owner.
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| Error::local(parent, e))?;
        }

        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.config_path, content)
            .map_err(|e| Error::local(&self.config_path, e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.config_path, permissions)?;
        }

        tracing::debug!(path = %self.config_path.display(), "configuration saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let manager = ConfigManager::with_path(config_path);
        (manager, temp_dir)
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
        assert_eq!(config.defaults.progress_interval(), Duration::from_millis(100));
        assert_eq!(config.defaults.part_size_bytes(), 5 * 1024 * 1024);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let (manager, _temp_dir) = temp_config_manager();
        let config = manager.load().unwrap();
        assert_eq!(config.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn test_save_and_load() {
        let (manager, _temp_dir) = temp_config_manager();

        let mut config = Config::default();
        config.defaults.download_dir = Some(PathBuf::from("/data/inbox"));
        config
            .profiles
            .push(Profile::new("local", "http://localhost:9000", "key", "secret"));

        manager.save(&config).unwrap();
        let loaded = manager.load().unwrap();

        assert_eq!(loaded.profiles.len(), 1);
        assert_eq!(loaded.profiles[0].name, "local");
        assert_eq!(
            loaded.defaults.download_dir().unwrap(),
            PathBuf::from("/data/inbox")
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let (manager, _temp_dir) = temp_config_manager();
        manager.save(&Config::default()).unwrap();
        let mode = std::fs::metadata(manager.config_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_partial_defaults_are_filled() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();
        std::fs::write(
            manager.config_path(),
            "schema_version = 1\n[defaults]\npart_size_mib = 16\n",
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.defaults.part_size_mib, 16);
        assert_eq!(config.defaults.progress_interval_ms, 100);
        assert!(config.defaults.download_dir.is_none());
    }

    #[test]
    fn test_schema_version_too_new() {
        let (manager, _temp_dir) = temp_config_manager();
        std::fs::create_dir_all(manager.config_path().parent().unwrap()).unwrap();

        let content = format!("schema_version = {}\n", SCHEMA_VERSION + 1);
        std::fs::write(manager.config_path(), content).unwrap();

        let result = manager.load();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("newer than supported")
        );
    }
}
