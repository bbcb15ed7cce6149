//! Configuration Storage
//!
//! `~/.ssh-negotiator/config.json` holds the negotiation options and the
//! log filter. The known hosts file lives next to it.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing_subscriber::EnvFilter;

use super::types::{ConfigFile, NegotiationOptions, CONFIG_VERSION};

const APP_DIR: &str = ".ssh-negotiator";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Failed to determine config directory")]
    NoConfigDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config version {found} is newer than supported {supported}")]
    VersionTooNew { found: u32, supported: u32 },
}

/// Directory shared by the config file and the known hosts file
pub fn config_dir() -> Result<PathBuf, StorageError> {
    dirs::home_dir()
        .map(|home| home.join(APP_DIR))
        .ok_or(StorageError::NoConfigDir)
}

pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_path(config_dir()?.join(CONFIG_FILE)))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the settings.
    ///
    /// A missing file yields defaults. An unreadable file is moved aside and
    /// defaults are used, so a bad edit never blocks connecting. A file from a
    /// newer version is an error: overwriting it would lose settings.
    pub async fn load(&self) -> Result<ConfigFile, StorageError> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No config at {:?}, using defaults", self.path);
                return Ok(ConfigFile::default());
            }
            Err(e) => return Err(e.into()),
        };

        let mut config = match serde_json::from_str::<ConfigFile>(&contents) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Config file corrupted: {}", e);
                match self.quarantine().await {
                    Ok(moved_to) => tracing::warn!("Moved corrupted config to {:?}", moved_to),
                    Err(err) => tracing::error!("Failed to move corrupted config: {}", err),
                }
                return Ok(ConfigFile::default());
            }
        };

        if config.version > CONFIG_VERSION {
            return Err(StorageError::VersionTooNew {
                found: config.version,
                supported: CONFIG_VERSION,
            });
        }

        if let Some(filter) = config.log_filter.as_deref() {
            if let Err(e) = EnvFilter::try_new(filter) {
                tracing::warn!("Ignoring invalid log filter {:?}: {}", filter, e);
                config.log_filter = None;
            }
        }

        Ok(config)
    }

    /// Write the settings, stamped with the current version.
    /// The old file is only replaced once the new one is fully written.
    pub async fn save(&self, config: &ConfigFile) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let stamped = ConfigFile {
            version: CONFIG_VERSION,
            ..config.clone()
        };
        let json = serde_json::to_string_pretty(&stamped)?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, json).await?;
        fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }

    /// Replace the negotiation options, keeping the rest of the file
    pub async fn save_options(&self, options: NegotiationOptions) -> Result<ConfigFile, StorageError> {
        let mut config = self.load().await?;
        config.negotiation = options;
        self.save(&config).await?;
        Ok(config)
    }

    async fn quarantine(&self) -> Result<PathBuf, StorageError> {
        let moved_to = self.path.with_extension(format!(
            "json.corrupted.{}",
            chrono::Utc::now().format("%Y%m%d_%H%M%S")
        ));
        fs::rename(&self.path, &moved_to).await?;
        Ok(moved_to)
    }
}
