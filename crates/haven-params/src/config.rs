//! On-disk configuration

use crate::{BackoffPolicy, CipherSuite, KdfParams, PinPolicy, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name of the config inside the data directory
pub const CONFIG_FILE_NAME: &str = "haven.json";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "HAVEN_DATA_DIR";

/// Top-level configuration.
///
/// Missing fields take their defaults, so a partial file is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HavenConfig {
    /// KDF profile for new credentials and envelopes
    pub kdf: KdfParams,
    /// Cipher suite for new envelopes
    pub cipher: CipherSuite,
    /// PIN format policy
    pub pin: PinPolicy,
    /// Advisory backoff after failed unlocks
    pub backoff: BackoffPolicy,
}

impl HavenConfig {
    /// Load config from `path`, falling back to defaults if the file does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = match std::fs::read_to_string(path) {
            Ok(raw) => serde_json::from_str::<Self>(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Self::default(),
            Err(e) => return Err(e.into()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Write config to `path` as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.kdf.validate()?;
        self.pin.validate()?;
        Ok(())
    }
}

/// Resolve the data directory: `HAVEN_DATA_DIR` if set, otherwise the
/// platform data dir for the app.
pub fn default_data_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(DATA_DIR_ENV) {
        return Some(PathBuf::from(dir));
    }
    ProjectDirs::from("org", "Haven", "Haven").map(|dirs| dirs.data_dir().to_path_buf())
}
