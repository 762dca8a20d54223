//! Application configuration management.
//!
//! This module handles loading and saving the configuration, which selects
//! where the session token is persisted and how tokens are accepted.
//!
//! Configuration is stored at `~/.config/sessionguard/config.json`.
//! `SESSIONGUARD_STORAGE` and `SESSIONGUARD_SESSION_FILE` override the file.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{
    EncryptedFileStorage, EncryptionKey, FileStorage, KeyringStorage, MemoryStorage,
    SessionOptions, SessionStore, StorageError, TokenStorage,
};
use crate::clock::SystemClock;
use crate::models::profile::DEFAULT_DISPLAY_NAME;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionguard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default name of the single persisted-token key
const DEFAULT_STORAGE_KEY: &str = "token";

pub const ENV_STORAGE: &str = "SESSIONGUARD_STORAGE";
pub const ENV_SESSION_FILE: &str = "SESSIONGUARD_SESSION_FILE";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Could not find {0} directory")]
    MissingDir(&'static str),

    #[error("Unknown storage backend: {0}")]
    UnknownBackend(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Keyring,
    Encrypted,
}

impl FromStr for StorageBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "keyring" => Ok(Self::Keyring),
            "encrypted" => Ok(Self::Encrypted),
            other => Err(ConfigError::UnknownBackend(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageBackend,
    /// Keychain account name for the `keyring` backend
    pub storage_key: String,
    /// Overrides the session file location for `file` and `encrypted`
    pub session_file: Option<PathBuf>,
    pub display_name_placeholder: String,
    pub reject_expired_on_login: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageBackend::default(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            session_file: None,
            display_name_placeholder: DEFAULT_DISPLAY_NAME.to_string(),
            reject_expired_on_login: false,
        }
    }
}

impl Config {
    /// Load from the user config directory, then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(backend) = lookup(ENV_STORAGE).filter(|b| !b.trim().is_empty()) {
            self.storage = backend.parse()?;
        }
        if let Some(path) = lookup(ENV_SESSION_FILE).filter(|p| !p.trim().is_empty()) {
            self.session_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::MissingDir("config"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, ConfigError> {
        let cache_dir = dirs::cache_dir().ok_or(ConfigError::MissingDir("cache"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            display_name_placeholder: self.display_name_placeholder.clone(),
            reject_expired_on_login: self.reject_expired_on_login,
        }
    }

    /// Construct the configured token storage backend.
    pub fn build_storage(&self) -> Result<Box<dyn TokenStorage>, ConfigError> {
        let storage: Box<dyn TokenStorage> = match self.storage {
            StorageBackend::Memory => Box::new(MemoryStorage::default()),
            StorageBackend::File => match self.session_file {
                Some(ref path) => Box::new(FileStorage::new(path.clone())),
                None => Box::new(FileStorage::in_dir(&self.cache_dir()?)),
            },
            StorageBackend::Keyring => Box::new(KeyringStorage::new(&self.storage_key)?),
            StorageBackend::Encrypted => {
                let key = EncryptionKey::load_or_create()?;
                match self.session_file {
                    Some(ref path) => Box::new(EncryptedFileStorage::new(path.clone(), &key)),
                    None => Box::new(EncryptedFileStorage::in_dir(&self.cache_dir()?, &key)),
                }
            }
        };
        Ok(storage)
    }

    /// A session store over the configured storage. Call `restore` on it next.
    pub fn open_session(&self) -> Result<SessionStore, ConfigError> {
        Ok(SessionStore::new(
            self.build_storage()?,
            Box::new(SystemClock),
            self.session_options(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.storage_key, "token");
        assert_eq!(config.display_name_placeholder, "User");
        assert!(!config.reject_expired_on_login);
    }

    #[test]
    fn test_save_and_load_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg").join(CONFIG_FILE);

        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"storage":"keyring","reject_expired_on_login":true}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert!(config.reject_expired_on_login);
        assert_eq!(config.storage_key, "token");

        let mut changed = config.clone();
        changed.display_name_placeholder = "Guest".to_string();
        changed.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap().display_name_placeholder, "Guest");
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            (ENV_STORAGE, "Memory".to_string()),
            (ENV_SESSION_FILE, "/tmp/elsewhere.json".to_string()),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).cloned()).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.session_file, Some(PathBuf::from("/tmp/elsewhere.json")));
    }

    #[test]
    fn test_empty_overrides_are_ignored() {
        let mut config = Config {
            storage: StorageBackend::Keyring,
            ..Config::default()
        };
        config.apply_overrides(|_| Some(String::new())).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.session_file, None);

        config.apply_overrides(|_| Some("  ".to_string())).unwrap();
        assert_eq!(config.storage, StorageBackend::Keyring);
        assert_eq!(config.session_file, None);
    }

    #[test]
    fn test_unknown_backend_override() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == ENV_STORAGE).then(|| "floppy".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownBackend(ref b) if b == "floppy"));
    }

    #[test]
    fn test_file_backend_honours_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            session_file: Some(dir.path().join("s.json")),
            ..Config::default()
        };
        let storage = config.build_storage().unwrap();
        storage.write("tok").unwrap();
        assert!(dir.path().join("s.json").exists());
        assert_eq!(storage.read().unwrap().as_deref(), Some("tok"));
    }

    #[test]
    fn test_open_session_uses_options() {
        let config = Config {
            storage: StorageBackend::Memory,
            reject_expired_on_login: true,
            ..Config::default()
        };
        let options = config.session_options();
        assert!(options.reject_expired_on_login);

        let mut session = config.open_session().unwrap();
        assert_eq!(session.restore(), crate::auth::SessionState::Anonymous);
    }
}
