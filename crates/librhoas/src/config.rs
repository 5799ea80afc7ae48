use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const CONFIG_DIR_NAME: &str = "rhoas";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),
    #[error("Failed to get config directory")]
    ConfigDir,
}

/// A bookmark to the instance commands act on when no `--id` is given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub instance_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceBookmarks {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kafka: Option<ServiceRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_registry: Option<ServiceRef>,
}

/// The persisted state of the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub auth_url: String,
    pub mas_auth_url: String,
    pub client_id: String,
    pub scopes: Vec<String>,
    pub insecure: bool,
    pub access_token: String,
    pub refresh_token: String,
    pub mas_access_token: String,
    pub mas_refresh_token: String,
    pub services: ServiceBookmarks,
}

impl Config {
    pub fn has_primary_credentials(&self) -> bool {
        !self.access_token.is_empty() || !self.refresh_token.is_empty()
    }

    pub fn has_mas_credentials(&self) -> bool {
        !self.mas_access_token.is_empty() || !self.mas_refresh_token.is_empty()
    }

    /// Drop the tokens of both domains, keeping endpoints and bookmarks.
    pub fn clear_tokens(&mut self) {
        self.access_token.clear();
        self.refresh_token.clear();
        self.mas_access_token.clear();
        self.mas_refresh_token.clear();
    }

    /// Clear the bookmark of `kind` if it points at `instance_id`. Returns true
    /// if a bookmark was removed.
    pub fn clear_bookmark_if(&mut self, kind: ServiceKind, instance_id: &str) -> bool {
        let slot = self.bookmark_mut(kind);
        if slot.as_ref().is_some_and(|r| r.instance_id == instance_id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn bookmark(&self, kind: ServiceKind) -> Option<&ServiceRef> {
        match kind {
            ServiceKind::Kafka => self.services.kafka.as_ref(),
            ServiceKind::ServiceRegistry => self.services.service_registry.as_ref(),
        }
    }

    pub fn bookmark_mut(&mut self, kind: ServiceKind) -> &mut Option<ServiceRef> {
        match kind {
            ServiceKind::Kafka => &mut self.services.kafka,
            ServiceKind::ServiceRegistry => &mut self.services.service_registry,
        }
    }
}

/// The service types a bookmark can be kept for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Kafka,
    ServiceRegistry,
}

impl ServiceKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ServiceKind::Kafka => "Kafka instance",
            ServiceKind::ServiceRegistry => "Service Registry instance",
        }
    }
}

/// Reads and writes the configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// `<user config dir>/rhoas/config.json`
    pub fn default_path() -> Result<PathBuf, StorageError> {
        Ok(dirs::config_dir()
            .ok_or(StorageError::ConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration. A missing file is reported as
    /// [`StorageError::NotFound`] so callers can tell a first run apart.
    pub fn load(&self) -> Result<Config, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::NotFound(self.path.clone()));
        }

        let contents = fs::read_to_string(&self.path)?;
        let config: Config = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Load the configuration, creating an empty one on first run.
    pub fn load_or_init(&self) -> Result<Config, StorageError> {
        match self.load() {
            Ok(config) => Ok(config),
            Err(StorageError::NotFound(_)) => {
                tracing::debug!(path = %self.path.display(), "creating empty config file");
                let config = Config::default();
                self.save(&config)?;
                Ok(config)
            }
            Err(e) => Err(e),
        }
    }

    /// Write the full record, replacing the previous file in one rename.
    pub fn save(&self, config: &Config) -> Result<(), StorageError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        create_private_dir(dir)?;

        let json = serde_json::to_string_pretty(config)?;
        let tmp_path = self.path.with_extension("json.tmp");
        {
            let mut file = open_private_file(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;

    if dir.exists() {
        return Ok(());
    }
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(unix)]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private_file(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}
