//! Configuration loading and management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use editor_store::{
    BlobStore, EnvSecretStore, FileSecretStore, FsBlobStore, MemoryBlobStore, SecretStore,
};
use serde::{Deserialize, Serialize};

use crate::auth::DEFAULT_TOKEN_NAME;

/// Main configuration for the editor service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Where file contents live
    #[serde(default)]
    pub storage: StorageConfig,

    /// Where the API token is read from
    #[serde(default)]
    pub secrets: SecretConfig,

    /// Origins allowed to call the API cross-origin (empty disables CORS)
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    /// Request body cap in bytes (no limit when unset)
    #[serde(default)]
    pub max_body_bytes: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// One file per key under `root` (relative paths resolve against the config dir)
    Filesystem {
        #[serde(default = "default_bucket_root")]
        root: PathBuf,
    },
    /// Non-persistent, lost on restart
    Memory,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Filesystem {
            root: default_bucket_root(),
        }
    }
}

impl StorageConfig {
    fn describe(&self) -> String {
        match self {
            StorageConfig::Filesystem { root } => format!("filesystem at {:?}", root),
            StorageConfig::Memory => "memory".to_string(),
        }
    }
}

fn default_bucket_root() -> PathBuf {
    PathBuf::from("bucket")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretConfig {
    #[serde(flatten)]
    pub source: SecretSource,

    /// Secret name holding the API token
    #[serde(default = "default_token_name")]
    pub token_name: String,
}

impl Default for SecretConfig {
    fn default() -> Self {
        Self {
            source: SecretSource::default(),
            token_name: default_token_name(),
        }
    }
}

fn default_token_name() -> String {
    DEFAULT_TOKEN_NAME.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "lowercase")]
pub enum SecretSource {
    /// `<dir>/<name>` files (relative paths resolve against the config dir)
    File {
        #[serde(default = "default_secrets_dir")]
        dir: PathBuf,
    },
    /// Environment variable `<prefix><name>`
    Env {
        #[serde(default)]
        prefix: String,
    },
}

impl Default for SecretSource {
    fn default() -> Self {
        SecretSource::File {
            dir: default_secrets_dir(),
        }
    }
}

impl SecretSource {
    fn describe(&self) -> String {
        match self {
            SecretSource::File { dir } => format!("files in {:?}", dir),
            SecretSource::Env { prefix } => format!("env with prefix {:?}", prefix),
        }
    }
}

fn default_secrets_dir() -> PathBuf {
    PathBuf::from("secrets")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            secrets: SecretConfig::default(),
            cors_allowed_origins: Vec::new(),
            max_body_bytes: None,
        }
    }
}

fn resolve(config_path: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        config_path.join(path)
    }
}

impl Config {
    /// Load `config.json` from the config directory, writing the defaults
    /// there first if it does not exist.
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path).join("config.json");

        let config = if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            serde_json::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {:?}", config_file))?
        } else {
            let config = Config::default();
            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;
            std::fs::write(&config_file, serde_json::to_string_pretty(&config)?)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Wrote default config to {:?}", config_file);
            config
        };

        config.validate()?;
        tracing::info!(
            "Config {:?}: storage={}, token '{}' from {}",
            config_file,
            config.storage.describe(),
            config.secrets.token_name,
            config.secrets.source.describe()
        );
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.secrets.token_name.is_empty() {
            anyhow::bail!("secrets.token_name must not be empty");
        }
        if self.max_body_bytes == Some(0) {
            anyhow::bail!("max_body_bytes must be positive; omit it for no limit");
        }
        Ok(())
    }

    /// Open the configured blob store
    pub async fn open_blob_store(&self, config_path: &str) -> Result<Arc<dyn BlobStore>> {
        match &self.storage {
            StorageConfig::Filesystem { root } => {
                let root = resolve(Path::new(config_path), root);
                let store = FsBlobStore::open(&root)
                    .await
                    .with_context(|| format!("Failed to open bucket directory: {:?}", root))?;
                tracing::info!("Serving files from {:?}", root);
                Ok(Arc::new(store))
            }
            StorageConfig::Memory => {
                tracing::warn!("Using in-memory storage; files are lost on restart");
                Ok(Arc::new(MemoryBlobStore::new()))
            }
        }
    }

    /// Open the configured secret store
    pub fn open_secret_store(&self, config_path: &str) -> Arc<dyn SecretStore> {
        match &self.secrets.source {
            SecretSource::File { dir } => {
                let dir = resolve(Path::new(config_path), dir);
                tracing::info!(
                    "Reading token '{}' from {:?}",
                    self.secrets.token_name,
                    dir
                );
                Arc::new(FileSecretStore::new(dir))
            }
            SecretSource::Env { prefix } => {
                tracing::info!(
                    "Reading token from environment variable {}{}",
                    prefix,
                    self.secrets.token_name
                );
                Arc::new(EnvSecretStore::new(prefix.clone()))
            }
        }
    }
}
