//! SecretStore trait and backends.
//!
//! Secrets are read on every call; nothing is cached, so a value changed
//! out-of-band is picked up by the next lookup.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;
use tokio::fs;

use crate::error::Result;

/// Small named values, such as the API token.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up `name`. Returns `None` if unset or empty.
    async fn get(&self, name: &str) -> Result<Option<String>>;
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

/// In-memory secrets, settable at runtime.
#[derive(Default)]
pub struct MemorySecretStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience constructor for a store holding one secret.
    pub fn with_secret(name: &str, value: &str) -> Self {
        let store = Self::new();
        store.set(name, value);
        store
    }

    pub fn set(&self, name: &str, value: &str) {
        let mut values = self.values.write().unwrap();
        values.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&self, name: &str) {
        let mut values = self.values.write().unwrap();
        values.remove(name);
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let values = self.values.read().unwrap();
        Ok(values.get(name).cloned().and_then(non_empty))
    }
}

/// Secrets from environment variables named `<prefix><name>`.
pub struct EnvSecretStore {
    prefix: String,
}

impl EnvSecretStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let var = format!("{}{}", self.prefix, name);
        Ok(std::env::var(var).ok().and_then(non_empty))
    }
}

/// Secrets stored one per file: the value of `name` is the content of
/// `<dir>/<name>`, with a single trailing newline stripped.
pub struct FileSecretStore {
    dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let path = self.dir.join(name);
        match fs::read_to_string(&path).await {
            Ok(mut value) => {
                if value.ends_with('\n') {
                    value.pop();
                    if value.ends_with('\r') {
                        value.pop();
                    }
                }
                Ok(non_empty(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
