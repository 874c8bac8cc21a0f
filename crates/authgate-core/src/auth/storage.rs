use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::config::{Config, StorageBackend};

use super::credentials::KeyringTokenStorage;
use super::session::FileTokenStorage;

/// Durable client-side key/value slot for the bearer token.
///
/// Removing a key that is not present succeeds. Implementations are not
/// coordinated across processes; the last writer wins.
pub trait TokenStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Build the backend selected in the configuration.
pub fn open_storage(config: &Config) -> Result<Arc<dyn TokenStorage>> {
    let storage: Arc<dyn TokenStorage> = match config.storage {
        StorageBackend::File => Arc::new(FileTokenStorage::new(config.cache_dir()?)),
        StorageBackend::Keyring => Arc::new(KeyringTokenStorage::new()),
        StorageBackend::Memory => Arc::new(MemoryTokenStorage::default()),
    };
    Ok(storage)
}

/// Process-local storage. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    pub fn with_value(key: &str, value: &str) -> Self {
        let mut values = HashMap::new();
        values.insert(key.to_string(), value.to_string());
        Self {
            values: Mutex::new(values),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.values
            .lock()
            .map_err(|_| anyhow::anyhow!("Token storage lock poisoned"))
    }
}

impl TokenStorage for MemoryTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}
