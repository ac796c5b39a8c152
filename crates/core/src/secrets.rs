//! Key-value storage for settings and authorization state.
//!
//! The host application owns persistence (keyring, shared preferences, a
//! settings table). Sync backends only need string get/set/delete.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::errors::{Error, Result};

/// Caller-owned persistent key-value store.
pub trait SecretStore: Send + Sync {
    fn get_secret(&self, key: &str) -> Result<Option<String>>;

    fn set_secret(&self, key: &str, value: &str) -> Result<()>;

    fn delete_secret(&self, key: &str) -> Result<()>;
}

/// Process-local store. Useful for tests and for hosts that persist
/// the values themselves at shutdown.
#[derive(Debug, Default)]
pub struct InMemorySecretStore {
    values: RwLock<HashMap<String, String>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SecretStore for InMemorySecretStore {
    fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .read()
            .map_err(|_| Error::secret("store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::secret("store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .write()
            .map_err(|_| Error::secret("store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }
}
