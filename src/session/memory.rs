use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::sync::Mutex;

use super::SessionStore;

/// Session store kept in process memory. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store already holding the given token.
    pub fn with_token(token: &str) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(super::TOKEN_KEY.to_string(), token.to_string());
        }
        store
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        values.remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        values.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_basic_ops() {
        let store = MemorySessionStore::with_token("abc");
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        store.set("user", "{}").unwrap();
        store.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        assert_eq!(store.get("user").unwrap().as_deref(), Some("{}"));

        // Removing a missing key is not an error
        store.remove("token").unwrap();

        store.clear().unwrap();
        assert_eq!(store.get("user").unwrap(), None);
    }
}
