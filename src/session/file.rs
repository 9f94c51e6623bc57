use anyhow::{Context, Result, anyhow};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::SessionStore;
use crate::runtime::Runtime;

/// File name of the persisted session inside the application directory.
pub const SESSION_FILE: &str = "session.json";

/// Session store persisted as a flat JSON object on disk.
///
/// Every write rewrites the whole file through a temporary sibling and a
/// rename, so a crash never leaves a half-written session behind.
pub struct FileSessionStore<R: Runtime> {
    runtime: R,
    path: PathBuf,
    lock: Mutex<()>,
}

impl<R: Runtime> FileSessionStore<R> {
    pub fn new(runtime: R, path: PathBuf) -> Self {
        Self {
            runtime,
            path,
            lock: Mutex::new(()),
        }
    }

    /// Store located at `<app_dir>/session.json`.
    pub fn in_dir(runtime: R, app_dir: &Path) -> Self {
        Self::new(runtime, app_dir.join(SESSION_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<BTreeMap<String, String>> {
        if !self.runtime.exists(&self.path) {
            return Ok(BTreeMap::new());
        }
        let content = self.runtime.read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content)
            .with_context(|| format!("Session file {:?} is corrupt", self.path))
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !self.runtime.exists(parent)
        {
            self.runtime.create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(values)?;
        let tmp = self.path.with_extension("json.tmp");
        self.runtime
            .write(&tmp, content.as_bytes())
            .with_context(|| format!("Failed to save session to {:?}", self.path))?;
        self.runtime.rename(&tmp, &self.path)?;
        debug!("Saved {} session key(s) to {:?}", values.len(), self.path);
        Ok(())
    }

    fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, String>) -> bool,
    {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("session file lock poisoned"))?;
        let mut values = self.load()?;
        if f(&mut values) {
            self.save(&values)?;
        }
        Ok(())
    }
}

impl<R: Runtime> SessionStore for FileSessionStore<R> {
    #[tracing::instrument(skip(self))]
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("session file lock poisoned"))?;
        Ok(self.load()?.remove(key))
    }

    #[tracing::instrument(skip(self, value))]
    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|values| {
            values.insert(key.to_string(), value.to_string());
            true
        })
    }

    #[tracing::instrument(skip(self))]
    fn remove(&self, key: &str) -> Result<()> {
        self.update(|values| values.remove(key).is_some())
    }

    #[tracing::instrument(skip(self))]
    fn clear(&self) -> Result<()> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| anyhow!("session file lock poisoned"))?;
        if self.runtime.exists(&self.path) {
            self.runtime.remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{MockRuntime, RealRuntime};
    use mockall::predicate::eq;
    use tempfile::tempdir;

    #[test]
    fn test_file_store_persists_across_instances() {
        let dir = tempdir().unwrap();
        let app_dir = dir.path().join("apiclient");

        let store = FileSessionStore::in_dir(RealRuntime, &app_dir);
        assert_eq!(store.get("token").unwrap(), None);
        store.set("token", "abc").unwrap();
        store.set("user", r#"{"id":5}"#).unwrap();

        let reopened = FileSessionStore::in_dir(RealRuntime, &app_dir);
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("abc"));
        assert_eq!(reopened.get("user").unwrap().as_deref(), Some(r#"{"id":5}"#));

        reopened.remove("token").unwrap();
        assert_eq!(store.get("token").unwrap(), None);
        assert!(!app_dir.join("session.json.tmp").exists());

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_missing_file_reads_as_empty() {
        let path = PathBuf::from("/home/user/.config/apiclient/session.json");
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(path.clone()))
            .returning(|_| false);

        let store = FileSessionStore::new(runtime, path);
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_file_store_remove_missing_key_does_not_write() {
        let path = PathBuf::from("/home/user/.config/apiclient/session.json");
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok(r#"{"user":"{}"}"#.to_string()));
        runtime.expect_write().never();

        let store = FileSessionStore::new(runtime, path);
        store.remove("token").unwrap();
    }

    #[test]
    fn test_file_store_corrupt_file_is_an_error() {
        let path = PathBuf::from("/home/user/.config/apiclient/session.json");
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| true);
        runtime
            .expect_read_to_string()
            .returning(|_| Ok("[not an object".to_string()));

        let store = FileSessionStore::new(runtime, path);
        let err = store.get("token").unwrap_err();
        assert!(err.to_string().contains("corrupt"));
    }
}
