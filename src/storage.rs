//! Durable client storage for the session credential and identity snapshot.
//!
//! Two entries are kept: the bearer credential under [`CREDENTIAL_KEY`] and a
//! JSON snapshot of the [`User`] under [`SNAPSHOT_KEY`]. They are written and
//! cleared together. A [`CredentialSource`] may be attached as a read-only
//! fallback for the credential.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use reqwest::cookie::{CookieStore, Jar};
use url::Url;

use crate::error::Error;
use crate::types::{Credential, User};

pub const CREDENTIAL_KEY: &str = "auth_token";
pub const SNAPSHOT_KEY: &str = "user";

/// Key/value storage that survives restarts.
pub trait DurableStorage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Process-local storage. Lost on restart; used in tests and headless tools.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DurableStorage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.entries.write().insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON file.
///
/// The whole map is rewritten on every change via a temp file and rename.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStorage {
    /// Open (or lazily create) the storage file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if an existing file cannot be read, or
    /// [`Error::Json`] if it is not a JSON object of strings.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened file storage");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<(), Error> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl DurableStorage for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        let previous = entries.insert(key.to_owned(), value.to_owned());
        if let Err(e) = self.flush(&entries) {
            // keep memory and disk in agreement
            match previous {
                Some(old) => entries.insert(key.to_owned(), old),
                None => entries.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut entries = self.entries.lock();
        let Some(previous) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.flush(&entries) {
            entries.insert(key.to_owned(), previous);
            return Err(e);
        }
        Ok(())
    }
}

/// Secondary, read-only place a credential may be found.
pub trait CredentialSource: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// Reads the credential from a cookie in a `reqwest` jar, scoped to the
/// backend base address.
pub struct CookieCredential {
    jar: Arc<Jar>,
    url: Url,
    name: String,
}

impl CookieCredential {
    #[must_use]
    pub fn new(jar: Arc<Jar>, url: Url, name: impl Into<String>) -> Self {
        Self {
            jar,
            url,
            name: name.into(),
        }
    }
}

impl CredentialSource for CookieCredential {
    fn credential(&self) -> Option<Credential> {
        let header = self.jar.cookies(&self.url)?;
        let header = header.to_str().ok()?;
        cookie::Cookie::split_parse(header)
            .filter_map(Result::ok)
            .find(|c| c.name() == self.name && !c.value().is_empty())
            .map(|c| Credential::new(c.value()))
    }
}

/// The credential/snapshot pair on top of a [`DurableStorage`].
///
/// Writes always go to the primary store; the fallback is only read.
pub struct SessionStorage {
    primary: Arc<dyn DurableStorage>,
    fallback: Option<Arc<dyn CredentialSource>>,
}

impl SessionStorage {
    #[must_use]
    pub fn new(primary: Arc<dyn DurableStorage>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }

    /// Read the credential from `fallback` when the primary store has none.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn CredentialSource>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Stored credential: primary store first, then the fallback.
    #[must_use]
    pub fn credential(&self) -> Option<Credential> {
        self.primary
            .get(CREDENTIAL_KEY)
            .filter(|t| !t.is_empty())
            .map(Credential::new)
            .or_else(|| self.fallback.as_ref().and_then(|f| f.credential()))
    }

    /// Raw serialized identity snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Option<String> {
        self.primary.get(SNAPSHOT_KEY)
    }

    /// Persist a freshly issued credential together with its identity.
    ///
    /// On failure the previously stored pair is put back, so a session that
    /// was persisted before stays persisted.
    ///
    /// # Errors
    ///
    /// Returns an error if either entry could not be written.
    pub fn persist(&self, credential: &Credential, user: &User) -> Result<(), Error> {
        let snapshot = serde_json::to_string(user)?;
        let previous = self.primary.get(CREDENTIAL_KEY);
        self.primary.set(CREDENTIAL_KEY, credential.as_str())?;
        if let Err(e) = self.primary.set(SNAPSHOT_KEY, &snapshot) {
            self.restore(CREDENTIAL_KEY, previous);
            return Err(e);
        }
        Ok(())
    }

    fn restore(&self, key: &str, previous: Option<String>) {
        let restored = match previous {
            Some(value) => self.primary.set(key, &value),
            None => self.primary.remove(key),
        };
        if let Err(e) = restored {
            tracing::error!(key, error = %e, "Failed to roll back session entry");
        }
    }

    /// Replace the identity snapshot, leaving the credential untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot could not be written.
    pub fn persist_user(&self, user: &User) -> Result<(), Error> {
        let snapshot = serde_json::to_string(user)?;
        self.primary.set(SNAPSHOT_KEY, &snapshot)
    }

    /// Remove both entries. Both removals are attempted even if one fails.
    ///
    /// # Errors
    ///
    /// Returns the first removal error.
    pub fn clear(&self) -> Result<(), Error> {
        let credential = self.primary.remove(CREDENTIAL_KEY);
        let snapshot = self.primary.remove(SNAPSHOT_KEY);
        credential.and(snapshot)
    }

    /// [`clear`](Self::clear), logging instead of returning the error.
    pub fn clear_logged(&self) {
        if let Err(e) = self.clear() {
            tracing::error!(error = %e, "Failed to clear persisted session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    fn user() -> User {
        User::new("1", "Amina", "amina@example.com", Role::Customer)
    }

    struct FixedCredential(&'static str);

    impl CredentialSource for FixedCredential {
        fn credential(&self) -> Option<Credential> {
            Some(Credential::new(self.0))
        }
    }

    /// Accepts the credential but refuses the snapshot.
    #[derive(Default)]
    struct SnapshotFails(MemoryStorage);

    impl DurableStorage for SnapshotFails {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), Error> {
            if key == SNAPSHOT_KEY {
                return Err(Error::Storage("quota exceeded".into()));
            }
            self.0.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<(), Error> {
            self.0.remove(key)
        }
    }

    #[test]
    fn test_persist_and_clear_together() {
        let memory = Arc::new(MemoryStorage::new());
        let storage = SessionStorage::new(memory.clone());

        storage.persist(&Credential::new("t1"), &user()).unwrap();
        assert_eq!(storage.credential(), Some(Credential::new("t1")));
        let snapshot: User = serde_json::from_str(&storage.snapshot().unwrap()).unwrap();
        assert_eq!(snapshot, user());

        storage.clear().unwrap();
        assert!(memory.is_empty());
        // clearing twice is fine
        storage.clear().unwrap();
    }

    #[test]
    fn test_failed_persist_leaves_nothing() {
        let primary = Arc::new(SnapshotFails::default());
        let storage = SessionStorage::new(primary.clone());

        assert!(storage.persist(&Credential::new("t1"), &user()).is_err());
        assert!(storage.credential().is_none());
        assert!(primary.0.is_empty());
    }

    #[test]
    fn test_failed_persist_keeps_previous_session() {
        let primary = Arc::new(SnapshotFails::default());
        primary.0.set(CREDENTIAL_KEY, "t0").unwrap();
        primary.0.set(SNAPSHOT_KEY, "{\"id\":\"0\"}").unwrap();
        let storage = SessionStorage::new(primary.clone());

        assert!(storage.persist(&Credential::new("t1"), &user()).is_err());
        assert_eq!(storage.credential(), Some(Credential::new("t0")));
        assert_eq!(storage.snapshot().as_deref(), Some("{\"id\":\"0\"}"));
    }

    #[test]
    fn test_fallback_is_read_only_second_choice() {
        let memory = Arc::new(MemoryStorage::new());
        let storage = SessionStorage::new(memory.clone())
            .with_fallback(Arc::new(FixedCredential("from-cookie")));

        assert_eq!(storage.credential(), Some(Credential::new("from-cookie")));

        storage.persist(&Credential::new("primary"), &user()).unwrap();
        assert_eq!(storage.credential(), Some(Credential::new("primary")));

        storage.clear().unwrap();
        assert_eq!(storage.credential(), Some(Credential::new("from-cookie")));
    }

    #[test]
    fn test_cookie_credential_reads_named_cookie() {
        let url: Url = "http://localhost:8000/api".parse().unwrap();
        let jar = Arc::new(Jar::default());
        jar.add_cookie_str("theme=dark", &url);
        jar.add_cookie_str("auth_token=cookie-token; Path=/", &url);

        let source = CookieCredential::new(jar, url, "auth_token");
        assert_eq!(source.credential(), Some(Credential::new("cookie-token")));
    }

    #[test]
    fn test_cookie_credential_absent() {
        let url: Url = "http://localhost:8000/api".parse().unwrap();
        let source = CookieCredential::new(Arc::new(Jar::default()), url, "auth_token");
        assert!(source.credential().is_none());
    }

    #[test]
    fn test_file_storage_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let first = FileStorage::open(&path).unwrap();
        first.set(CREDENTIAL_KEY, "t1").unwrap();
        first.set(SNAPSHOT_KEY, "{}").unwrap();
        first.remove(SNAPSHOT_KEY).unwrap();
        drop(first);

        let reopened = FileStorage::open(&path).unwrap();
        assert_eq!(reopened.get(CREDENTIAL_KEY).as_deref(), Some("t1"));
        assert!(reopened.get(SNAPSHOT_KEY).is_none());
        assert_eq!(reopened.path(), path.as_path());
    }

    #[test]
    fn test_file_storage_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, b"not json").unwrap();
        assert!(matches!(FileStorage::open(&path), Err(Error::Json(_))));
    }
}
