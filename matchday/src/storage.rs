//! Durable client-side key-value storage.
//!
//! Two logical key spaces share one store: the credential pair
//! (`auth_token` + `wallet_address`) and the reward-card cache. Access is
//! synchronous and uncoordinated across processes; last writer wins.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{MatchdayError, Result};

pub const AUTH_TOKEN_KEY: &str = "auth_token";
pub const WALLET_ADDRESS_KEY: &str = "wallet_address";

/// A string-to-string store with browser-storage semantics.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process store; contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.entries).is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object on disk.
///
/// The whole file is rewritten on every mutation.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileStore {
    /// Open (or lazily create) the store at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, text)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(lock(&self.entries).get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }
}

/// Persisted bearer credential and the address it was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub address: String,
}

/// The `{auth_token, wallet_address}` key space.
///
/// Both keys are written and cleared together; a half-written pair is rolled
/// back and a half-present pair reads as absent.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Result<Option<Credentials>> {
        let token = self.store.get(AUTH_TOKEN_KEY)?;
        let address = self.store.get(WALLET_ADDRESS_KEY)?;
        match (token, address) {
            (Some(token), Some(address)) if !token.is_empty() && !address.is_empty() => {
                Ok(Some(Credentials { token, address }))
            }
            _ => Ok(None),
        }
    }

    pub fn save(&self, token: &str, address: &str) -> Result<()> {
        if token.is_empty() || address.is_empty() {
            return Err(MatchdayError::Validation(
                "token and address must both be non-empty".into(),
            ));
        }

        self.store.set(AUTH_TOKEN_KEY, token)?;
        if let Err(e) = self.store.set(WALLET_ADDRESS_KEY, address) {
            let _ = self.store.remove(AUTH_TOKEN_KEY);
            return Err(e);
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let token = self.store.remove(AUTH_TOKEN_KEY);
        let address = self.store.remove(WALLET_ADDRESS_KEY);
        token.and(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        let nonce: u64 = rand::random();
        std::env::temp_dir().join(format!("matchday-{name}-{nonce}.json"))
    }

    #[test]
    fn test_memory_store_basic() {
        let store = MemoryStore::new();
        assert!(store.get("k").unwrap().is_none());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let path = temp_path("persist");
        {
            let store = FileStore::open(&path).unwrap();
            store.set("a", "1").unwrap();
            store.set("b", "2").unwrap();
            store.remove("a").unwrap();
        }
        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get("a").unwrap(), None);
        assert_eq!(reopened.get("b").unwrap().as_deref(), Some("2"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_credentials_written_and_cleared_together() {
        let kv = Arc::new(MemoryStore::new());
        let creds = CredentialStore::new(kv.clone());

        creds.save("tok", "0xabc").unwrap();
        assert_eq!(
            creds.load().unwrap(),
            Some(Credentials {
                token: "tok".into(),
                address: "0xabc".into()
            })
        );

        creds.clear().unwrap();
        assert_eq!(creds.load().unwrap(), None);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_half_present_pair_reads_as_absent() {
        let kv = Arc::new(MemoryStore::new());
        kv.set(AUTH_TOKEN_KEY, "tok").unwrap();
        let creds = CredentialStore::new(kv);
        assert_eq!(creds.load().unwrap(), None);
    }

    #[test]
    fn test_save_rejects_empty_values() {
        let creds = CredentialStore::new(Arc::new(MemoryStore::new()));
        assert!(creds.save("", "0xabc").is_err());
        assert!(creds.save("tok", "").is_err());
        assert_eq!(creds.load().unwrap(), None);
    }
}
