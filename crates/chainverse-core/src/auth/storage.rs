use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use super::DelegatedIdentity;

/// Identity file name in cache directory
const IDENTITY_FILE: &str = "identity.json";

const KEYRING_SERVICE: &str = "chainverse";
const KEYRING_USER: &str = "delegated-identity";

/// Persistence for the delegated identity between runs.
pub trait IdentityStorage: Send + Sync {
    fn load(&self) -> Result<Option<DelegatedIdentity>>;
    fn save(&self, identity: &DelegatedIdentity) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Stores the identity as JSON in the cache directory.
pub struct FileStorage {
    cache_dir: PathBuf,
}

impl FileStorage {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    fn identity_path(&self) -> PathBuf {
        self.cache_dir.join(IDENTITY_FILE)
    }
}

impl IdentityStorage for FileStorage {
    fn load(&self) -> Result<Option<DelegatedIdentity>> {
        let path = self.identity_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read identity file")?;
        let identity: DelegatedIdentity =
            serde_json::from_str(&contents).context("Failed to parse identity file")?;
        debug!(path = %path.display(), "Identity loaded from file");
        Ok(Some(identity))
    }

    fn save(&self, identity: &DelegatedIdentity) -> Result<()> {
        let path = self.identity_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(identity)?;
        std::fs::write(path, contents).context("Failed to write identity file")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.identity_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove identity file")?;
        }
        Ok(())
    }
}

/// Stores the identity in the OS keychain.
pub struct KeyringStorage;

impl KeyringStorage {
    fn entry() -> Result<Entry> {
        Entry::new(KEYRING_SERVICE, KEYRING_USER).context("Failed to create keyring entry")
    }
}

impl IdentityStorage for KeyringStorage {
    fn load(&self) -> Result<Option<DelegatedIdentity>> {
        match Self::entry()?.get_password() {
            Ok(json) => {
                let identity = serde_json::from_str(&json)
                    .context("Failed to parse identity from keychain")?;
                Ok(Some(identity))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve identity from keychain"),
        }
    }

    fn save(&self, identity: &DelegatedIdentity) -> Result<()> {
        let json = serde_json::to_string(identity)?;
        Self::entry()?
            .set_password(&json)
            .context("Failed to store identity in keychain")
    }

    fn clear(&self) -> Result<()> {
        match Self::entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete identity from keychain"),
        }
    }
}

/// Keeps the identity for the lifetime of the process only.
#[derive(Default)]
pub struct MemoryStorage {
    identity: Mutex<Option<DelegatedIdentity>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: DelegatedIdentity) -> Self {
        Self {
            identity: Mutex::new(Some(identity)),
        }
    }
}

impl IdentityStorage for MemoryStorage {
    fn load(&self) -> Result<Option<DelegatedIdentity>> {
        let guard = self
            .identity
            .lock()
            .map_err(|_| anyhow::anyhow!("identity storage lock poisoned"))?;
        Ok(guard.clone())
    }

    fn save(&self, identity: &DelegatedIdentity) -> Result<()> {
        let mut guard = self
            .identity
            .lock()
            .map_err(|_| anyhow::anyhow!("identity storage lock poisoned"))?;
        *guard = Some(identity.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self
            .identity
            .lock()
            .map_err(|_| anyhow::anyhow!("identity storage lock poisoned"))?;
        *guard = None;
        Ok(())
    }
}
