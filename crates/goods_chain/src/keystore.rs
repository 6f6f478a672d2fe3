use std::fmt;
use std::path::{Path, PathBuf};

use near_crypto::{KeyType, PublicKey, SecretKey};
use near_primitives::types::AccountId;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ChainError;
use crate::network::{Network, NetworkProfile};

/// A full-access keypair for one account, in the `near-cli` credentials layout.
#[derive(Clone, Serialize, Deserialize)]
pub struct StoredKey {
    pub account_id: AccountId,
    pub public_key: PublicKey,
    #[serde(alias = "secret_key")]
    pub private_key: SecretKey,
}

impl StoredKey {
    /// Generate a fresh ED25519 keypair for `account_id`.
    pub fn generate(account_id: AccountId) -> Self {
        let private_key = SecretKey::from_random(KeyType::ED25519);
        Self {
            account_id,
            public_key: private_key.public_key(),
            private_key,
        }
    }
}

impl fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredKey")
            .field("account_id", &self.account_id)
            .field("public_key", &self.public_key.to_string())
            .finish_non_exhaustive()
    }
}

/// Unencrypted file-system key store keyed by network and account id.
///
/// Keys live at `<root>/<network>/<account_id>.json`, the same place
/// `near-cli` reads and writes them.
#[derive(Debug, Clone)]
pub struct KeyStore {
    root: PathBuf,
    network: Network,
}

impl KeyStore {
    pub fn new(root: PathBuf, network: Network) -> Self {
        Self { root, network }
    }

    pub fn for_profile(profile: &NetworkProfile) -> Self {
        Self::new(profile.key_store_dir.clone(), profile.network)
    }

    /// Directory holding this network's key files.
    pub fn dir(&self) -> PathBuf {
        self.root.join(self.network.id())
    }

    pub fn key_path(&self, account_id: &AccountId) -> PathBuf {
        self.dir().join(format!("{account_id}.json"))
    }

    /// Load the key for an account. `Ok(None)` when there is no key file.
    pub fn get_key(&self, account_id: &AccountId) -> Result<Option<StoredKey>, ChainError> {
        let path = self.key_path(account_id);
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)?;
        let key: StoredKey = serde_json::from_str(&json).map_err(|e| ChainError::CorruptKey {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        if &key.account_id != account_id {
            return Err(ChainError::CorruptKey {
                path,
                reason: format!("file belongs to {}", key.account_id),
            });
        }
        Ok(Some(key))
    }

    /// Load the key for an account, failing when it is absent.
    pub fn require_key(&self, account_id: &AccountId) -> Result<StoredKey, ChainError> {
        self.get_key(account_id)?.ok_or_else(|| ChainError::KeyNotFound {
            account_id: account_id.to_string(),
            network: self.network.id().to_string(),
            dir: self.dir(),
        })
    }

    /// Persist a key, replacing any existing file for the same account.
    pub fn set_key(&self, key: &StoredKey) -> Result<PathBuf, ChainError> {
        let dir = self.dir();
        std::fs::create_dir_all(&dir)?;
        let path = self.key_path(&key.account_id);
        let json = serde_json::to_string_pretty(key)?;
        write_private(&path, json.as_bytes())?;

        info!(
            account_id = %key.account_id,
            network = %self.network,
            path = %path.display(),
            "key stored"
        );
        Ok(path)
    }

    /// Delete the local key file. Returns whether a key was removed.
    ///
    /// This does not touch the chain; the account keeps the public key until
    /// it is deleted or the key is removed on chain.
    pub fn remove_key(&self, account_id: &AccountId) -> Result<bool, ChainError> {
        let path = self.key_path(account_id);
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        info!(account_id = %account_id, network = %self.network, "key removed from store");
        Ok(true)
    }

    /// Accounts with a key file for this network, sorted.
    pub fn list_accounts(&self) -> Result<Vec<AccountId>, ChainError> {
        let dir = self.dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut accounts: Vec<AccountId> = std::fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                name.strip_suffix(".json")?.parse().ok()
            })
            .collect();
        accounts.sort();
        Ok(accounts)
    }
}

/// Write a secret. On Unix the file is owner-only (0o600) before any byte
/// of the secret lands in it, including when an older file is replaced.
#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> AccountId {
        id.parse().unwrap()
    }

    fn store(dir: &tempfile::TempDir) -> KeyStore {
        KeyStore::new(dir.path().to_path_buf(), Network::Testnet)
    }

    #[test]
    fn set_and_get_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let key = StoredKey::generate(account("alice.testnet"));

        let path = store.set_key(&key).unwrap();
        assert_eq!(path, dir.path().join("testnet").join("alice.testnet.json"));

        let loaded = store.get_key(&account("alice.testnet")).unwrap().unwrap();
        assert_eq!(loaded.public_key, key.public_key);
        assert_eq!(loaded.private_key.to_string(), key.private_key.to_string());
    }

    #[test]
    fn missing_key_is_none_and_require_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.get_key(&account("bob.testnet")).unwrap().is_none());

        let err = store.require_key(&account("bob.testnet")).unwrap_err();
        assert!(matches!(err, ChainError::KeyNotFound { .. }));
        assert!(err.to_string().contains("bob.testnet"));
    }

    #[test]
    fn keys_are_scoped_by_network() {
        let dir = tempfile::tempdir().unwrap();
        let testnet = store(&dir);
        let mainnet = KeyStore::new(dir.path().to_path_buf(), Network::Mainnet);

        testnet.set_key(&StoredKey::generate(account("carol.testnet"))).unwrap();
        assert!(mainnet.get_key(&account("carol.testnet")).unwrap().is_none());
    }

    #[test]
    fn reads_near_cli_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let generated = StoredKey::generate(account("dave.testnet"));
        std::fs::create_dir_all(store.dir()).unwrap();
        let json = format!(
            r#"{{"account_id":"dave.testnet","public_key":"{}","private_key":"{}"}}"#,
            generated.public_key, generated.private_key
        );
        std::fs::write(store.key_path(&account("dave.testnet")), json).unwrap();

        let loaded = store.require_key(&account("dave.testnet")).unwrap();
        assert_eq!(loaded.public_key, generated.public_key);
    }

    #[test]
    fn corrupt_key_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(store.key_path(&account("eve.testnet")), "{}").unwrap();

        let err = store.get_key(&account("eve.testnet")).unwrap_err();
        assert!(matches!(err, ChainError::CorruptKey { .. }));
    }

    #[test]
    fn mismatched_account_in_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let key = StoredKey::generate(account("frank.testnet"));
        std::fs::create_dir_all(store.dir()).unwrap();
        std::fs::write(
            store.key_path(&account("grace.testnet")),
            serde_json::to_string(&key).unwrap(),
        )
        .unwrap();

        assert!(store.get_key(&account("grace.testnet")).is_err());
    }

    #[test]
    fn remove_key_reports_whether_anything_was_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.set_key(&StoredKey::generate(account("heidi.testnet"))).unwrap();

        assert!(store.remove_key(&account("heidi.testnet")).unwrap());
        assert!(!store.remove_key(&account("heidi.testnet")).unwrap());
        assert!(store.get_key(&account("heidi.testnet")).unwrap().is_none());
    }

    #[test]
    fn list_accounts_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.list_accounts().unwrap().is_empty());

        for id in ["zed.testnet", "amy.testnet"] {
            store.set_key(&StoredKey::generate(account(id))).unwrap();
        }
        std::fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        let listed = store.list_accounts().unwrap();
        assert_eq!(listed, vec![account("amy.testnet"), account("zed.testnet")]);
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let path = store.set_key(&StoredKey::generate(account("ivan.testnet"))).unwrap();
        let mode = std::fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn replacing_a_readable_key_file_makes_it_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let key = StoredKey::generate(account("judy.testnet"));
        let path = store.key_path(&key.account_id);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{}").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        store.set_key(&key).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(store.require_key(&key.account_id).unwrap().public_key, key.public_key);
    }

    #[test]
    fn debug_hides_private_key() {
        let key = StoredKey::generate(account("judy.testnet"));
        let debug = format!("{key:?}");
        assert!(!debug.contains(&key.private_key.to_string()));
        assert!(debug.contains("judy.testnet"));
    }
}
