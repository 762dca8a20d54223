use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use keyring::Entry;
use rand::RngCore;
use tracing::debug;

use super::storage::{StorageError, TokenStorage};

/// Keychain service name for every entry this crate creates
pub const SERVICE_NAME: &str = "sessionguard";

/// Keychain account holding the file-encryption key
const ENCRYPTION_KEY_ACCOUNT: &str = "session-encryption-key";

/// Length of a ChaCha20-Poly1305 key in bytes
pub const KEY_LEN: usize = 32;

/// Token kept in the OS keychain under `SERVICE_NAME` / `key`.
///
/// One `Entry` is held for the lifetime of the storage so every read sees
/// the credential the previous write touched.
#[derive(Debug)]
pub struct KeyringStorage {
    entry: Entry,
}

impl KeyringStorage {
    pub fn new(key: &str) -> Result<Self, StorageError> {
        Ok(Self::with_entry(Entry::new(SERVICE_NAME, key)?))
    }

    pub fn with_entry(entry: Entry) -> Self {
        Self { entry }
    }
}

impl TokenStorage for KeyringStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match self.entry.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, token: &str) -> Result<(), StorageError> {
        self.entry.set_password(token)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Symmetric key sealing the on-disk token of `EncryptedFileStorage`.
#[derive(Clone)]
pub struct EncryptionKey([u8; KEY_LEN]);

impl EncryptionKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    /// Fetch the key from the OS keychain, creating and storing one on first use.
    pub fn load_or_create() -> Result<Self, StorageError> {
        Self::load_or_create_in(&Entry::new(SERVICE_NAME, ENCRYPTION_KEY_ACCOUNT)?)
    }

    pub fn load_or_create_in(entry: &Entry) -> Result<Self, StorageError> {
        match entry.get_password() {
            Ok(encoded) => Self::decode(&encoded),
            Err(keyring::Error::NoEntry) => {
                debug!("Generating session encryption key");
                let key = Self::generate();
                entry.set_password(&STANDARD.encode(key.0))?;
                Ok(key)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn decode(encoded: &str) -> Result<Self, StorageError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| StorageError::Corrupt(format!("encryption key is not base64: {}", e)))?;
        let key: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| StorageError::Corrupt("encryption key has the wrong length".to_string()))?;
        Ok(Self(key))
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}
