use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::credentials::EncryptionKey;
use super::storage::{read_if_exists, remove_if_exists, write_private, StorageError, TokenStorage};

/// Encrypted session file name in cache directory
pub const ENCRYPTED_SESSION_FILE: &str = "session.sealed.json";

/// ChaCha20-Poly1305 nonce length in bytes
const NONCE_LEN: usize = 12;

#[derive(Debug, Serialize, Deserialize)]
struct SealedToken {
    nonce: String,
    ciphertext: String,
    saved_at: DateTime<Utc>,
}

/// Token sealed with ChaCha20-Poly1305 before it touches disk.
///
/// Every write uses a fresh random nonce. A file that fails authentication
/// (tampered, or sealed under another key) reads as `StorageError::Corrupt`.
pub struct EncryptedFileStorage {
    path: PathBuf,
    cipher: ChaCha20Poly1305,
}

impl EncryptedFileStorage {
    pub fn new(path: PathBuf, key: &EncryptionKey) -> Self {
        Self {
            path,
            cipher: ChaCha20Poly1305::new(Key::from_slice(key.as_bytes())),
        }
    }

    pub fn in_dir(cache_dir: &Path, key: &EncryptionKey) -> Self {
        Self::new(cache_dir.join(ENCRYPTED_SESSION_FILE), key)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn seal(&self, token: &str) -> Result<SealedToken, StorageError> {
        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), token.as_bytes())
            .map_err(|_| StorageError::Corrupt("token encryption failed".to_string()))?;
        Ok(SealedToken {
            nonce: STANDARD.encode(nonce),
            ciphertext: STANDARD.encode(ciphertext),
            saved_at: Utc::now(),
        })
    }

    fn open(&self, sealed: &SealedToken) -> Result<String, StorageError> {
        let corrupt = |what: &str| StorageError::Corrupt(what.to_string());
        let nonce = STANDARD
            .decode(&sealed.nonce)
            .map_err(|_| corrupt("nonce is not base64"))?;
        if nonce.len() != NONCE_LEN {
            return Err(corrupt("nonce has the wrong length"));
        }
        let ciphertext = STANDARD
            .decode(&sealed.ciphertext)
            .map_err(|_| corrupt("ciphertext is not base64"))?;
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
            .map_err(|_| corrupt("authentication failed"))?;
        String::from_utf8(plaintext).map_err(|_| corrupt("token is not UTF-8"))
    }
}

impl TokenStorage for EncryptedFileStorage {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match read_if_exists(&self.path)? {
            Some(contents) => {
                let sealed: SealedToken = serde_json::from_str(&contents)?;
                self.open(&sealed).map(Some)
            }
            None => Ok(None),
        }
    }

    fn write(&self, token: &str) -> Result<(), StorageError> {
        let sealed = self.seal(token)?;
        write_private(&self.path, &serde_json::to_string_pretty(&sealed)?)
    }

    fn clear(&self) -> Result<(), StorageError> {
        remove_if_exists(&self.path)
    }
}
