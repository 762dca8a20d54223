//! Session management and token persistence.
//!
//! This module provides:
//! - `SessionStore`: owner of the current token and profile (restore, login, logout)
//! - `TokenStorage`: where the raw token is persisted between runs
//! - Storage backends: in-memory, JSON file, OS keychain, and encrypted file
//!
//! Expiry is only checked when a persisted token is restored; a running
//! session is not monitored.

pub mod credentials;
pub mod encrypted;
pub mod session;
pub mod storage;

pub use credentials::{EncryptionKey, KeyringStorage};
pub use encrypted::EncryptedFileStorage;
pub use session::{SessionEvent, SessionOptions, SessionState, SessionStore, SubscriptionId, TokenRejection};
pub use storage::{FileStorage, MemoryStorage, StorageError, TokenStorage};
