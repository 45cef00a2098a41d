//! Encrypted SQLite storage for the Entry Assistant data layer
//!
//! Provides the encrypted-at-rest record store behind the
//! [`entry_core::StorageEngine`] trait, plus the legacy key-value store
//! that one-time migration reads from.
//!
//! ## Security
//!
//! - **Database Encryption**: SQLCipher page encryption keyed via
//!   `PRAGMA key` before any other statement
//! - **Payload Encryption**: record payloads are additionally encrypted
//!   field-level with AES-256-GCM or ChaCha20-Poly1305 before they hit a
//!   row, so backups of the raw file leak nothing even if the page key
//!   is compromised
//! - **Key Derivation**: Argon2id (64 MiB, 3 iterations, 4 lanes) from
//!   the app passphrase; SHA-256 retained only to open old installs
//! - **Key Hygiene**: master key bytes are zeroized on drop

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod database;
pub mod legacy;
pub mod migrations;
pub mod paths;
pub mod security;
pub mod store;

pub use database::Database;
pub use legacy::{FileLegacyStore, MemoryLegacyStore};
pub use security::{
    generate_salt, EncryptionAlgorithm, EncryptionKey, MasterKey,
};
pub use store::{SqliteStore, BASE_BACKOFF_MS, MAX_BACKOFF_MS, MAX_BUSY_RETRIES};
