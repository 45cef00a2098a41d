//! Database connection and initialization

use crate::{
    migrations,
    security::{EncryptionKey, MasterKey},
};
use entry_core::{Error, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Database connection wrapper
pub struct Database {
    conn: Connection,
    master_key: MasterKey,
}

impl Database {
    /// Open database with encryption
    pub fn open<P: AsRef<Path>>(path: P, key: &EncryptionKey, master_key: MasterKey) -> Result<Self> {
        let db_exists = path.as_ref().exists();
        let path_buf = path.as_ref().to_path_buf();

        let conn = Connection::open_with_flags(
            &path_buf,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(storage_err)?;

        // PRAGMA key MUST be the first statement on the connection; anything
        // executed before it creates the database unencrypted.
        let key_hex = hex::encode(key.as_bytes());
        if let Err(e) = conn.execute(&format!("PRAGMA key = '{}';", key_hex.replace('\'', "''")), []) {
            // PRAGMA statements can return rows; that is not a failure
            if !e.to_string().contains("Execute returned results") {
                return Err(Error::Encryption(format!(
                    "Failed to set database encryption key: {}",
                    e
                )));
            }
        }

        conn.execute_batch("PRAGMA journal_mode=WAL;").map_err(storage_err)?;
        conn.execute_batch("PRAGMA foreign_keys=ON;").map_err(storage_err)?;

        // Verify SQLCipher is actually active
        let cipher_version: std::result::Result<String, rusqlite::Error> =
            conn.query_row("PRAGMA cipher_version", [], |row| row.get(0));
        match cipher_version {
            Ok(version) if !version.is_empty() => {
                tracing::debug!("SQLCipher version: {}", version);
            }
            Ok(_) | Err(_) => {
                return Err(Error::Encryption(
                    "SQLCipher encryption verification failed. Database may not be encrypted."
                        .to_string(),
                ));
            }
        }

        if db_exists {
            // Existing file: confirm we can read it with this key before
            // running migrations against garbage.
            let test_result: std::result::Result<i64, rusqlite::Error> =
                conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get(0));

            if test_result.is_err() {
                let file_size = std::fs::metadata(&path_buf).map(|m| m.len()).unwrap_or(0);
                if file_size < 100 {
                    tracing::warn!(
                        "Database file exists but is too small ({} bytes), may be corrupted",
                        file_size
                    );
                    return Err(Error::Encryption(
                        "Database file appears to be corrupted. Please delete it and try again."
                            .to_string(),
                    ));
                }
                return Err(Error::Encryption(
                    "Database encryption verification failed: cannot read from encrypted \
                     database. The database may have been created with a different key."
                        .to_string(),
                ));
            }
        }

        migrations::run_migrations(&conn)?;

        Ok(Self { conn, master_key })
    }

    /// Get connection
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get master key for payload encryption
    pub fn master_key(&self) -> &MasterKey {
        &self.master_key
    }

    /// Rekey database with a new encryption key
    pub fn rekey(&self, new_key: &EncryptionKey) -> Result<()> {
        let key_hex = hex::encode(new_key.as_bytes());
        if let Err(e) = self
            .conn
            .execute(&format!("PRAGMA rekey = '{}';", key_hex.replace('\'', "''")), [])
        {
            if !e.to_string().contains("Execute returned results") {
                return Err(Error::Encryption(format!("Failed to rekey database: {}", e)));
            }
        }
        Ok(())
    }
}

/// Map a rusqlite error into the shared taxonomy
pub(crate) fn storage_err(e: rusqlite::Error) -> Error {
    Error::Storage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::{generate_salt, EncryptionAlgorithm};
    use tempfile::NamedTempFile;

    #[test]
    fn test_open_database() {
        let file = NamedTempFile::new().unwrap();
        let salt = generate_salt();
        let key = EncryptionKey::from_passphrase("test", &salt).unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
        assert!(Database::open(file.path(), &key, master_key).is_ok());
    }

    #[test]
    fn test_wrong_database_key_fails() {
        let file = NamedTempFile::new().unwrap();
        let salt = generate_salt();
        let key1 = EncryptionKey::from_passphrase("correct-key", &salt).unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);

        let db = Database::open(file.path(), &key1, master_key.clone()).unwrap();
        db.conn()
            .execute(
                "INSERT INTO migration_markers (owner_id, migrated_at, source) \
                 VALUES ('o', 'now', 'test')",
                [],
            )
            .unwrap();
        drop(db);

        let key2 = EncryptionKey::from_passphrase("wrong-key", &salt).unwrap();
        let result = Database::open(file.path(), &key2, master_key);

        // SQLCipher with the wrong key either fails to open or serves garbage
        match result {
            Ok(db) => {
                let read: std::result::Result<i64, rusqlite::Error> = db.conn().query_row(
                    "SELECT COUNT(*) FROM migration_markers",
                    [],
                    |row| row.get(0),
                );
                assert!(read.is_err() || read.unwrap() != 1);
            }
            Err(_) => {}
        }
    }

    #[test]
    fn test_database_file_is_encrypted() {
        let file = NamedTempFile::new().unwrap();
        let salt = generate_salt();
        let key = EncryptionKey::from_passphrase("test-passphrase", &salt).unwrap();
        let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);

        let db = Database::open(file.path(), &key, master_key).unwrap();
        db.conn()
            .execute(
                "INSERT INTO migration_markers (owner_id, migrated_at, source) \
                 VALUES ('traveler-sensitive-owner', 'now', 'test')",
                [],
            )
            .unwrap();
        drop(db);

        let file_contents = std::fs::read(file.path()).unwrap();
        let file_string = String::from_utf8_lossy(&file_contents);
        assert!(
            !file_string.contains("traveler-sensitive-owner"),
            "Database file should not contain plaintext data"
        );
    }
}
