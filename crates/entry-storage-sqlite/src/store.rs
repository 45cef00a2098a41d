//! SQLite-backed record store
//!
//! Implements [`StorageEngine`] over the encrypted database: one row per
//! record kind per owner, payloads encrypted with the master key before
//! they reach a statement. Batch operations keep crypto work outside the
//! transaction body, and single statements retry on `SQLITE_BUSY` with
//! exponential backoff.

use crate::database::{storage_err, Database};
use crate::security::{EncryptionKey, MasterKey};
use entry_core::{
    FundingProof, MigrationMarker, Passport, PersonalInfo, Record, RecordKind, RecordSnapshot,
    Result, StorageEngine,
};
use parking_lot::Mutex;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::thread;
use std::time::Duration;

/// Maximum retry attempts for SQLITE_BUSY
pub const MAX_BUSY_RETRIES: u32 = 5;

/// Base backoff duration in milliseconds
pub const BASE_BACKOFF_MS: u64 = 50;

/// Maximum backoff duration in milliseconds
pub const MAX_BACKOFF_MS: u64 = 1000;

/// Encrypted SQLite record store
pub struct SqliteStore {
    db: Mutex<Database>,
}

impl SqliteStore {
    /// Wrap an open database
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open the database at `path` and wrap it
    pub fn open<P: AsRef<Path>>(
        path: P,
        key: &EncryptionKey,
        master_key: MasterKey,
    ) -> Result<Self> {
        Ok(Self::new(Database::open(path, key, master_key)?))
    }

    fn table(kind: RecordKind) -> &'static str {
        match kind {
            RecordKind::Passport => "passports",
            RecordKind::PersonalInfo => "personal_info",
            RecordKind::FundingProof => "funding_proofs",
        }
    }

    fn encode_payload(record: &Record, master_key: &MasterKey) -> Result<Vec<u8>> {
        let plaintext = match record {
            Record::Passport(p) => serde_json::to_vec(p)?,
            Record::PersonalInfo(p) => serde_json::to_vec(p)?,
            Record::FundingProof(p) => serde_json::to_vec(p)?,
        };
        master_key.encrypt(&plaintext)
    }

    fn decode_payload(kind: RecordKind, payload: &[u8], master_key: &MasterKey) -> Result<Record> {
        let plaintext = master_key.decrypt(payload)?;
        Ok(match kind {
            RecordKind::Passport => Record::Passport(serde_json::from_slice::<Passport>(&plaintext)?),
            RecordKind::PersonalInfo => {
                Record::PersonalInfo(serde_json::from_slice::<PersonalInfo>(&plaintext)?)
            }
            RecordKind::FundingProof => {
                Record::FundingProof(serde_json::from_slice::<FundingProof>(&plaintext)?)
            }
        })
    }

    fn upsert_statement(kind: RecordKind) -> String {
        format!(
            "INSERT INTO {} (id, owner_id, payload, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5) \
             ON CONFLICT(owner_id) DO UPDATE SET \
               id=excluded.id, \
               payload=excluded.payload, \
               created_at=excluded.created_at, \
               updated_at=excluded.updated_at",
            Self::table(kind)
        )
    }

    fn upsert_row(conn: &Connection, record: &Record, payload: &[u8]) -> rusqlite::Result<()> {
        conn.execute(
            &Self::upsert_statement(record.kind()),
            params![
                record.id(),
                record.owner_id(),
                payload,
                record.created_at(),
                record.updated_at()
            ],
        )?;
        Ok(())
    }

    fn fetch_payload(
        conn: &Connection,
        kind: RecordKind,
        owner_id: &str,
    ) -> rusqlite::Result<Option<Vec<u8>>> {
        conn.query_row(
            &format!("SELECT payload FROM {} WHERE owner_id = ?1", Self::table(kind)),
            params![owner_id],
            |row| row.get(0),
        )
        .optional()
    }

    /// Retry a closure on SQLITE_BUSY with exponential backoff
    fn with_retry<T>(mut f: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
        let mut attempts = 0;
        loop {
            match f() {
                Ok(result) => return Ok(result),
                Err(ref e) if is_busy_error(e) && attempts < MAX_BUSY_RETRIES => {
                    attempts += 1;
                    let backoff = calculate_backoff(attempts);
                    tracing::debug!(
                        "SQLITE_BUSY (attempt {}/{}), retrying in {}ms",
                        attempts,
                        MAX_BUSY_RETRIES,
                        backoff
                    );
                    thread::sleep(Duration::from_millis(backoff));
                }
                Err(e) => return Err(storage_err(e)),
            }
        }
    }
}

impl StorageEngine for SqliteStore {
    fn get_record(&self, kind: RecordKind, owner_id: &str) -> Result<Option<Record>> {
        let db = self.db.lock();
        let payload = Self::with_retry(|| Self::fetch_payload(db.conn(), kind, owner_id))?;
        match payload {
            Some(payload) => Ok(Some(Self::decode_payload(kind, &payload, db.master_key())?)),
            None => Ok(None),
        }
    }

    fn save_record(&self, record: &Record) -> Result<Record> {
        let db = self.db.lock();
        let payload = Self::encode_payload(record, db.master_key())?;
        Self::with_retry(|| Self::upsert_row(db.conn(), record, &payload))?;
        tracing::debug!(
            kind = record.kind().as_str(),
            owner = record.owner_id(),
            "record saved"
        );
        Ok(record.clone())
    }

    fn batch_load(&self, owner_id: &str, kinds: &[RecordKind]) -> Result<RecordSnapshot> {
        let db = self.db.lock();
        let conn = db.conn();

        // One read transaction for a consistent snapshot; payloads are
        // collected raw and decrypted only after the transaction closes.
        conn.execute_batch("BEGIN").map_err(storage_err)?;
        let fetched: Result<Vec<(RecordKind, Option<Vec<u8>>)>> = kinds
            .iter()
            .map(|&kind| {
                Self::fetch_payload(conn, kind, owner_id)
                    .map(|payload| (kind, payload))
                    .map_err(storage_err)
            })
            .collect();
        match &fetched {
            Ok(_) => conn.execute_batch("COMMIT").map_err(storage_err)?,
            Err(_) => {
                let _ = conn.execute_batch("ROLLBACK");
            }
        }

        let mut snapshot = RecordSnapshot::default();
        for (kind, payload) in fetched? {
            if let Some(payload) = payload {
                snapshot.set(Self::decode_payload(kind, &payload, db.master_key())?);
            }
        }
        Ok(snapshot)
    }

    fn batch_save(&self, records: &[Record]) -> Result<()> {
        let db = self.db.lock();

        // Encrypt every payload before the transaction opens; the body
        // below is synchronous statement execution only.
        let payloads: Result<Vec<Vec<u8>>> = records
            .iter()
            .map(|record| Self::encode_payload(record, db.master_key()))
            .collect();
        let payloads = payloads?;

        let conn = db.conn();
        conn.execute_batch("BEGIN IMMEDIATE").map_err(storage_err)?;

        let result: Result<()> = records
            .iter()
            .zip(&payloads)
            .try_for_each(|(record, payload)| {
                Self::upsert_row(conn, record, payload).map_err(storage_err)
            });

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT").map_err(storage_err)?;
                tracing::debug!(rows = records.len(), "batch save committed");
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                tracing::warn!("batch save rolled back: {}", e);
                Err(e)
            }
        }
    }

    fn has_any(&self, owner_id: &str) -> Result<bool> {
        let db = self.db.lock();
        db.conn()
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM passports WHERE owner_id = ?1) \
                     OR EXISTS(SELECT 1 FROM personal_info WHERE owner_id = ?1) \
                     OR EXISTS(SELECT 1 FROM funding_proofs WHERE owner_id = ?1)",
                params![owner_id],
                |row| row.get(0),
            )
            .map_err(storage_err)
    }

    fn delete_all(&self, owner_id: &str) -> Result<()> {
        let db = self.db.lock();
        let conn = db.conn();

        conn.execute_batch("BEGIN IMMEDIATE").map_err(storage_err)?;
        let result: Result<()> = (|| {
            for kind in RecordKind::all() {
                conn.execute(
                    &format!("DELETE FROM {} WHERE owner_id = ?1", Self::table(*kind)),
                    params![owner_id],
                )
                .map_err(storage_err)?;
            }
            Ok(())
        })();

        match result {
            Ok(()) => {
                conn.execute_batch("COMMIT").map_err(storage_err)?;
                tracing::info!(owner = owner_id, "all records deleted");
                Ok(())
            }
            Err(e) => {
                let _ = conn.execute_batch("ROLLBACK");
                Err(e)
            }
        }
    }

    fn needs_migration(&self, owner_id: &str) -> Result<bool> {
        Ok(self.get_migration_status(owner_id)?.is_none())
    }

    fn mark_migration_complete(&self, owner_id: &str, source: &str) -> Result<()> {
        let db = self.db.lock();
        let migrated_at = chrono::Utc::now().to_rfc3339();
        Self::with_retry(|| {
            db.conn().execute(
                "INSERT OR REPLACE INTO migration_markers (owner_id, migrated_at, source) \
                 VALUES (?1, ?2, ?3)",
                params![owner_id, migrated_at, source],
            )
        })?;
        Ok(())
    }

    fn get_migration_status(&self, owner_id: &str) -> Result<Option<MigrationMarker>> {
        let db = self.db.lock();
        db.conn()
            .query_row(
                "SELECT owner_id, migrated_at, source FROM migration_markers WHERE owner_id = ?1",
                params![owner_id],
                |row| {
                    Ok(MigrationMarker {
                        owner_id: row.get(0)?,
                        migrated_at: row.get(1)?,
                        source: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(storage_err)
    }
}

/// Calculate exponential backoff with jitter
fn calculate_backoff(attempt: u32) -> u64 {
    let base = BASE_BACKOFF_MS * (1 << attempt.min(6));
    let jitter = rand::random::<u64>() % (base / 4 + 1);
    (base + jitter).min(MAX_BACKOFF_MS)
}

/// Check if error is SQLITE_BUSY
fn is_busy_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: ErrorCode::DatabaseBusy,
                ..
            },
            _
        )
    )
}
