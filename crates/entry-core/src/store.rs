//! Storage engine and legacy store contracts
//!
//! The data service talks to persistence only through these traits.
//! `entry-storage-sqlite` provides the encrypted SQLite engine and the
//! file-backed legacy store; tests substitute in-memory doubles.

use crate::error::Result;
use crate::kind::RecordKind;
use crate::models::{FundingProof, Passport, PersonalInfo, Record};
use crate::reports::MigrationMarker;

/// One consistent snapshot of an owner's records, produced by a single
/// read transaction. Kinds that were not requested, or have no row, are
/// `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSnapshot {
    /// Passport record, if requested and present
    pub passport: Option<Passport>,
    /// Personal-info record, if requested and present
    pub personal_info: Option<PersonalInfo>,
    /// Funding-proof record, if requested and present
    pub funding_proof: Option<FundingProof>,
}

impl RecordSnapshot {
    /// Record of the given kind, if present
    pub fn get(&self, kind: RecordKind) -> Option<Record> {
        match kind {
            RecordKind::Passport => self.passport.clone().map(Record::Passport),
            RecordKind::PersonalInfo => self.personal_info.clone().map(Record::PersonalInfo),
            RecordKind::FundingProof => self.funding_proof.clone().map(Record::FundingProof),
        }
    }

    /// Store a record into its slot
    pub fn set(&mut self, record: Record) {
        match record {
            Record::Passport(p) => self.passport = Some(p),
            Record::PersonalInfo(p) => self.personal_info = Some(p),
            Record::FundingProof(p) => self.funding_proof = Some(p),
        }
    }
}

/// Encrypted record store: one row per kind per owner, plus migration
/// markers. Implementations handle field-level encryption internally;
/// for batch operations, crypto work must stay outside the transaction
/// body (encrypt before entering, decrypt after commit).
pub trait StorageEngine {
    /// Load one record, decrypting its payload. `None` means confirmed
    /// absent, which is a valid state rather than an error.
    fn get_record(&self, kind: RecordKind, owner_id: &str) -> Result<Option<Record>>;

    /// Persist one record, encrypting its payload. Upserts the owner's
    /// row for that kind and returns the stored record.
    fn save_record(&self, record: &Record) -> Result<Record>;

    /// Load the requested kinds in one read transaction. Decryption of
    /// the fetched payloads happens after the transaction has closed.
    fn batch_load(&self, owner_id: &str, kinds: &[RecordKind]) -> Result<RecordSnapshot>;

    /// Persist all records in one write transaction: every row commits
    /// or none do. Payloads are encrypted before the transaction opens;
    /// the body only executes statements.
    fn batch_save(&self, records: &[Record]) -> Result<()>;

    /// Whether any record of any kind exists for the owner
    fn has_any(&self, owner_id: &str) -> Result<bool>;

    /// Delete every record row for the owner in one transaction.
    /// Migration markers are left in place.
    fn delete_all(&self, owner_id: &str) -> Result<()>;

    /// Whether legacy migration has not yet been attempted for the owner
    fn needs_migration(&self, owner_id: &str) -> Result<bool>;

    /// Persist the migration marker for the owner
    fn mark_migration_complete(&self, owner_id: &str, source: &str) -> Result<()>;

    /// The owner's migration marker, if one exists
    fn get_migration_status(&self, owner_id: &str) -> Result<Option<MigrationMarker>>;
}

/// The simple key-value store that predates the encrypted engine.
/// Only read during one-time migration and conflict detection.
pub trait LegacyStore {
    /// Value under `key`, if present
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`
    fn remove_item(&self, key: &str) -> Result<()>;

    /// All keys currently present
    fn keys(&self) -> Result<Vec<String>>;
}
