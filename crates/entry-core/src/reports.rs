//! Structured results for migration, batch loads, and diagnostics
//!
//! Degraded outcomes (partial migration, detected conflicts) are data,
//! not errors: they are reported through these types so a caller can
//! keep working with whatever data survived.

use crate::kind::RecordKind;
use crate::models::{FundingProof, Passport, PersonalInfo};
use serde::{Deserialize, Serialize};

/// Source label recorded in migration markers written by the one-time
/// legacy key-value import
pub const MIGRATION_SOURCE: &str = "legacy-kv";

/// Per-owner marker persisted once legacy migration has been attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationMarker {
    /// Owning user
    pub owner_id: String,
    /// When migration finished (RFC 3339)
    pub migrated_at: String,
    /// Source store label, e.g. `"legacy-kv"`
    pub source: String,
}

/// Outcome of one record kind within a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KindOutcome {
    /// Legacy data found and persisted
    Migrated,
    /// No usable legacy data under any candidate key
    NoData,
    /// Transform or persist failed; detail is in the report errors
    Failed,
}

/// Overall migration outcome. Callers must handle all three states:
/// a `Failed` run still writes the migration marker, so retries only
/// happen through the explicitly exposed migration entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MigrationOutcome {
    /// Every kind either migrated or had no legacy data
    Complete,
    /// Some kinds migrated, some failed
    Partial {
        /// Failure detail per failed kind
        errors: Vec<String>,
    },
    /// Nothing migrated and at least one kind failed
    Failed {
        /// Failure detail per failed kind
        errors: Vec<String>,
    },
}

/// Result of a migration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    /// Owning user
    pub owner_id: String,
    /// True when a marker already existed and nothing was attempted
    pub already_migrated: bool,
    /// Overall outcome
    pub outcome: MigrationOutcome,
    /// Passport outcome
    pub passport: KindOutcome,
    /// Personal-info outcome
    pub personal_info: KindOutcome,
    /// Funding-proof outcome
    pub funding_proof: KindOutcome,
    /// All failure messages collected during the run
    pub errors: Vec<String>,
}

impl MigrationReport {
    /// Report for an owner whose marker already exists
    pub fn already_migrated(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            already_migrated: true,
            outcome: MigrationOutcome::Complete,
            passport: KindOutcome::NoData,
            personal_info: KindOutcome::NoData,
            funding_proof: KindOutcome::NoData,
            errors: Vec::new(),
        }
    }

    /// Outcome for one kind
    pub fn kind_outcome(&self, kind: RecordKind) -> KindOutcome {
        match kind {
            RecordKind::Passport => self.passport,
            RecordKind::PersonalInfo => self.personal_info,
            RecordKind::FundingProof => self.funding_proof,
        }
    }
}

/// All three records for an owner, loaded in one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDataBundle {
    /// Owning user
    pub owner_id: String,
    /// Passport record, if any
    pub passport: Option<Passport>,
    /// Personal-info record, if any
    pub personal_info: Option<PersonalInfo>,
    /// Funding-proof record, if any
    pub funding_proof: Option<FundingProof>,
    /// Completion timestamp (RFC 3339)
    pub loaded_at: String,
    /// Measured load duration
    pub load_duration_ms: u64,
}

impl UserDataBundle {
    /// True when no record of any kind is present
    pub fn is_empty(&self) -> bool {
        self.passport.is_none() && self.personal_info.is_none() && self.funding_proof.is_none()
    }
}

/// Validation result for one record kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCheck {
    /// Whether the record passed validation
    pub valid: bool,
    /// Field-level messages when it did not
    pub errors: Vec<String>,
}

impl RecordCheck {
    /// A passing check
    pub fn passed() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
        }
    }

    /// A failing check with messages
    pub fn failed(errors: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
        }
    }
}

/// Cross-record validation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossFieldCheck {
    /// Whether no hard cross-record error was found
    pub valid: bool,
    /// Hard errors (e.g. owner-id mismatch between records)
    pub errors: Vec<String>,
    /// Advisory findings (e.g. nationality vs residence mismatch)
    pub warnings: Vec<String>,
}

/// Full consistency diagnostic for an owner. Purely read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyReport {
    /// Owning user
    pub owner_id: String,
    /// True when every present record validates and no hard
    /// cross-record error was found
    pub is_consistent: bool,
    /// Passport check, when a passport exists
    pub passport: Option<RecordCheck>,
    /// Personal-info check, when a record exists
    pub personal_info: Option<RecordCheck>,
    /// Funding-proof check, when a record exists
    pub funding_proof: Option<RecordCheck>,
    /// Cross-record checks
    pub cross_field: CrossFieldCheck,
}

/// One field differing between the storage engine and the legacy store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConflict {
    /// Field name
    pub field: String,
    /// Value held by the storage engine, if any
    pub engine_value: Option<String>,
    /// Value held by the legacy store, if any
    pub legacy_value: Option<String>,
}

/// Field-by-field diff between the legacy store and the storage engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    /// Owning user
    pub owner_id: String,
    /// True when any kind has at least one differing field
    pub has_conflicts: bool,
    /// Passport conflicts
    pub passport: Vec<FieldConflict>,
    /// Personal-info conflicts
    pub personal_info: Vec<FieldConflict>,
    /// Funding-proof conflicts
    pub funding_proof: Vec<FieldConflict>,
    /// When the diff was taken (RFC 3339)
    pub checked_at: String,
}

impl ConflictReport {
    /// Total number of conflicting fields across all kinds
    pub fn conflict_count(&self) -> usize {
        self.passport.len() + self.personal_info.len() + self.funding_proof.len()
    }
}

/// Result of resolving conflicts in favor of the storage engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Owning user
    pub owner_id: String,
    /// Whether any conflicts existed to resolve
    pub had_conflicts: bool,
    /// Number of legacy-store values discarded
    pub discarded: usize,
    /// Whether the owner's cache entries were refreshed
    pub cache_refreshed: bool,
}
