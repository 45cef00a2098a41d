//! Record kind discriminant

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three record kinds managed by the data layer.
///
/// Every cache entry, storage row, and migration attempt is keyed by a
/// kind plus an owner id. Matching on this enum is exhaustive, so adding
/// a record kind is a compile-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// Passport document record
    Passport,
    /// Contact and residence details
    PersonalInfo,
    /// Proof-of-funds record
    FundingProof,
}

impl RecordKind {
    /// Stable string form used for storage routing and log fields
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Passport => "passport",
            RecordKind::PersonalInfo => "personal_info",
            RecordKind::FundingProof => "funding_proof",
        }
    }

    /// All kinds, in the order batch operations process them
    pub fn all() -> &'static [RecordKind] {
        &[
            RecordKind::Passport,
            RecordKind::PersonalInfo,
            RecordKind::FundingProof,
        ]
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
