//! One-time legacy-store import
//!
//! Reads whatever the old key-value store holds for an owner, normalizes
//! it into the current record shapes, and persists it through the
//! storage engine. Legacy data is best-effort: validation is skipped so
//! incomplete records survive the import instead of being rejected.

use entry_core::{
    FundingProof, KindOutcome, LegacyStore, MigrationOutcome, Passport, PersonalInfo, Record,
    RecordKind, Result, StorageEngine,
};

/// Candidate legacy keys for a kind, probed in order. Owner-scoped keys
/// come first; the bare names predate multi-user support.
pub(crate) fn candidate_keys(kind: RecordKind, owner_id: &str) -> Vec<String> {
    match kind {
        RecordKind::Passport => vec![
            format!("@passport_data_{}", owner_id),
            format!("@passport_{}", owner_id),
            "@passport_data".to_string(),
            "@passport".to_string(),
        ],
        RecordKind::PersonalInfo => vec![
            format!("@personal_info_{}", owner_id),
            "@personal_info".to_string(),
            "@personalInfo".to_string(),
        ],
        RecordKind::FundingProof => vec![
            format!("@funding_proof_{}", owner_id),
            "@funding_proof".to_string(),
            "@fund_info".to_string(),
            "@funds".to_string(),
        ],
    }
}

/// Probe the legacy store for one kind. The first key whose value both
/// parses as JSON and carries a recognizable field wins; unparseable or
/// unrecognizable values just move probing along.
pub(crate) fn probe_legacy<L: LegacyStore>(
    legacy: &L,
    kind: RecordKind,
    owner_id: &str,
) -> Result<Option<Record>> {
    for key in candidate_keys(kind, owner_id) {
        let Some(raw) = legacy.get_item(&key)? else {
            continue;
        };
        let value: serde_json::Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, "skipping unparseable legacy value: {}", e);
                continue;
            }
        };
        let record = match kind {
            RecordKind::Passport => Passport::from_legacy(&value, owner_id).map(Record::Passport),
            RecordKind::PersonalInfo => {
                PersonalInfo::from_legacy(&value, owner_id).map(Record::PersonalInfo)
            }
            RecordKind::FundingProof => {
                FundingProof::from_legacy(&value, owner_id).map(Record::FundingProof)
            }
        };
        if let Some(record) = record {
            tracing::debug!(key = %key, kind = kind.as_str(), "legacy record found");
            return Ok(Some(record));
        }
    }
    Ok(None)
}

/// Import one kind: probe, normalize, persist. Returns whether a legacy
/// record was found and written. Validation is intentionally not applied.
pub(crate) fn migrate_kind<S: StorageEngine, L: LegacyStore>(
    engine: &S,
    legacy: &L,
    kind: RecordKind,
    owner_id: &str,
) -> Result<bool> {
    match probe_legacy(legacy, kind, owner_id)? {
        Some(record) => {
            engine.save_record(&record)?;
            tracing::info!(kind = kind.as_str(), owner = owner_id, "legacy record migrated");
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Overall outcome from the per-kind results
pub(crate) fn classify(outcomes: &[KindOutcome], errors: &[String]) -> MigrationOutcome {
    if errors.is_empty() {
        MigrationOutcome::Complete
    } else if outcomes.iter().any(|o| *o == KindOutcome::Migrated) {
        MigrationOutcome::Partial {
            errors: errors.to_vec(),
        }
    } else {
        MigrationOutcome::Failed {
            errors: errors.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_scoped_keys_probe_first() {
        let keys = candidate_keys(RecordKind::Passport, "owner-1");
        assert_eq!(keys[0], "@passport_data_owner-1");
        assert!(keys.contains(&"@passport".to_string()));
        assert!(
            keys.iter().position(|k| k == "@passport").unwrap()
                > keys.iter().position(|k| k == "@passport_data_owner-1").unwrap()
        );
    }

    #[test]
    fn test_classify_complete_when_no_errors() {
        let outcomes = [KindOutcome::Migrated, KindOutcome::NoData, KindOutcome::NoData];
        assert_eq!(classify(&outcomes, &[]), MigrationOutcome::Complete);
    }

    #[test]
    fn test_classify_partial_when_some_migrated() {
        let outcomes = [KindOutcome::Migrated, KindOutcome::Failed, KindOutcome::NoData];
        let errors = vec!["personal_info: boom".to_string()];
        assert_eq!(
            classify(&outcomes, &errors),
            MigrationOutcome::Partial { errors }
        );
    }

    #[test]
    fn test_classify_failed_when_nothing_migrated() {
        let outcomes = [KindOutcome::Failed, KindOutcome::NoData, KindOutcome::NoData];
        let errors = vec!["passport: boom".to_string()];
        assert_eq!(
            classify(&outcomes, &errors),
            MigrationOutcome::Failed { errors }
        );
    }
}
