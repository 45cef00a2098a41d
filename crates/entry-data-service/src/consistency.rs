//! Cross-record validation and legacy-vs-engine diffing

use entry_core::{CrossFieldCheck, FieldConflict, Record, RecordSnapshot};
use std::collections::BTreeMap;

fn normalized(value: &str) -> String {
    value.trim().to_ascii_lowercase()
}

/// Cross-record checks over whatever records exist in the snapshot.
///
/// An owner-id mismatch between records is a hard error; nationality
/// disagreeing with country of residence is advisory only (dual
/// nationals and expats are legitimate).
pub(crate) fn cross_field_check(snapshot: &RecordSnapshot, owner_id: &str) -> CrossFieldCheck {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let owners = [
        snapshot.passport.as_ref().map(|p| ("passport", p.owner_id.as_str())),
        snapshot
            .personal_info
            .as_ref()
            .map(|p| ("personal_info", p.owner_id.as_str())),
        snapshot
            .funding_proof
            .as_ref()
            .map(|p| ("funding_proof", p.owner_id.as_str())),
    ];
    for (label, record_owner) in owners.into_iter().flatten() {
        if record_owner != owner_id {
            errors.push(format!(
                "{} record belongs to owner {} but {} was requested",
                label, record_owner, owner_id
            ));
        }
    }

    if let (Some(passport), Some(info)) = (&snapshot.passport, &snapshot.personal_info) {
        let nationality = normalized(&passport.nationality);
        let country = normalized(&info.country_of_residence);
        if !nationality.is_empty() && !country.is_empty() && nationality != country {
            warnings.push(format!(
                "nationality '{}' differs from country of residence '{}'",
                passport.nationality, info.country_of_residence
            ));
        }
    }

    CrossFieldCheck {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Field-by-field diff between the engine's record and the legacy
/// store's rendition of the same kind. Only fields the legacy record
/// actually carries can conflict; an absent engine record conflicts
/// with every non-empty legacy field.
pub(crate) fn diff_records(engine: Option<&Record>, legacy: Option<&Record>) -> Vec<FieldConflict> {
    let Some(legacy) = legacy else {
        return Vec::new();
    };
    let legacy_fields = legacy.content_map();
    let engine_fields: BTreeMap<&'static str, String> =
        engine.map(|r| r.content_map()).unwrap_or_default();

    let mut conflicts = Vec::new();
    for (field, legacy_value) in legacy_fields {
        if legacy_value.trim().is_empty() {
            continue;
        }
        let engine_value = engine_fields.get(field);
        if engine_value.map(|v| v.as_str()) != Some(legacy_value.as_str()) {
            conflicts.push(FieldConflict {
                field: field.to_string(),
                engine_value: engine_value.cloned(),
                legacy_value: Some(legacy_value),
            });
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use entry_core::{Passport, PersonalInfo};

    fn snapshot_with(passport_owner: &str, info_owner: &str) -> RecordSnapshot {
        let mut snapshot = RecordSnapshot::default();
        snapshot.passport = Some(Passport::new(passport_owner));
        snapshot.personal_info = Some(PersonalInfo::new(info_owner));
        snapshot
    }

    #[test]
    fn test_owner_mismatch_is_hard_error() {
        let snapshot = snapshot_with("owner-1", "owner-2");
        let check = cross_field_check(&snapshot, "owner-1");
        assert!(!check.valid);
        assert_eq!(check.errors.len(), 1);
    }

    #[test]
    fn test_nationality_mismatch_is_warning_only() {
        let mut snapshot = snapshot_with("owner-1", "owner-1");
        snapshot.passport.as_mut().unwrap().nationality = "CHN".to_string();
        snapshot.personal_info.as_mut().unwrap().country_of_residence = "THA".to_string();

        let check = cross_field_check(&snapshot, "owner-1");
        assert!(check.valid);
        assert_eq!(check.warnings.len(), 1);
    }

    #[test]
    fn test_nationality_match_ignores_case() {
        let mut snapshot = snapshot_with("owner-1", "owner-1");
        snapshot.passport.as_mut().unwrap().nationality = "CHN".to_string();
        snapshot.personal_info.as_mut().unwrap().country_of_residence = "chn".to_string();

        let check = cross_field_check(&snapshot, "owner-1");
        assert!(check.warnings.is_empty());
    }

    #[test]
    fn test_diff_reports_differing_fields_only() {
        let mut engine = PersonalInfo::new("owner-1");
        engine.email = "new@x.com".to_string();
        engine.occupation = "Engineer".to_string();

        let mut legacy = PersonalInfo::new("owner-1");
        legacy.email = "old@x.com".to_string();
        legacy.occupation = "Engineer".to_string();

        let conflicts = diff_records(
            Some(&Record::PersonalInfo(engine)),
            Some(&Record::PersonalInfo(legacy)),
        );
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].field, "email");
        assert_eq!(conflicts[0].engine_value.as_deref(), Some("new@x.com"));
        assert_eq!(conflicts[0].legacy_value.as_deref(), Some("old@x.com"));
    }

    #[test]
    fn test_no_legacy_record_means_no_conflicts() {
        let engine = PersonalInfo::new("owner-1");
        assert!(diff_records(Some(&Record::PersonalInfo(engine)), None).is_empty());
    }

    #[test]
    fn test_absent_engine_record_conflicts_with_legacy_fields() {
        let mut legacy = PersonalInfo::new("owner-1");
        legacy.email = "old@x.com".to_string();

        let conflicts = diff_records(None, Some(&Record::PersonalInfo(legacy)));
        assert_eq!(conflicts.len(), 1);
        assert!(conflicts[0].engine_value.is_none());
    }
}
