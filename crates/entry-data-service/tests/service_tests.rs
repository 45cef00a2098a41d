//! End-to-end data service tests against the real encrypted store
//!
//! The storage engine and legacy store are wrapped in counting shims so
//! the tests can assert which layer actually served a read.

use entry_data_service::DataService;
use entry_core::{
    Error, FundingProof, KindOutcome, LegacyStore, MigrationMarker, MigrationOutcome, Passport,
    PassportUpdate, PersonalInfo, PersonalInfoUpdate, Record, RecordKind, RecordSnapshot, Result,
    StorageEngine, UserDataInput, UserDataUpdate,
};
use entry_storage_sqlite::{
    generate_salt, EncryptionAlgorithm, EncryptionKey, MasterKey, MemoryLegacyStore, SqliteStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::NamedTempFile;

/// Storage engine shim counting underlying loads
struct CountingEngine {
    inner: SqliteStore,
    gets: AtomicUsize,
    batch_loads: AtomicUsize,
}

impl CountingEngine {
    fn new(inner: SqliteStore) -> Self {
        Self {
            inner,
            gets: AtomicUsize::new(0),
            batch_loads: AtomicUsize::new(0),
        }
    }

    fn loads(&self) -> usize {
        self.gets.load(Ordering::SeqCst) + self.batch_loads.load(Ordering::SeqCst)
    }
}

impl StorageEngine for CountingEngine {
    fn get_record(&self, kind: RecordKind, owner_id: &str) -> Result<Option<Record>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get_record(kind, owner_id)
    }

    fn save_record(&self, record: &Record) -> Result<Record> {
        self.inner.save_record(record)
    }

    fn batch_load(&self, owner_id: &str, kinds: &[RecordKind]) -> Result<RecordSnapshot> {
        self.batch_loads.fetch_add(1, Ordering::SeqCst);
        self.inner.batch_load(owner_id, kinds)
    }

    fn batch_save(&self, records: &[Record]) -> Result<()> {
        self.inner.batch_save(records)
    }

    fn has_any(&self, owner_id: &str) -> Result<bool> {
        self.inner.has_any(owner_id)
    }

    fn delete_all(&self, owner_id: &str) -> Result<()> {
        self.inner.delete_all(owner_id)
    }

    fn needs_migration(&self, owner_id: &str) -> Result<bool> {
        self.inner.needs_migration(owner_id)
    }

    fn mark_migration_complete(&self, owner_id: &str, source: &str) -> Result<()> {
        self.inner.mark_migration_complete(owner_id, source)
    }

    fn get_migration_status(&self, owner_id: &str) -> Result<Option<MigrationMarker>> {
        self.inner.get_migration_status(owner_id)
    }
}

/// Legacy store shim counting reads
struct CountingLegacy {
    inner: MemoryLegacyStore,
    reads: AtomicUsize,
}

impl CountingLegacy {
    fn new() -> Self {
        Self {
            inner: MemoryLegacyStore::new(),
            reads: AtomicUsize::new(0),
        }
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl LegacyStore for CountingLegacy {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.inner.remove_item(key)
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys()
    }
}

type TestService = DataService<CountingEngine, CountingLegacy>;

fn test_service_with_ttl(ttl: Duration) -> (TestService, NamedTempFile) {
    let file = NamedTempFile::new().unwrap();
    let salt = generate_salt();
    let key = EncryptionKey::from_passphrase("test", &salt).unwrap();
    let master_key = MasterKey::generate(EncryptionAlgorithm::ChaCha20Poly1305);
    let store = SqliteStore::open(file.path(), &key, master_key).unwrap();
    let service = DataService::with_cache_ttl(
        CountingEngine::new(store),
        CountingLegacy::new(),
        ttl,
    );
    (service, file)
}

fn test_service() -> (TestService, NamedTempFile) {
    test_service_with_ttl(Duration::from_secs(300))
}

fn sample_passport(owner: &str) -> Passport {
    let mut passport = Passport::new(owner);
    passport.passport_number = "E12345678".to_string();
    passport.full_name = "ZHANG, WEI".to_string();
    passport.date_of_birth = "1990-05-01".to_string();
    passport.nationality = "CHN".to_string();
    passport.issue_date = "2020-01-15".to_string();
    passport.issue_place = "Beijing".to_string();
    passport.expiry_date = "2030-01-14".to_string();
    passport
}

fn sample_personal_info(owner: &str) -> PersonalInfo {
    let mut info = PersonalInfo::new(owner);
    info.phone_number = "+66 81 234 5678".to_string();
    info.email = "wei@example.com".to_string();
    info.country_of_residence = "CHN".to_string();
    info
}

fn sample_funding_proof(owner: &str) -> FundingProof {
    let mut proof = FundingProof::new(owner);
    proof.cash_amount = "20000 THB".to_string();
    proof
}

#[test]
fn test_reads_within_ttl_hit_cache() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    service.clear_cache();

    let loads_before = service.storage_engine().loads();
    let first = service.get_passport("owner-1").unwrap();
    assert_eq!(service.storage_engine().loads(), loads_before + 1);

    let second = service.get_passport("owner-1").unwrap();
    assert_eq!(first, second);
    assert_eq!(
        service.storage_engine().loads(),
        loads_before + 1,
        "second read within TTL must not hit the engine"
    );
    assert_eq!(service.get_cache_stats().hits, 1);
}

#[test]
fn test_read_after_ttl_reloads() {
    let (service, _file) = test_service_with_ttl(Duration::from_millis(30));
    service.save_passport(sample_passport("owner-1")).unwrap();
    service.clear_cache();

    let loads_before = service.storage_engine().loads();
    service.get_passport("owner-1").unwrap();
    std::thread::sleep(Duration::from_millis(40));
    service.get_passport("owner-1").unwrap();

    assert_eq!(
        service.storage_engine().loads(),
        loads_before + 2,
        "expired entry must reload"
    );
}

#[test]
fn test_confirmed_absent_is_cached() {
    let (service, _file) = test_service();

    assert!(service.get_passport("owner-1").unwrap().is_none());
    assert!(service.get_passport("owner-1").unwrap().is_none());

    let stats = service.get_cache_stats();
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 1, "cached None must serve the second read");
}

#[test]
fn test_write_invalidates_then_repopulates() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();

    // warm read, then update
    service.get_passport("owner-1").unwrap();
    let invalidations_before = service.get_cache_stats().invalidations;

    let updates = PassportUpdate {
        expiry_date: Some("2031-12-31".to_string()),
        ..PassportUpdate::default()
    };
    service.update_passport("owner-1", &updates).unwrap();

    let stats = service.get_cache_stats();
    assert_eq!(stats.invalidations, invalidations_before + 1);

    let hits_before = stats.hits;
    let loads_before = service.storage_engine().loads();
    let reloaded = service.get_passport("owner-1").unwrap().unwrap();
    assert_eq!(reloaded.expiry_date, "2031-12-31");
    assert_eq!(
        service.get_cache_stats().hits,
        hits_before + 1,
        "read after write must be a warm hit"
    );
    assert_eq!(
        service.storage_engine().loads(),
        loads_before,
        "read after write must not hit the engine"
    );
}

#[test]
fn test_per_owner_and_per_kind_isolation() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-a")).unwrap();

    assert!(service.get_passport("owner-b").unwrap().is_none());
    assert!(service.get_personal_info("owner-a").unwrap().is_none());
    let passport = service.get_passport("owner-a").unwrap();
    assert!(passport.is_some());
}

#[test]
fn test_personal_info_merge_does_not_overwrite() {
    let (service, _file) = test_service();
    service
        .save_personal_info(sample_personal_info("owner-1"))
        .unwrap();

    let updates = PersonalInfoUpdate {
        phone_number: Some(String::new()),
        email: Some("y@z.com".to_string()),
        ..PersonalInfoUpdate::default()
    };
    let merged = service.update_personal_info("owner-1", &updates).unwrap();

    assert_eq!(merged.phone_number, "+66 81 234 5678");
    assert_eq!(merged.email, "y@z.com");
}

#[test]
fn test_update_preserves_id_and_created_at() {
    let (service, _file) = test_service();
    let saved = service
        .save_personal_info(sample_personal_info("owner-1"))
        .unwrap();

    let updates = PersonalInfoUpdate {
        occupation: Some("Engineer".to_string()),
        ..PersonalInfoUpdate::default()
    };
    let merged = service.update_personal_info("owner-1", &updates).unwrap();

    assert_eq!(merged.id, saved.id);
    assert_eq!(merged.created_at, saved.created_at);
}

#[test]
fn test_update_missing_record_is_not_found() {
    let (service, _file) = test_service();
    let result = service.update_passport("owner-1", &PassportUpdate::default());
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[test]
fn test_validation_failure_aborts_save() {
    let (service, _file) = test_service();
    let mut passport = sample_passport("owner-1");
    passport.expiry_date = "2019-01-01".to_string();

    let result = service.save_passport(passport);
    assert!(matches!(result, Err(Error::Validation(_))));

    service.refresh_cache("owner-1");
    assert!(service.get_passport("owner-1").unwrap().is_none());
}

#[test]
fn test_migration_imports_and_normalizes_legacy_passport() {
    let (service, _file) = test_service();
    // pre-multi-user payload: generic key, no owner id, no gender
    service
        .legacy_store()
        .set_item(
            "@passport",
            r#"{"passportNumber":"E12345678","fullName":"ZHANG, WEI","nationality":"CHN"}"#,
        )
        .unwrap();

    let report = service.initialize("owner-1");
    assert!(!report.already_migrated);
    assert_eq!(report.outcome, MigrationOutcome::Complete);
    assert_eq!(report.passport, KindOutcome::Migrated);
    assert_eq!(report.personal_info, KindOutcome::NoData);

    let passport = service.get_passport("owner-1").unwrap().unwrap();
    assert_eq!(passport.owner_id, "owner-1");
    assert_eq!(passport.passport_number, "E12345678");
    assert_eq!(passport.gender, entry_core::Gender::Undefined);
    assert!(!passport.id.is_empty());
}

#[test]
fn test_migration_is_idempotent_and_skips_legacy_store() {
    let (service, _file) = test_service();
    service
        .legacy_store()
        .set_item("@passport", r#"{"passportNumber":"E1","fullName":"A"}"#)
        .unwrap();

    let first = service.migrate_from_legacy_store("owner-1");
    assert!(!first.already_migrated);
    let reads_after_first = service.legacy_store().reads();
    assert!(reads_after_first > 0);

    let second = service.migrate_from_legacy_store("owner-1");
    assert!(second.already_migrated);
    assert_eq!(
        service.legacy_store().reads(),
        reads_after_first,
        "second run must not touch the legacy store"
    );
}

#[test]
fn test_fresh_owner_initialize_writes_marker() {
    let (service, _file) = test_service();

    let report = service.initialize("owner-1");
    assert!(!report.already_migrated);
    assert_eq!(report.outcome, MigrationOutcome::Complete);
    assert_eq!(report.passport, KindOutcome::NoData);

    let bundle = service.get_all_user_data("owner-1", true).unwrap();
    assert!(bundle.is_empty());

    // marker written: the second initialize attempts nothing
    let again = service.initialize("owner-1");
    assert!(again.already_migrated);
}

#[test]
fn test_marker_written_even_when_legacy_data_is_malformed() {
    let (service, _file) = test_service();
    // unparseable payload: probing skips it and nothing migrates, but
    // the marker is still written so the attempt never repeats
    service
        .legacy_store()
        .set_item("@passport", "{not json at all")
        .unwrap();

    let report = service.migrate_from_legacy_store("owner-1");
    assert_eq!(report.outcome, MigrationOutcome::Complete);
    assert_eq!(report.passport, KindOutcome::NoData);

    let again = service.migrate_from_legacy_store("owner-1");
    assert!(again.already_migrated, "marker must exist after the attempt");
}

#[test]
fn test_get_all_user_data_batch_populates_cache() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    service
        .save_personal_info(sample_personal_info("owner-1"))
        .unwrap();
    service.clear_cache();

    let bundle = service.get_all_user_data("owner-1", true).unwrap();
    assert!(bundle.passport.is_some());
    assert!(bundle.personal_info.is_some());
    assert!(bundle.funding_proof.is_none());
    assert_eq!(bundle.owner_id, "owner-1");
    assert!(!bundle.loaded_at.is_empty());

    // all three entries are warm now, including the absent one
    let hits_before = service.get_cache_stats().hits;
    service.get_passport("owner-1").unwrap();
    service.get_personal_info("owner-1").unwrap();
    service.get_funding_proof("owner-1").unwrap();
    assert_eq!(service.get_cache_stats().hits, hits_before + 3);
}

#[test]
fn test_get_all_user_data_fallback_uses_cached_reads() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    service.clear_cache();

    let bundle = service.get_all_user_data("owner-1", false).unwrap();
    assert!(bundle.passport.is_some());
    assert_eq!(service.get_cache_stats().misses, 3);
}

#[test]
fn test_save_all_user_data_creates_subset() {
    let (service, _file) = test_service();
    let input = UserDataInput {
        passport: Some(sample_passport("")),
        funding_proof: Some(sample_funding_proof("")),
        ..UserDataInput::default()
    };

    let bundle = service.save_all_user_data(input, "owner-1").unwrap();
    assert_eq!(bundle.passport.as_ref().unwrap().owner_id, "owner-1");
    assert!(bundle.personal_info.is_none());

    assert!(service.has_user_data("owner-1").unwrap());
    assert!(service.get_funding_proof("owner-1").unwrap().is_some());
}

#[test]
fn test_batch_update_applies_all_kinds_atomically() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    service
        .save_personal_info(sample_personal_info("owner-1"))
        .unwrap();

    let updates = UserDataUpdate {
        passport: Some(PassportUpdate {
            full_name: Some("LI, NA".to_string()),
            ..PassportUpdate::default()
        }),
        personal_info: Some(PersonalInfoUpdate {
            occupation: Some("Engineer".to_string()),
            ..PersonalInfoUpdate::default()
        }),
        ..UserDataUpdate::default()
    };
    let bundle = service.batch_update("owner-1", &updates).unwrap();

    assert_eq!(bundle.passport.unwrap().full_name, "LI, NA");
    assert_eq!(bundle.personal_info.unwrap().occupation, "Engineer");
}

#[test]
fn test_batch_update_validation_failure_changes_nothing() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    service
        .save_personal_info(sample_personal_info("owner-1"))
        .unwrap();

    let updates = UserDataUpdate {
        passport: Some(PassportUpdate {
            full_name: Some("A".to_string()),
            ..PassportUpdate::default()
        }),
        personal_info: Some(PersonalInfoUpdate {
            email: Some("not-an-email".to_string()),
            ..PersonalInfoUpdate::default()
        }),
        ..UserDataUpdate::default()
    };
    let result = service.batch_update("owner-1", &updates);
    assert!(matches!(result, Err(Error::Validation(_))));

    // neither record changed in storage
    service.refresh_cache("owner-1");
    let passport = service.get_passport("owner-1").unwrap().unwrap();
    assert_eq!(passport.full_name, "ZHANG, WEI");
    let info = service.get_personal_info("owner-1").unwrap().unwrap();
    assert_eq!(info.email, "wei@example.com");

    // and the unchanged data still validates clean
    let report = service.validate_data_consistency("owner-1").unwrap();
    assert!(report.is_consistent);
}

#[test]
fn test_batch_update_abort_leaves_cache_intact() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();

    // warm cache, then abort a batch against a kind that has no record
    service.get_passport("owner-1").unwrap();
    let updates = UserDataUpdate {
        personal_info: Some(PersonalInfoUpdate {
            email: Some("y@z.com".to_string()),
            ..PersonalInfoUpdate::default()
        }),
        ..UserDataUpdate::default()
    };
    assert!(service.batch_update("owner-1", &updates).is_err());

    // cached passport still serves warm, unchanged
    let hits_before = service.get_cache_stats().hits;
    let passport = service.get_passport("owner-1").unwrap().unwrap();
    assert_eq!(passport.full_name, "ZHANG, WEI");
    assert_eq!(service.get_cache_stats().hits, hits_before + 1);
}

#[test]
fn test_consistency_reports_owner_and_warning_checks() {
    let (service, _file) = test_service();
    service.save_passport(sample_passport("owner-1")).unwrap();
    let mut info = sample_personal_info("owner-1");
    info.country_of_residence = "THA".to_string();
    service.save_personal_info(info).unwrap();

    let report = service.validate_data_consistency("owner-1").unwrap();
    assert!(report.is_consistent, "warnings must not break consistency");
    assert!(report.cross_field.valid);
    assert_eq!(report.cross_field.warnings.len(), 1);
    assert!(report.passport.unwrap().valid);
}

#[test]
fn test_conflict_detection_and_engine_wins_resolution() {
    let (service, _file) = test_service();
    // engine holds the new value; the legacy store still has the old one
    let mut info = sample_personal_info("owner-1");
    info.email = "new@x.com".to_string();
    service.save_personal_info(info).unwrap();
    service
        .legacy_store()
        .set_item("@personal_info", r#"{"email":"old@x.com"}"#)
        .unwrap();

    let conflicts = service.detect_data_conflicts("owner-1").unwrap();
    assert!(conflicts.has_conflicts);
    let email_conflict = conflicts
        .personal_info
        .iter()
        .find(|c| c.field == "email")
        .unwrap();
    assert_eq!(email_conflict.engine_value.as_deref(), Some("new@x.com"));
    assert_eq!(email_conflict.legacy_value.as_deref(), Some("old@x.com"));

    let resolution = service.resolve_data_conflicts("owner-1").unwrap();
    assert!(resolution.had_conflicts);
    assert!(resolution.cache_refreshed);

    let info = service.get_personal_info("owner-1").unwrap().unwrap();
    assert_eq!(info.email, "new@x.com", "engine value must win");
}

#[test]
fn test_save_get_round_trip_preserves_fields() {
    let (service, _file) = test_service();
    let saved = service.save_passport(sample_passport("owner-1")).unwrap();

    service.refresh_cache("owner-1");
    let loaded = service.get_passport("owner-1").unwrap().unwrap();
    assert_eq!(loaded, saved);
}

#[test]
fn test_delete_all_user_data() {
    let (service, _file) = test_service();
    service.initialize("owner-1");
    service.save_passport(sample_passport("owner-1")).unwrap();
    service
        .save_funding_proof(sample_funding_proof("owner-1"))
        .unwrap();

    service.delete_all_user_data("owner-1").unwrap();

    assert!(!service.has_user_data("owner-1").unwrap());
    let bundle = service.get_all_user_data("owner-1", true).unwrap();
    assert!(bundle.is_empty());
    // the marker survives, so legacy data cannot come back on its own
    assert!(service.initialize("owner-1").already_migrated);
}

#[test]
fn test_cache_stats_reset() {
    let (service, _file) = test_service();
    service.get_passport("owner-1").unwrap();
    assert_eq!(service.get_cache_stats().total_requests, 1);

    service.reset_cache_stats();
    let stats = service.get_cache_stats();
    assert_eq!(stats.total_requests, 0);
    assert_eq!(stats.invalidations, 0);
}
