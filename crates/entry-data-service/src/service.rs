//! Unified data service
//!
//! Single façade the screens talk to: cached reads, validated writes,
//! batched atomic loads and updates, one-time legacy migration, and the
//! consistency/conflict diagnostics. Owns the record cache; talks to
//! persistence only through the [`StorageEngine`] and [`LegacyStore`]
//! traits.

use crate::cache::{CacheStats, RecordCache};
use crate::{consistency, migration};
use entry_core::models::{generate_record_id, now_rfc3339};
use entry_core::{
    ConflictReport, ConsistencyReport, Error, FundingProof, FundingProofUpdate, KindOutcome,
    LegacyStore, MigrationOutcome, MigrationReport, Passport, PassportUpdate, PersonalInfo,
    PersonalInfoUpdate, Record, RecordCheck, RecordKind, RecordSnapshot, ResolutionReport, Result,
    StorageEngine, UserDataBundle, UserDataInput, UserDataUpdate, MIGRATION_SOURCE,
};
use std::time::{Duration, Instant};

/// Unified data service over a storage engine and a legacy store
pub struct DataService<S: StorageEngine, L: LegacyStore> {
    engine: S,
    legacy: L,
    cache: RecordCache,
}

impl<S: StorageEngine, L: LegacyStore> DataService<S, L> {
    /// Create with the default cache TTL
    pub fn new(engine: S, legacy: L) -> Self {
        Self {
            engine,
            legacy,
            cache: RecordCache::new(),
        }
    }

    /// Create with an explicit cache TTL
    pub fn with_cache_ttl(engine: S, legacy: L, ttl: Duration) -> Self {
        Self {
            engine,
            legacy,
            cache: RecordCache::with_ttl(ttl),
        }
    }

    /// The storage engine this service persists through
    pub fn storage_engine(&self) -> &S {
        &self.engine
    }

    /// The legacy store this service migrates from
    pub fn legacy_store(&self) -> &L {
        &self.legacy
    }

    // ---- initialization & migration ----

    /// Idempotent startup hook, safe to call on every screen mount.
    /// Runs legacy migration when it has not been attempted yet. Never
    /// fails: whatever goes wrong is captured in the returned report so
    /// the app keeps working with the data that survived.
    pub fn initialize(&self, owner_id: &str) -> MigrationReport {
        match self.engine.needs_migration(owner_id) {
            Ok(true) => self.migrate_from_legacy_store(owner_id),
            Ok(false) => MigrationReport::already_migrated(owner_id),
            Err(e) => {
                tracing::warn!(owner = owner_id, "migration status check failed: {}", e);
                let message = format!("migration status check failed: {}", e);
                MigrationReport {
                    owner_id: owner_id.to_string(),
                    already_migrated: false,
                    outcome: MigrationOutcome::Failed {
                        errors: vec![message.clone()],
                    },
                    passport: KindOutcome::NoData,
                    personal_info: KindOutcome::NoData,
                    funding_proof: KindOutcome::NoData,
                    errors: vec![message],
                }
            }
        }
    }

    /// Import the owner's legacy key-value data into the storage engine.
    ///
    /// A failed kind never stops the others, and the migration marker is
    /// written once all kinds have been attempted, even on total failure,
    /// so permanently malformed legacy data cannot cause a retry storm.
    /// Re-running for a migrated owner returns immediately without
    /// touching the legacy store.
    pub fn migrate_from_legacy_store(&self, owner_id: &str) -> MigrationReport {
        match self.engine.get_migration_status(owner_id) {
            Ok(Some(marker)) => {
                tracing::debug!(
                    owner = owner_id,
                    migrated_at = %marker.migrated_at,
                    "migration already complete"
                );
                return MigrationReport::already_migrated(owner_id);
            }
            Ok(None) => {}
            Err(e) => {
                // Proceed as if unmigrated: saves are upserts, so a
                // duplicate run cannot corrupt data.
                tracing::warn!(owner = owner_id, "migration marker read failed: {}", e);
            }
        }

        let mut errors = Vec::new();
        let mut outcomes = Vec::with_capacity(RecordKind::all().len());
        for &kind in RecordKind::all() {
            let outcome = match migration::migrate_kind(&self.engine, &self.legacy, kind, owner_id)
            {
                Ok(true) => KindOutcome::Migrated,
                Ok(false) => KindOutcome::NoData,
                Err(e) => {
                    tracing::warn!(
                        kind = kind.as_str(),
                        owner = owner_id,
                        "legacy migration failed: {}",
                        e
                    );
                    errors.push(format!("{}: {}", kind, e));
                    KindOutcome::Failed
                }
            };
            outcomes.push(outcome);
        }

        if let Err(e) = self.engine.mark_migration_complete(owner_id, MIGRATION_SOURCE) {
            tracing::warn!(owner = owner_id, "failed to write migration marker: {}", e);
            errors.push(format!("marker: {}", e));
        }

        let report = MigrationReport {
            owner_id: owner_id.to_string(),
            already_migrated: false,
            outcome: migration::classify(&outcomes, &errors),
            passport: outcomes[0],
            personal_info: outcomes[1],
            funding_proof: outcomes[2],
            errors,
        };
        tracing::info!(owner = owner_id, outcome = ?report.outcome, "legacy migration finished");
        report
    }

    // ---- cached reads ----

    fn read_through(&self, kind: RecordKind, owner_id: &str) -> Result<Option<Record>> {
        if let Some(cached) = self.cache.lookup(kind, owner_id) {
            return Ok(cached);
        }
        let loaded = self.engine.get_record(kind, owner_id)?;
        self.cache.store(kind, owner_id, loaded.clone());
        Ok(loaded)
    }

    /// The owner's passport, `None` when absent
    pub fn get_passport(&self, owner_id: &str) -> Result<Option<Passport>> {
        Ok(self
            .read_through(RecordKind::Passport, owner_id)?
            .and_then(Record::into_passport))
    }

    /// The owner's personal info, `None` when absent
    pub fn get_personal_info(&self, owner_id: &str) -> Result<Option<PersonalInfo>> {
        Ok(self
            .read_through(RecordKind::PersonalInfo, owner_id)?
            .and_then(Record::into_personal_info))
    }

    /// The owner's funding proof, `None` when absent
    pub fn get_funding_proof(&self, owner_id: &str) -> Result<Option<FundingProof>> {
        Ok(self
            .read_through(RecordKind::FundingProof, owner_id)?
            .and_then(Record::into_funding_proof))
    }

    // ---- writes ----

    fn prepare_identity(id: &mut String, created_at: &mut String, updated_at: &mut String) {
        if id.trim().is_empty() {
            *id = generate_record_id();
        }
        let now = now_rfc3339();
        if created_at.trim().is_empty() {
            *created_at = now.clone();
        }
        *updated_at = now;
    }

    fn persist(&self, record: Record) -> Result<Record> {
        self.engine.save_record(&record)?;
        self.cache
            .invalidate_and_store(record.kind(), record.owner_id(), Some(record.clone()));
        Ok(record)
    }

    /// Validate and persist a passport. The cache entry is invalidated
    /// and repopulated with the written value, so the next read is a
    /// warm hit on the new data.
    pub fn save_passport(&self, mut passport: Passport) -> Result<Passport> {
        require_owner(&passport.owner_id)?;
        Self::prepare_identity(
            &mut passport.id,
            &mut passport.created_at,
            &mut passport.updated_at,
        );
        passport.validate()?;
        self.persist(Record::Passport(passport.clone()))?;
        Ok(passport)
    }

    /// Validate and persist personal info; see [`DataService::save_passport`]
    pub fn save_personal_info(&self, mut info: PersonalInfo) -> Result<PersonalInfo> {
        require_owner(&info.owner_id)?;
        Self::prepare_identity(&mut info.id, &mut info.created_at, &mut info.updated_at);
        info.validate()?;
        self.persist(Record::PersonalInfo(info.clone()))?;
        Ok(info)
    }

    /// Validate and persist a funding proof; see [`DataService::save_passport`]
    pub fn save_funding_proof(&self, mut proof: FundingProof) -> Result<FundingProof> {
        require_owner(&proof.owner_id)?;
        Self::prepare_identity(&mut proof.id, &mut proof.created_at, &mut proof.updated_at);
        proof.validate()?;
        self.persist(Record::FundingProof(proof.clone()))?;
        Ok(proof)
    }

    /// Partially update the owner's passport. Provided fields overwrite
    /// stored ones; id and creation timestamp never change.
    pub fn update_passport(&self, owner_id: &str, updates: &PassportUpdate) -> Result<Passport> {
        let mut passport = self
            .get_passport(owner_id)?
            .ok_or_else(|| Error::NotFound(format!("passport for owner {}", owner_id)))?;
        updates.apply_to(&mut passport);
        passport.touch();
        passport.validate()?;
        self.persist(Record::Passport(passport.clone()))?;
        Ok(passport)
    }

    /// Merge a partial update into the owner's personal info. Blank
    /// incoming fields never clobber existing values, so screens can
    /// submit only the fields they own.
    pub fn update_personal_info(
        &self,
        owner_id: &str,
        updates: &PersonalInfoUpdate,
    ) -> Result<PersonalInfo> {
        let mut info = self
            .get_personal_info(owner_id)?
            .ok_or_else(|| Error::NotFound(format!("personal info for owner {}", owner_id)))?;
        updates.merge_into(&mut info);
        info.touch();
        info.validate()?;
        self.persist(Record::PersonalInfo(info.clone()))?;
        Ok(info)
    }

    /// Partially update the owner's funding proof
    pub fn update_funding_proof(
        &self,
        owner_id: &str,
        updates: &FundingProofUpdate,
    ) -> Result<FundingProof> {
        let mut proof = self
            .get_funding_proof(owner_id)?
            .ok_or_else(|| Error::NotFound(format!("funding proof for owner {}", owner_id)))?;
        updates.apply_to(&mut proof);
        proof.touch();
        proof.validate()?;
        self.persist(Record::FundingProof(proof.clone()))?;
        Ok(proof)
    }

    // ---- batched operations ----

    fn bundle(
        owner_id: &str,
        snapshot: RecordSnapshot,
        started: Instant,
    ) -> UserDataBundle {
        UserDataBundle {
            owner_id: owner_id.to_string(),
            passport: snapshot.passport,
            personal_info: snapshot.personal_info,
            funding_proof: snapshot.funding_proof,
            loaded_at: now_rfc3339(),
            load_duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    fn populate_all(&self, owner_id: &str, snapshot: &RecordSnapshot) {
        for &kind in RecordKind::all() {
            self.cache.store(kind, owner_id, snapshot.get(kind));
        }
    }

    /// Load all three records in one pass.
    ///
    /// With `use_batch_load` the engine fetches all rows in a single
    /// read transaction, giving a consistent snapshot, and every cache
    /// entry is populated from it. Without it, three independent cached
    /// reads run instead.
    pub fn get_all_user_data(&self, owner_id: &str, use_batch_load: bool) -> Result<UserDataBundle> {
        let started = Instant::now();
        let snapshot = if use_batch_load {
            let snapshot = self.engine.batch_load(owner_id, RecordKind::all())?;
            self.populate_all(owner_id, &snapshot);
            snapshot
        } else {
            RecordSnapshot {
                passport: self.get_passport(owner_id)?,
                personal_info: self.get_personal_info(owner_id)?,
                funding_proof: self.get_funding_proof(owner_id)?,
            }
        };
        Ok(Self::bundle(owner_id, snapshot, started))
    }

    /// All-or-nothing creation of the provided subset of records
    pub fn save_all_user_data(
        &self,
        mut user_data: UserDataInput,
        owner_id: &str,
    ) -> Result<UserDataBundle> {
        let started = Instant::now();
        let mut to_save = Vec::new();

        if let Some(passport) = user_data.passport.as_mut() {
            passport.owner_id = owner_id.to_string();
            Self::prepare_identity(
                &mut passport.id,
                &mut passport.created_at,
                &mut passport.updated_at,
            );
            passport.validate()?;
            to_save.push(Record::Passport(passport.clone()));
        }
        if let Some(info) = user_data.personal_info.as_mut() {
            info.owner_id = owner_id.to_string();
            Self::prepare_identity(&mut info.id, &mut info.created_at, &mut info.updated_at);
            info.validate()?;
            to_save.push(Record::PersonalInfo(info.clone()));
        }
        if let Some(proof) = user_data.funding_proof.as_mut() {
            proof.owner_id = owner_id.to_string();
            Self::prepare_identity(&mut proof.id, &mut proof.created_at, &mut proof.updated_at);
            proof.validate()?;
            to_save.push(Record::FundingProof(proof.clone()));
        }

        if !to_save.is_empty() {
            self.engine.batch_save(&to_save)?;
            for record in &to_save {
                self.cache
                    .invalidate_and_store(record.kind(), owner_id, Some(record.clone()));
            }
        }

        let snapshot = RecordSnapshot {
            passport: user_data.passport,
            personal_info: user_data.personal_info,
            funding_proof: user_data.funding_proof,
        };
        Ok(Self::bundle(owner_id, snapshot, started))
    }

    /// Atomic partial update across any subset of the three kinds.
    ///
    /// Current state is loaded in one batch read, updates are merged and
    /// validated per kind, and everything is written in one transaction:
    /// a validation or storage failure for any kind leaves storage and
    /// cache exactly as they were.
    pub fn batch_update(&self, owner_id: &str, updates: &UserDataUpdate) -> Result<UserDataBundle> {
        let started = Instant::now();
        let mut snapshot = self.engine.batch_load(owner_id, RecordKind::all())?;
        let mut to_save = Vec::new();

        if let Some(update) = &updates.passport {
            let mut passport = snapshot
                .passport
                .take()
                .ok_or_else(|| Error::NotFound(format!("passport for owner {}", owner_id)))?;
            update.apply_to(&mut passport);
            passport.touch();
            passport.validate()?;
            to_save.push(Record::Passport(passport.clone()));
            snapshot.passport = Some(passport);
        }
        if let Some(update) = &updates.personal_info {
            let mut info = snapshot
                .personal_info
                .take()
                .ok_or_else(|| Error::NotFound(format!("personal info for owner {}", owner_id)))?;
            update.merge_into(&mut info);
            info.touch();
            info.validate()?;
            to_save.push(Record::PersonalInfo(info.clone()));
            snapshot.personal_info = Some(info);
        }
        if let Some(update) = &updates.funding_proof {
            let mut proof = snapshot
                .funding_proof
                .take()
                .ok_or_else(|| Error::NotFound(format!("funding proof for owner {}", owner_id)))?;
            update.apply_to(&mut proof);
            proof.touch();
            proof.validate()?;
            to_save.push(Record::FundingProof(proof.clone()));
            snapshot.funding_proof = Some(proof);
        }

        if !to_save.is_empty() {
            self.engine.batch_save(&to_save)?;
            // refresh all three entries so reads agree with the snapshot
            for &kind in RecordKind::all() {
                self.cache
                    .invalidate_and_store(kind, owner_id, snapshot.get(kind));
            }
        }

        Ok(Self::bundle(owner_id, snapshot, started))
    }

    /// Whether any record of any kind exists for the owner
    pub fn has_user_data(&self, owner_id: &str) -> Result<bool> {
        self.engine.has_any(owner_id)
    }

    /// Compliance delete: removes every record for the owner and drops
    /// the owner's cache entries. The migration marker stays, so deleted
    /// legacy data is not resurrected by a re-run.
    pub fn delete_all_user_data(&self, owner_id: &str) -> Result<()> {
        self.engine.delete_all(owner_id)?;
        self.cache.remove_owner(owner_id);
        tracing::info!(owner = owner_id, "user data deleted");
        Ok(())
    }

    // ---- consistency & conflicts ----

    /// Read-only diagnostic: per-record validation plus cross-record
    /// checks. Safe to call at any time.
    pub fn validate_data_consistency(&self, owner_id: &str) -> Result<ConsistencyReport> {
        let snapshot = self.engine.batch_load(owner_id, RecordKind::all())?;

        let passport = snapshot.passport.as_ref().map(|p| check(p.validation_errors()));
        let personal_info = snapshot
            .personal_info
            .as_ref()
            .map(|p| check(p.validation_errors()));
        let funding_proof = snapshot
            .funding_proof
            .as_ref()
            .map(|p| check(p.validation_errors()));
        let cross_field = consistency::cross_field_check(&snapshot, owner_id);

        let records_valid = [&passport, &personal_info, &funding_proof]
            .into_iter()
            .flatten()
            .all(|c| c.valid);

        Ok(ConsistencyReport {
            owner_id: owner_id.to_string(),
            is_consistent: records_valid && cross_field.valid,
            passport,
            personal_info,
            funding_proof,
            cross_field,
        })
    }

    /// Diff the legacy store against the storage engine, field by field.
    /// Unreadable legacy values are logged and treated as absent rather
    /// than failing the whole diagnostic.
    pub fn detect_data_conflicts(&self, owner_id: &str) -> Result<ConflictReport> {
        let snapshot = self.engine.batch_load(owner_id, RecordKind::all())?;

        let mut per_kind = Vec::with_capacity(RecordKind::all().len());
        for &kind in RecordKind::all() {
            let legacy = match migration::probe_legacy(&self.legacy, kind, owner_id) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        kind = kind.as_str(),
                        owner = owner_id,
                        "legacy probe failed during conflict detection: {}",
                        e
                    );
                    None
                }
            };
            per_kind.push(consistency::diff_records(
                snapshot.get(kind).as_ref(),
                legacy.as_ref(),
            ));
        }

        let mut kinds = per_kind.into_iter();
        let passport = kinds.next().unwrap_or_default();
        let personal_info = kinds.next().unwrap_or_default();
        let funding_proof = kinds.next().unwrap_or_default();

        Ok(ConflictReport {
            owner_id: owner_id.to_string(),
            has_conflicts: !passport.is_empty()
                || !personal_info.is_empty()
                || !funding_proof.is_empty(),
            passport,
            personal_info,
            funding_proof,
            checked_at: now_rfc3339(),
        })
    }

    /// Resolve conflicts with a fixed policy: the storage engine wins.
    /// Legacy values are logged for audit and discarded (the engine is
    /// already authoritative, so no write-back happens); the owner's
    /// cache is refreshed so subsequent reads reflect engine state.
    pub fn resolve_data_conflicts(&self, owner_id: &str) -> Result<ResolutionReport> {
        let report = self.detect_data_conflicts(owner_id)?;

        if report.has_conflicts {
            for (kind, conflicts) in [
                (RecordKind::Passport, &report.passport),
                (RecordKind::PersonalInfo, &report.personal_info),
                (RecordKind::FundingProof, &report.funding_proof),
            ] {
                for conflict in conflicts {
                    tracing::warn!(
                        kind = kind.as_str(),
                        owner = owner_id,
                        field = %conflict.field,
                        engine = ?conflict.engine_value,
                        legacy = ?conflict.legacy_value,
                        "discarding legacy value in favor of storage engine"
                    );
                }
            }
        }

        // Drop and rewarm the owner's entries so the next reads serve
        // the now-undisputed engine state.
        self.cache.remove_owner(owner_id);
        let snapshot = self.engine.batch_load(owner_id, RecordKind::all())?;
        self.populate_all(owner_id, &snapshot);

        Ok(ResolutionReport {
            owner_id: owner_id.to_string(),
            had_conflicts: report.has_conflicts,
            discarded: report.conflict_count(),
            cache_refreshed: true,
        })
    }

    // ---- cache management ----

    /// Drop all cache entries for all owners (logout path)
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drop one owner's cache entries, forcing the next reads to load
    pub fn refresh_cache(&self, owner_id: &str) {
        self.cache.remove_owner(owner_id);
    }

    /// Cache statistics snapshot
    pub fn get_cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Zero cache counters without touching cached data
    pub fn reset_cache_stats(&self) {
        self.cache.reset_stats();
    }
}

fn require_owner(owner_id: &str) -> Result<()> {
    if owner_id.trim().is_empty() {
        Err(Error::Validation("owner id is required".to_string()))
    } else {
        Ok(())
    }
}

fn check(errors: Vec<String>) -> RecordCheck {
    if errors.is_empty() {
        RecordCheck::passed()
    } else {
        RecordCheck::failed(errors)
    }
}
