//! Entry Assistant domain core
//!
//! This crate defines the traveler record models (passport, personal info,
//! funding proof), their validation and merge rules, the error taxonomy
//! shared across the data layer, and the trait contracts for the storage
//! engine and the legacy key-value store.
//!
//! Persistence and caching live in `entry-storage-sqlite` and
//! `entry-data-service`; this crate stays free of database dependencies.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod kind;
pub mod models;
pub mod reports;
pub mod store;

pub use error::{Error, Result};
pub use kind::RecordKind;
pub use models::{
    FundingProof, FundingProofUpdate, Gender, Passport, PassportUpdate, PersonalInfo,
    PersonalInfoUpdate, Record, UserDataInput, UserDataUpdate,
};
pub use reports::{
    ConflictReport, ConsistencyReport, CrossFieldCheck, FieldConflict, KindOutcome,
    MigrationMarker, MigrationOutcome, MigrationReport, RecordCheck, ResolutionReport,
    UserDataBundle, MIGRATION_SOURCE,
};
pub use store::{LegacyStore, RecordSnapshot, StorageEngine};
