//! Database schema migrations

use crate::database::storage_err;
use entry_core::Result;
use rusqlite::Connection;

const SCHEMA_VERSION: i32 = 3;

/// Run all migrations
pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;

    tracing::debug!(
        "Running migrations: current_version={}, target_version={}",
        current_version,
        SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < 2 {
        migrate_v2(conn)?;
    }

    if current_version < 3 {
        migrate_v3(conn)?;
    }

    let final_version = get_schema_version(conn)?;
    if final_version != SCHEMA_VERSION {
        set_schema_version(conn, SCHEMA_VERSION)?;
    }

    Ok(())
}

fn get_schema_version(conn: &Connection) -> Result<i32> {
    let result = conn.query_row(
        "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
        [],
        |row| row.get(0),
    );

    match result {
        Ok(v) => Ok(v),
        Err(_) => Ok(0),
    }
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER PRIMARY KEY)",
        [],
    )
    .map_err(storage_err)?;

    // INSERT OR IGNORE keeps re-runs idempotent
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [version],
    )
    .map_err(storage_err)?;
    Ok(())
}

/// Base schema: one row per record kind per owner, payload encrypted
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE passports (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL UNIQUE,
            payload BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE personal_info (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL UNIQUE,
            payload BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE funding_proofs (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL UNIQUE,
            payload BLOB NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        "#,
    )
    .map_err(storage_err)?;
    set_schema_version(conn, 1)
}

/// Migration markers for the legacy key-value store import
fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE migration_markers (
            owner_id TEXT PRIMARY KEY,
            migrated_at TEXT NOT NULL,
            source TEXT NOT NULL
        );
        "#,
    )
    .map_err(storage_err)?;
    set_schema_version(conn, 2)
}

/// Owner lookup indexes
fn migrate_v3(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_passports_owner ON passports(owner_id);
        CREATE INDEX IF NOT EXISTS idx_personal_info_owner ON personal_info(owner_id);
        CREATE INDEX IF NOT EXISTS idx_funding_proofs_owner ON funding_proofs(owner_id);
        "#,
    )
    .map_err(storage_err)?;
    set_schema_version(conn, 3)
}
