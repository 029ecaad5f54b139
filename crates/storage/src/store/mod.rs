#![forbid(unsafe_code)]

mod aliases;
mod devices;
mod devices_sql;
mod error;
mod evidence;
mod lots;
mod requests;

pub use error::StoreError;
pub use requests::*;

use dh_core::ids::{EvidenceUuid, IdentityValue, OwnerId};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, params};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SCHEMA_VERSION: i64 = 1;

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join("devicehub.db");
        let conn = Connection::open(db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        preflight_gate(&conn)?;
        install_schema(&conn)?;

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

/// Refuse to run against a database that was not created by this store or
/// that carries a different schema generation.
fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    let required: BTreeSet<&str> = [
        "store_state",
        "owners",
        "evidence",
        "identity_records",
        "alias_edges",
        "lot_members",
    ]
    .into_iter()
    .collect();

    if tables
        .iter()
        .any(|table| !required.contains(table.as_str()))
    {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    for table in required {
        if !tables.contains(table) {
            return Err(StoreError::InvalidInput(
                "RESET_REQUIRED: required table is missing",
            ));
        }
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        )),
        None => Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema state row is missing",
        )),
    }
}

fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    let now_ms = now_ms();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS owners (
          owner TEXT PRIMARY KEY,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS evidence (
          uuid TEXT PRIMARY KEY,
          owner TEXT NOT NULL,
          submitted_by TEXT,
          payload_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(owner) REFERENCES owners(owner) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS identity_records (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          owner TEXT NOT NULL,
          algorithm TEXT NOT NULL,
          value TEXT NOT NULL,
          uuid TEXT NOT NULL,
          submitted_by TEXT,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(algorithm, uuid),
          FOREIGN KEY(owner) REFERENCES owners(owner) ON DELETE CASCADE,
          FOREIGN KEY(uuid) REFERENCES evidence(uuid) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_identity_owner_created
          ON identity_records(owner, created_at_ms, value);
        CREATE INDEX IF NOT EXISTS idx_identity_owner_value
          ON identity_records(owner, value);

        CREATE TABLE IF NOT EXISTS alias_edges (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          owner TEXT NOT NULL,
          alias TEXT NOT NULL,
          root TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          FOREIGN KEY(owner) REFERENCES owners(owner) ON DELETE CASCADE,
          CHECK(alias <> root)
        );

        CREATE INDEX IF NOT EXISTS idx_alias_owner_seq
          ON alias_edges(owner, id);

        CREATE TABLE IF NOT EXISTS lot_members (
          owner TEXT NOT NULL,
          lot TEXT NOT NULL,
          value TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(owner, lot, value),
          FOREIGN KEY(owner) REFERENCES owners(owner) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_lot_members_owner_value
          ON lot_members(owner, value);
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms],
    )?;

    Ok(())
}

fn ensure_owner_tx(tx: &Transaction<'_>, owner: &str, now_ms: i64) -> Result<(), StoreError> {
    tx.execute(
        "INSERT OR IGNORE INTO owners(owner, created_at_ms) VALUES (?1, ?2)",
        params![owner, now_ms],
    )?;
    Ok(())
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn canonicalize_owner(value: &str) -> Result<String, StoreError> {
    OwnerId::try_new(value)
        .map(OwnerId::into_string)
        .map_err(|err| StoreError::InvalidInput(err.message()))
}

fn canonicalize_uuid(value: &str) -> Result<String, StoreError> {
    EvidenceUuid::try_new(value)
        .map(EvidenceUuid::into_string)
        .map_err(|err| StoreError::InvalidInput(err.message()))
}

fn canonicalize_value(value: &str) -> Result<String, StoreError> {
    IdentityValue::try_new(value)
        .map(IdentityValue::into_string)
        .map_err(|err| StoreError::InvalidInput(err.message()))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
