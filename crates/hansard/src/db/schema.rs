use std::path::Path;

use rusqlite::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Unsupported schema: expected version {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Current schema version. Increment when the table layout changes.
pub const CURRENT_VERSION: i32 = 1;

/// Create all tables and indexes if they don't exist.
pub fn create_schema(conn: &Connection) -> Result<(), SchemaError> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [CURRENT_VERSION],
    )?;
    Ok(())
}

/// Open or create a Hansard database at the given path.
pub fn open_database(path: &Path) -> Result<Connection, SchemaError> {
    let conn = Connection::open(path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    match get_schema_version(&conn)? {
        0 => {
            log::info!("Creating Hansard database at {}", path.display());
            create_schema(&conn)?;
        }
        CURRENT_VERSION => {}
        found => {
            return Err(SchemaError::VersionMismatch {
                expected: CURRENT_VERSION,
                found,
            });
        }
    }

    Ok(conn)
}

/// Open an in-memory database with the full schema. Useful for testing.
pub fn open_memory() -> Result<Connection, SchemaError> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Get the current schema version, or 0 if no schema exists.
pub fn get_schema_version(conn: &Connection) -> Result<i32, SchemaError> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;
    Ok(version)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Parliamentary sessions, e.g. 39-1
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    parliament INTEGER NOT NULL,
    number INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT
);

-- One row per sitting transcript
CREATE TABLE IF NOT EXISTS hansards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL REFERENCES sessions(id),
    number TEXT NOT NULL,
    url TEXT UNIQUE,
    date TEXT,
    UNIQUE (session_id, number)
);

-- Raw downloaded pages
CREATE TABLE IF NOT EXISTS hansard_cache (
    hansard_id INTEGER PRIMARY KEY REFERENCES hansards(id) ON DELETE CASCADE,
    html TEXT NOT NULL,
    fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS statements (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    hansard_id INTEGER NOT NULL REFERENCES hansards(id) ON DELETE CASCADE,
    sequence INTEGER NOT NULL,
    time TEXT,
    who TEXT NOT NULL,
    speaker_name TEXT,
    speaker_details TEXT,
    party TEXT,
    h1 TEXT,
    h2 TEXT,
    text TEXT NOT NULL,
    wordcount INTEGER NOT NULL,
    procedural BOOLEAN NOT NULL DEFAULT 0,
    UNIQUE (hansard_id, sequence)
);

CREATE TABLE IF NOT EXISTS statement_bills (
    statement_id INTEGER NOT NULL REFERENCES statements(id) ON DELETE CASCADE,
    bill TEXT NOT NULL,
    PRIMARY KEY (statement_id, bill)
);

CREATE INDEX IF NOT EXISTS idx_statement_bills_bill ON statement_bills(bill);
"#;
