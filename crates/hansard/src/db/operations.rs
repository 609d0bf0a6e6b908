//! Reads and writes for every stored entity.

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

use crate::types::{Hansard, HansardCache, HansardSummary, Session, Speaker, Statement};

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Entity not found: {entity_type} with id '{id}'")]
    NotFound { entity_type: String, id: String },
}

// ── Sessions ────────────────────────────────────────────────────────────────

pub fn upsert_session(conn: &Connection, session: &Session) -> Result<(), OperationError> {
    conn.execute(
        "INSERT INTO sessions (id, parliament, number, start_date, end_date)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
             parliament = excluded.parliament,
             number = excluded.number,
             start_date = excluded.start_date,
             end_date = excluded.end_date",
        params![
            session.id,
            session.parliament,
            session.number,
            session.start,
            session.end
        ],
    )?;
    Ok(())
}

pub fn get_session(conn: &Connection, id: &str) -> Result<Option<Session>, OperationError> {
    conn.query_row(
        "SELECT id, parliament, number, start_date, end_date FROM sessions WHERE id = ?1",
        params![id],
        row_to_session,
    )
    .optional()
    .map_err(Into::into)
}

pub fn list_sessions(conn: &Connection) -> Result<Vec<Session>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, parliament, number, start_date, end_date FROM sessions ORDER BY start_date",
    )?;
    let rows = stmt.query_map([], row_to_session)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        parliament: row.get(1)?,
        number: row.get(2)?,
        start: row.get(3)?,
        end: row.get(4)?,
    })
}

// ── Hansards ────────────────────────────────────────────────────────────────

const HANSARD_COLUMNS: &str = "h.id, h.session_id, h.number, h.url, h.date";

/// Insert a new Hansard. Returns it with its generated ID.
pub fn insert_hansard(
    conn: &Connection,
    session_id: &str,
    number: &str,
    url: Option<&str>,
) -> Result<Hansard, OperationError> {
    conn.execute(
        "INSERT INTO hansards (session_id, number, url) VALUES (?1, ?2, ?3)",
        params![session_id, number, url],
    )?;

    Ok(Hansard {
        id: conn.last_insert_rowid(),
        session_id: session_id.to_string(),
        number: number.to_string(),
        url: url.map(str::to_string),
        date: None,
    })
}

pub fn find_hansard(
    conn: &Connection,
    session_id: &str,
    number: &str,
) -> Result<Option<Hansard>, OperationError> {
    conn.query_row(
        &format!(
            "SELECT {} FROM hansards h WHERE h.session_id = ?1 AND h.number = ?2",
            HANSARD_COLUMNS
        ),
        params![session_id, number],
        row_to_hansard,
    )
    .optional()
    .map_err(Into::into)
}

pub fn get_hansard(conn: &Connection, id: i64) -> Result<Hansard, OperationError> {
    conn.query_row(
        &format!("SELECT {} FROM hansards h WHERE h.id = ?1", HANSARD_COLUMNS),
        params![id],
        row_to_hansard,
    )
    .optional()?
    .ok_or_else(|| OperationError::NotFound {
        entity_type: "hansard".to_string(),
        id: id.to_string(),
    })
}

pub fn set_hansard_date(
    conn: &Connection,
    hansard_id: i64,
    date: NaiveDate,
) -> Result<(), OperationError> {
    conn.execute(
        "UPDATE hansards SET date = ?1 WHERE id = ?2",
        params![date, hansard_id],
    )?;
    Ok(())
}

/// All Hansards, optionally restricted to one session, with their statement counts.
pub fn list_hansards(
    conn: &Connection,
    session_id: Option<&str>,
) -> Result<Vec<HansardSummary>, OperationError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {},
                (SELECT COUNT(*) FROM statements s WHERE s.hansard_id = h.id),
                EXISTS(SELECT 1 FROM hansard_cache c WHERE c.hansard_id = h.id)
         FROM hansards h
         WHERE ?1 IS NULL OR h.session_id = ?1
         ORDER BY h.session_id, h.date, h.id",
        HANSARD_COLUMNS
    ))?;
    let rows = stmt.query_map(params![session_id], |row| {
        Ok(HansardSummary {
            hansard: row_to_hansard(row)?,
            statements: row.get::<_, i64>(5)? as usize,
            cached: row.get(6)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}

fn row_to_hansard(row: &Row) -> rusqlite::Result<Hansard> {
    Ok(Hansard {
        id: row.get(0)?,
        session_id: row.get(1)?,
        number: row.get(2)?,
        url: row.get(3)?,
        date: row.get(4)?,
    })
}

// ── Cache ───────────────────────────────────────────────────────────────────

/// Store the raw page of a Hansard, replacing any earlier copy.
pub fn save_cache(
    conn: &Connection,
    hansard: &Hansard,
    html: &str,
) -> Result<HansardCache, OperationError> {
    conn.execute(
        "INSERT INTO hansard_cache (hansard_id, html) VALUES (?1, ?2)
         ON CONFLICT(hansard_id) DO UPDATE SET
             html = excluded.html,
             fetched_at = datetime('now')",
        params![hansard.id, html],
    )?;

    get_cache(conn, hansard)?.ok_or_else(|| OperationError::NotFound {
        entity_type: "hansard_cache".to_string(),
        id: hansard.id.to_string(),
    })
}

pub fn get_cache(
    conn: &Connection,
    hansard: &Hansard,
) -> Result<Option<HansardCache>, OperationError> {
    conn.query_row(
        "SELECT html, fetched_at FROM hansard_cache WHERE hansard_id = ?1",
        params![hansard.id],
        |row| {
            Ok(HansardCache {
                hansard: hansard.clone(),
                html: row.get(0)?,
                fetched_at: row.get(1)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

/// Cached page of whichever Hansard was downloaded from `url`.
pub fn find_cache_by_url(
    conn: &Connection,
    url: &str,
) -> Result<Option<HansardCache>, OperationError> {
    conn.query_row(
        &format!(
            "SELECT {}, c.html, c.fetched_at
             FROM hansard_cache c JOIN hansards h ON h.id = c.hansard_id
             WHERE h.url = ?1",
            HANSARD_COLUMNS
        ),
        params![url],
        |row| {
            Ok(HansardCache {
                hansard: row_to_hansard(row)?,
                html: row.get(5)?,
                fetched_at: row.get(6)?,
            })
        },
    )
    .optional()
    .map_err(Into::into)
}

/// Drop the cached page. Returns whether one existed.
pub fn delete_cache(conn: &Connection, hansard_id: i64) -> Result<bool, OperationError> {
    let deleted = conn.execute(
        "DELETE FROM hansard_cache WHERE hansard_id = ?1",
        params![hansard_id],
    )?;
    Ok(deleted > 0)
}

// ── Statements ──────────────────────────────────────────────────────────────

pub fn count_statements(conn: &Connection, hansard_id: i64) -> Result<usize, OperationError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM statements WHERE hansard_id = ?1",
        params![hansard_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

/// Delete every statement of a Hansard (bill mentions cascade). Returns the count.
pub fn delete_statements(conn: &Connection, hansard_id: i64) -> Result<usize, OperationError> {
    let deleted = conn.execute(
        "DELETE FROM statements WHERE hansard_id = ?1",
        params![hansard_id],
    )?;
    Ok(deleted)
}

/// Save a statement and its bill mentions. Returns the statement row ID.
pub fn insert_statement(
    conn: &Connection,
    hansard_id: i64,
    statement: &Statement,
) -> Result<i64, OperationError> {
    let speaker = statement.speaker.as_ref();
    conn.execute(
        "INSERT INTO statements
             (hansard_id, sequence, time, who, speaker_name, speaker_details, party,
              h1, h2, text, wordcount, procedural)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            hansard_id,
            statement.sequence,
            statement.time,
            statement.who,
            speaker.map(|s| &s.name),
            speaker.and_then(|s| s.details.as_ref()),
            speaker.and_then(|s| s.party.as_ref()),
            statement.h1,
            statement.h2,
            statement.text,
            statement.wordcount,
            statement.procedural,
        ],
    )?;
    let statement_id = conn.last_insert_rowid();

    for bill in &statement.bills {
        conn.execute(
            "INSERT OR IGNORE INTO statement_bills (statement_id, bill) VALUES (?1, ?2)",
            params![statement_id, bill],
        )?;
    }

    Ok(statement_id)
}

/// Saved statements of a Hansard in sequence order.
pub fn statements_for(conn: &Connection, hansard_id: i64) -> Result<Vec<Statement>, OperationError> {
    let mut stmt = conn.prepare(
        "SELECT id, sequence, time, who, speaker_name, speaker_details, party,
                h1, h2, text, wordcount, procedural
         FROM statements WHERE hansard_id = ?1 ORDER BY sequence",
    )?;
    let mut bills_stmt =
        conn.prepare("SELECT bill FROM statement_bills WHERE statement_id = ?1 ORDER BY rowid")?;

    let rows = stmt.query_map(params![hansard_id], |row| {
        let id: i64 = row.get(0)?;
        let speaker_name: Option<String> = row.get(4)?;
        let time: Option<NaiveTime> = row.get(2)?;
        let statement = Statement {
            sequence: row.get(1)?,
            time,
            who: row.get(3)?,
            speaker: match speaker_name {
                Some(name) => Some(Speaker {
                    name,
                    details: row.get(5)?,
                    party: row.get(6)?,
                }),
                None => None,
            },
            h1: row.get(7)?,
            h2: row.get(8)?,
            text: row.get(9)?,
            wordcount: row.get(10)?,
            procedural: row.get(11)?,
            bills: Vec::new(),
        };
        Ok((id, statement))
    })?;

    let mut statements = Vec::new();
    for row in rows {
        let (id, mut statement) = row?;
        statement.bills = bills_stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        statements.push(statement);
    }

    Ok(statements)
}
