//! SQLite persistence for sessions, Hansards, cached pages and statements.
//!
//! Backed by rusqlite with the bundled SQLite. Every function takes a plain
//! `&Connection`, so callers can pass a `Transaction` to group writes.

pub mod operations;
pub mod schema;

pub use operations::{
    OperationError, count_statements, delete_cache, delete_statements, find_cache_by_url,
    find_hansard, get_cache, get_hansard, get_session, insert_hansard, insert_statement,
    list_hansards, list_sessions, save_cache, set_hansard_date, statements_for, upsert_session,
};
pub use rusqlite::Connection;
pub use schema::{SchemaError, open_database, open_memory};
