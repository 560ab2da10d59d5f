//! Storage access for every entity.
//!
//! Each entity has a trait describing what controllers may ask of storage and a
//! SQLite implementation. Implementations check out one pooled connection per call,
//! run every statement through [`LoggedConnection`], and hydrate rows with explicit
//! mapping functions that read columns by name.

mod category;
mod post;
mod tag;
mod user;

pub use category::{CategoryRepository, SqliteCategoryRepository};
pub use post::{PostRepository, SqlitePostRepository};
pub use tag::{SqliteTagRepository, TagRepository};
pub use user::{SqliteUserRepository, UserRepository};

use crate::db::{timestamp_from_db, Database, LoggedConnection, QuerySink};
use chrono::{DateTime, Utc};
use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::types::Type;
use rusqlite::Row;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("invalid stored data: {0}")]
    InvalidData(String),
    #[error("password hashing failed: {0}")]
    Hashing(String),
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Pool plus diagnostics sink shared by the SQLite repositories.
#[derive(Clone)]
pub struct Store {
    db: Database,
    sink: Arc<dyn QuerySink>,
}

impl Store {
    pub fn new(db: Database, sink: Arc<dyn QuerySink>) -> Self {
        Self { db, sink }
    }

    pub(crate) fn connection(&self) -> RepoResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.db.get()?)
    }

    pub(crate) fn logged<'c>(&'c self, conn: &'c rusqlite::Connection) -> LoggedConnection<'c> {
        LoggedConnection::new(conn, self.sink.as_ref())
    }
}

pub(crate) fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let idx = row.as_ref().column_index(column)?;
    let raw: String = row.get(idx)?;
    timestamp_from_db(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn optional_timestamp_column(
    row: &Row<'_>,
    column: &str,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let idx = row.as_ref().column_index(column)?;
    let raw: Option<String> = row.get(idx)?;
    raw.map(|value| {
        timestamp_from_db(&value)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// A timestamp strictly later than `previous`, even when the clock has not advanced.
pub(crate) fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    let floor = previous + chrono::Duration::microseconds(1);
    if now < floor {
        floor
    } else {
        now
    }
}
