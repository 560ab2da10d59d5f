use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, Row, ToSql};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// One successfully executed statement.
#[derive(Debug, Clone)]
pub struct QueryRecord {
    pub sql: String,
    pub elapsed: Duration,
    pub params: Vec<String>,
}

impl QueryRecord {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

/// Receives a record after every successful statement.
pub trait QuerySink: Send + Sync {
    fn record(&self, record: QueryRecord);
}

/// Emits each statement as a debug event on the `blog_admin::sql` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl QuerySink for TracingSink {
    fn record(&self, record: QueryRecord) {
        emit(&record);
    }
}

/// Bounded in-memory history of recent statements, newest last.
pub struct QueryLog {
    capacity: usize,
    entries: Mutex<VecDeque<QueryRecord>>,
}

impl QueryLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn entries(&self) -> Vec<QueryRecord> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.iter().cloned().collect()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl QuerySink for QueryLog {
    fn record(&self, record: QueryRecord) {
        emit(&record);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }
}

fn emit(record: &QueryRecord) {
    tracing::debug!(
        target: "blog_admin::sql",
        sql = %record.sql,
        elapsed_ms = record.elapsed_ms(),
        params = ?record.params,
        "statement executed"
    );
}

/// Statement executor that reports every successful call to a [`QuerySink`].
///
/// Results and errors of the wrapped connection are returned untouched; a failed
/// statement is never recorded.
pub struct LoggedConnection<'c> {
    conn: &'c Connection,
    sink: &'c dyn QuerySink,
}

impl<'c> LoggedConnection<'c> {
    pub fn new(conn: &'c Connection, sink: &'c dyn QuerySink) -> Self {
        Self { conn, sink }
    }

    pub fn execute(&self, sql: &str, params: &[&dyn ToSql]) -> rusqlite::Result<usize> {
        let started = Instant::now();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let changed = stmt.execute(params)?;
        self.record(sql, started, params);
        Ok(changed)
    }

    pub fn query_row<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let started = Instant::now();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let value = stmt.query_row(params, f)?;
        self.record(sql, started, params);
        Ok(value)
    }

    pub fn query_optional<T, F>(
        &self,
        sql: &str,
        params: &[&dyn ToSql],
        f: F,
    ) -> rusqlite::Result<Option<T>>
    where
        F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
    {
        let started = Instant::now();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let value = stmt.query_row(params, f).optional()?;
        self.record(sql, started, params);
        Ok(value)
    }

    pub fn query_all<T, F>(&self, sql: &str, params: &[&dyn ToSql], f: F) -> rusqlite::Result<Vec<T>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
    {
        let started = Instant::now();
        let mut stmt = self.conn.prepare_cached(sql)?;
        let rows = stmt
            .query_map(params, f)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        self.record(sql, started, params);
        Ok(rows)
    }

    pub fn last_insert_rowid(&self) -> i64 {
        self.conn.last_insert_rowid()
    }

    fn record(&self, sql: &str, started: Instant, params: &[&dyn ToSql]) {
        self.sink.record(QueryRecord {
            sql: sql.to_string(),
            elapsed: started.elapsed(),
            params: params.iter().map(|p| render_param(*p)).collect(),
        });
    }
}

pub(crate) fn render_param(param: &dyn ToSql) -> String {
    match param.to_sql() {
        Ok(ToSqlOutput::Borrowed(value)) => render_value(value),
        Ok(ToSqlOutput::Owned(value)) => render_value(ValueRef::from(&value)),
        Ok(_) => "<unsupported>".to_string(),
        Err(_) => "<unrenderable>".to_string(),
    }
}

fn render_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => format!("'{}'", String::from_utf8_lossy(bytes)),
        ValueRef::Blob(bytes) => format!("<blob {} bytes>", bytes.len()),
    }
}
