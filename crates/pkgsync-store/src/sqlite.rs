//! SQLite implementation of the tuple store.
//!
//! Persists every entry value as its own row, so a join is a set of
//! `INSERT OR IGNORE`s and concurrent writes to the same entry accumulate
//! values rather than overwrite each other. Blocking work runs on
//! `tokio::task::spawn_blocking`.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection};

use pkgsync_core::{Predicate, Query, QueryBody, Response, ResponseRow, TableName};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::TupleStore;

/// SQLite-based tuple store.
///
/// Thread-safe via internal Mutex.
pub struct SqliteTupleStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTupleStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(format!("connection mutex: {}", e)))?;
            f(&mut conn)
        })
        .await?
    }
}

fn join(conn: &mut Connection, query: &Query) -> Result<Response> {
    let QueryBody::Join(rows) = query.body() else {
        return Err(StoreError::InvalidData("join called with a select".into()));
    };

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO entries (table_name, row_key, entry_name, value, written_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        let now = now_millis();
        for row in rows {
            for (name, value) in row.entries() {
                stmt.execute(params![
                    query.table().as_str(),
                    row.key().as_str(),
                    name.as_str(),
                    value,
                    now,
                ])?;
            }
        }
    }
    tx.commit()?;

    Ok(Response::empty())
}

fn select(conn: &Connection, table: &TableName, predicate: Option<&Predicate>) -> Result<Response> {
    let mut rows: Vec<(String, String, String)> = Vec::new();

    match predicate {
        Some(Predicate::KeyEquals(key)) => {
            let mut stmt = conn.prepare(
                "SELECT row_key, entry_name, value FROM entries
                 WHERE table_name = ?1 AND row_key = ?2
                 ORDER BY row_key, entry_name, value",
            )?;
            let mapped = stmt.query_map(params![table.as_str(), key], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            for r in mapped {
                rows.push(r?);
            }
        }
        other => {
            let mut stmt = conn.prepare(
                "SELECT row_key, entry_name, value FROM entries
                 WHERE table_name = ?1
                 ORDER BY row_key, entry_name, value",
            )?;
            let mapped = stmt.query_map(params![table.as_str()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?;
            for r in mapped {
                let r: (String, String, String) = r?;
                // Globs use glob::Pattern semantics, not SQLite GLOB.
                if other.map_or(true, |p| p.matches(&r.0)) {
                    rows.push(r);
                }
            }
        }
    }

    let mut response = Response::empty();
    let mut current: Option<ResponseRow> = None;
    for (key, entry, value) in rows {
        match current.as_mut() {
            Some(row) if row.key.as_str() == key => row.push_value(entry, value),
            _ => {
                if let Some(done) = current.take() {
                    response.push_row(done);
                }
                current = Some(ResponseRow::new(table.clone(), key).with_value(entry, value));
            }
        }
    }
    if let Some(done) = current {
        response.push_row(done);
    }

    Ok(response)
}

#[async_trait]
impl TupleStore for SqliteTupleStore {
    async fn execute(&self, query: &Query) -> Result<Response> {
        let query = query.clone();
        tracing::trace!(%query, "executing");

        self.with_conn(move |conn| match query.body() {
            QueryBody::Join(_) => join(conn, &query),
            QueryBody::Select(predicate) => select(conn, query.table(), predicate.as_ref()),
        })
        .await
    }
}

fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
