//! Compiled queries for the tuple store.
//!
//! A [`Query`] can only be built inside this crate (by the mapper). Stores
//! inspect it through read-only accessors. Untrusted values never become
//! query text: they are carried as bound parameters, and the textual form is
//! a fixed template plus escaped literals.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CoreError, Result};
use crate::types::{EntryName, RowKey, TableName};

/// A compiled query against a single table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    table: TableName,
    body: QueryBody,
}

/// What a query does to its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryBody {
    /// Upsert rows, merging entry values into what the store already holds.
    Join(Vec<RowJoin>),
    /// Select rows, optionally filtered by a predicate on the row key.
    Select(Option<Predicate>),
}

/// One row written by a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowJoin {
    key: RowKey,
    entries: BTreeMap<EntryName, String>,
}

impl RowJoin {
    pub(crate) fn new(key: RowKey) -> Self {
        Self {
            key,
            entries: BTreeMap::new(),
        }
    }

    /// Insert an entry. Returns false if the entry name was already present.
    pub(crate) fn insert(&mut self, name: EntryName, value: impl Into<String>) -> bool {
        if self.entries.contains_key(&name) {
            return false;
        }
        self.entries.insert(name, value.into());
        true
    }

    /// The row key.
    pub fn key(&self) -> &RowKey {
        &self.key
    }

    /// Entries written to the row, ordered by name.
    pub fn entries(&self) -> impl Iterator<Item = (&EntryName, &str)> {
        self.entries.iter().map(|(k, v)| (k, v.as_str()))
    }
}

/// A predicate on the row key. Values are bound, never spliced into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Row key equals the value.
    KeyEquals(String),
    /// Row key matches the glob pattern.
    KeyGlob(GlobPattern),
}

impl Predicate {
    /// Evaluate the predicate against a row key.
    pub fn matches(&self, key: &str) -> bool {
        match self {
            Predicate::KeyEquals(value) => key == value,
            Predicate::KeyGlob(pattern) => pattern.matches(key),
        }
    }

    fn function(&self) -> &'static str {
        match self {
            Predicate::KeyEquals(_) => "str_eq",
            Predicate::KeyGlob(_) => "str_glob",
        }
    }

    fn param(&self) -> &str {
        match self {
            Predicate::KeyEquals(value) => value,
            Predicate::KeyGlob(pattern) => pattern.as_str(),
        }
    }
}

/// A validated glob pattern (`*`, `?`, `[...]`).
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    compiled: glob::Pattern,
}

impl GlobPattern {
    /// Compile a glob pattern.
    pub fn new(source: &str) -> Result<Self> {
        let compiled = glob::Pattern::new(source).map_err(|e| {
            CoreError::InvalidSearchTerm(format!("bad glob pattern {:?}: {}", source, e.msg))
        })?;
        Ok(Self {
            source: source.to_owned(),
            compiled,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, candidate: &str) -> bool {
        self.compiled.matches(candidate)
    }
}

impl PartialEq for GlobPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for GlobPattern {}

impl Query {
    pub(crate) fn join(table: TableName, rows: Vec<RowJoin>) -> Self {
        Self {
            table,
            body: QueryBody::Join(rows),
        }
    }

    pub(crate) fn select(table: TableName, predicate: Option<Predicate>) -> Self {
        Self {
            table,
            body: QueryBody::Select(predicate),
        }
    }

    /// The table this query addresses.
    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// The operation.
    pub fn body(&self) -> &QueryBody {
        &self.body
    }

    /// The query text with `?` placeholders in place of every value.
    ///
    /// Pair with [`Query::params`] for transports that bind parameters.
    pub fn template(&self) -> String {
        match &self.body {
            QueryBody::Select(None) => "select ?".to_owned(),
            QueryBody::Select(Some(predicate)) => {
                format!("select ? where {}(@key, ?)", predicate.function())
            }
            QueryBody::Join(rows) => {
                let rows: Vec<String> = rows
                    .iter()
                    .map(|row| {
                        let mut parts = vec!["@key=?".to_owned()];
                        parts.extend(row.entries.keys().map(|_| "?=?".to_owned()));
                        format!("({})", parts.join(", "))
                    })
                    .collect();
                format!("join ? rows {}", rows.join(", "))
            }
        }
    }

    /// Values bound to the placeholders of [`Query::template`], in order.
    pub fn params(&self) -> Vec<&str> {
        let mut params = vec![self.table.as_str()];
        match &self.body {
            QueryBody::Select(None) => {}
            QueryBody::Select(Some(predicate)) => params.push(predicate.param()),
            QueryBody::Join(rows) => {
                for row in rows {
                    params.push(row.key.as_str());
                    for (name, value) in &row.entries {
                        params.push(name.as_str());
                        params.push(value.as_str());
                    }
                }
            }
        }
        params
    }
}

impl fmt::Display for Query {
    /// Renders the template with every parameter quoted and escaped.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let template = self.template();
        let mut params = self.params().into_iter();
        for piece in template.split_inclusive('?') {
            match piece.strip_suffix('?') {
                Some(head) => {
                    f.write_str(head)?;
                    f.write_str(&quote(params.next().unwrap_or_default()))?;
                }
                None => f.write_str(piece)?,
            }
        }
        Ok(())
    }
}

/// Quote a literal so it cannot terminate the string it is placed in.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:04x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
