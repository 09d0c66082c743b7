//! Responses from the tuple store.
//!
//! A response is a finite set of rows. Decoding walks them through
//! [`Response::rows`], which can be called any number of times; each call
//! starts a fresh pass.

use std::collections::BTreeMap;
use std::fmt;

use crate::types::{EntryName, RowKey, TableName};

/// Values held by an entry. Stores keep them ordered and de-duplicated.
pub type EntryValues = Vec<String>;

/// One row returned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseRow {
    pub table: TableName,
    pub key: RowKey,
    pub entries: BTreeMap<EntryName, EntryValues>,
}

impl ResponseRow {
    pub fn new(table: impl Into<TableName>, key: impl Into<RowKey>) -> Self {
        Self {
            table: table.into(),
            key: key.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Add a value to an entry, keeping values sorted and unique.
    pub fn with_value(mut self, entry: impl Into<EntryName>, value: impl Into<String>) -> Self {
        self.push_value(entry, value);
        self
    }

    /// Add a value to an entry in place.
    pub fn push_value(&mut self, entry: impl Into<EntryName>, value: impl Into<String>) {
        let values = self.entries.entry(entry.into()).or_default();
        let value = value.into();
        if let Err(pos) = values.binary_search(&value) {
            values.insert(pos, value);
        }
    }

    /// Borrow this row as a view.
    pub fn view(&self) -> RowView<'_> {
        RowView {
            table: &self.table,
            key: &self.key,
            entries: &self.entries,
        }
    }
}

/// A borrowed view of one row.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    pub table: &'a TableName,
    pub key: &'a RowKey,
    pub entries: &'a BTreeMap<EntryName, EntryValues>,
}

impl<'a> RowView<'a> {
    /// Values of one entry, if present.
    pub fn values(&self, entry: &str) -> Option<&'a [String]> {
        self.entries
            .get(&EntryName::from(entry))
            .map(|v| v.as_slice())
    }
}

/// Result of executing a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    rows: Vec<ResponseRow>,
}

impl Response {
    /// An empty response (what a join usually returns).
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ResponseRow>) -> Self {
        Self { rows }
    }

    pub fn push_row(&mut self, row: ResponseRow) {
        self.rows.push(row);
    }

    /// Iterate the rows. Restartable: every call yields the full set again.
    pub fn rows(&self) -> impl Iterator<Item = RowView<'_>> + '_ {
        self.rows.iter().map(ResponseRow::view)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} row(s)", self.rows.len())?;
        for row in &self.rows {
            write!(f, "; {}[{}]", row.table, row.key)?;
            for (name, values) in &row.entries {
                write!(f, " {}={:?}", name, values)?;
            }
        }
        Ok(())
    }
}
