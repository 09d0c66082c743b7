//! In-memory implementations of the blob and tuple stores.
//!
//! These are primarily for testing. They have the same semantics as the
//! persistent stores but keep everything in memory.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;

use pkgsync_core::{
    ContentHandle, EntryName, Query, QueryBody, Response, ResponseRow, RowKey, TableName,
};

use crate::error::{Result, StoreError};
use crate::traits::{BlobReader, BlobStore, TupleStore};

/// Handle for a blob: the hex BLAKE3 digest of its bytes.
pub fn content_handle(data: &[u8]) -> ContentHandle {
    ContentHandle::new(blake3::hash(data).to_hex().to_string())
}

/// In-memory blob store.
///
/// Handles are content hashes, so storing the same bytes twice is a no-op.
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<ContentHandle, Bytes>>,
}

impl MemoryBlobStore {
    /// Create a new empty blob store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, data: Bytes) -> Result<ContentHandle> {
        let handle = content_handle(&data);
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        blobs.entry(handle.clone()).or_insert(data);
        Ok(handle)
    }

    async fn fetch(&self, handle: &ContentHandle) -> Result<BlobReader> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let data = blobs
            .get(handle)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(handle.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }
}

type Entries = BTreeMap<EntryName, BTreeSet<String>>;
type Table = BTreeMap<RowKey, Entries>;

/// In-memory tuple store.
///
/// A join merges entry values into the existing row (set union), the way a
/// replicated store merges concurrent writes. Two joins that write different
/// values to the same entry leave both values behind.
pub struct MemoryTupleStore {
    tables: RwLock<BTreeMap<TableName, Table>>,
}

impl MemoryTupleStore {
    /// Create a new empty tuple store.
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: &TableName) -> usize {
        self.tables
            .read()
            .map(|t| t.get(table).map(|rows| rows.len()).unwrap_or(0))
            .unwrap_or(0)
    }
}

impl Default for MemoryTupleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TupleStore for MemoryTupleStore {
    async fn execute(&self, query: &Query) -> Result<Response> {
        match query.body() {
            QueryBody::Join(rows) => {
                let mut tables = self
                    .tables
                    .write()
                    .map_err(|e| StoreError::Poisoned(e.to_string()))?;
                let table = tables.entry(query.table().clone()).or_default();
                for row in rows {
                    let entries = table.entry(row.key().clone()).or_default();
                    for (name, value) in row.entries() {
                        entries
                            .entry(name.clone())
                            .or_default()
                            .insert(value.to_owned());
                    }
                }
                Ok(Response::empty())
            }
            QueryBody::Select(predicate) => {
                let tables = self
                    .tables
                    .read()
                    .map_err(|e| StoreError::Poisoned(e.to_string()))?;
                let Some(table) = tables.get(query.table()) else {
                    return Ok(Response::empty());
                };

                let rows = table
                    .iter()
                    .filter(|(key, _)| {
                        predicate
                            .as_ref()
                            .map_or(true, |p| p.matches(key.as_str()))
                    })
                    .map(|(key, entries)| {
                        let mut row = ResponseRow::new(query.table().clone(), key.clone());
                        for (name, values) in entries {
                            for value in values {
                                row.push_value(name.clone(), value.as_str());
                            }
                        }
                        row
                    })
                    .collect();
                Ok(Response::from_rows(rows))
            }
        }
    }
}
