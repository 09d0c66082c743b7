//! Query mapper: the translation between package entities and the tuple
//! store's query form.
//!
//! This module is the only place that knows how packages are laid out in the
//! store:
//!
//! - table = [`SYSTEM_TABLE_PREFIX`] + system
//! - metadata entry = [`META_DATA_PREFIX`] + key
//! - payload handle = the reserved entry [`DATAPATH_KEY`]

use crate::error::{CoreError, Result};
use crate::package::{MetadataEntry, Package, PackageInfo, SearchCriterion, SearchTerm};
use crate::query::{GlobPattern, Predicate, Query, RowJoin};
use crate::response::{Response, RowView};
use crate::types::{ContentHandle, EntryName, RowKey, TableName};

/// Reserved entry holding the payload's content handle.
pub const DATAPATH_KEY: &str = "datapath";

/// Prefix of every package table.
pub const SYSTEM_TABLE_PREFIX: &str = "system_";

/// Prefix of every metadata entry.
pub const META_DATA_PREFIX: &str = "meta_";

/// Table holding the packages of a system.
pub fn system_table(system: &str) -> Result<TableName> {
    if system.is_empty() {
        return Err(CoreError::InvalidPackage("system is empty".into()));
    }
    Ok(TableName::new(format!("{}{}", SYSTEM_TABLE_PREFIX, system)))
}

/// Entry holding one metadata value.
pub fn meta_entry(key: &str) -> Result<EntryName> {
    if key.is_empty() {
        return Err(CoreError::InvalidPackage("metadata key is empty".into()));
    }
    if key == DATAPATH_KEY {
        return Err(CoreError::InvalidPackage(format!(
            "metadata key {:?} is reserved",
            key
        )));
    }
    let name = format!("{}{}", META_DATA_PREFIX, key);
    if name == DATAPATH_KEY {
        return Err(CoreError::InvalidPackage(format!(
            "metadata key {:?} aliases the payload entry",
            key
        )));
    }
    Ok(EntryName::new(name))
}

/// Recover the system from a table name.
pub fn system_from_table(table: &TableName) -> Option<&str> {
    table
        .as_str()
        .strip_prefix(SYSTEM_TABLE_PREFIX)
        .filter(|system| !system.is_empty())
}

// ─────────────────────────────────────────────────────────────────────────────
// Build
// ─────────────────────────────────────────────────────────────────────────────

/// Check that a package can be stored, without building its query.
pub fn validate_package(info: &PackageInfo) -> Result<()> {
    package_row(info).map(|_| ())
}

/// Build the upsert that stores a package's handle and metadata.
///
/// Signatures are not part of the row and are dropped.
pub fn build_add_query(pack: &Package) -> Result<Query> {
    let (table, row) = package_row(&pack.info)?;
    Ok(Query::join(table, vec![row]))
}

fn package_row(info: &PackageInfo) -> Result<(TableName, RowJoin)> {
    if info.name.is_empty() {
        return Err(CoreError::InvalidPackage("name is empty".into()));
    }
    let table = system_table(&info.system)?;

    let mut row = RowJoin::new(RowKey::new(info.name.as_str()));
    row.insert(EntryName::new(DATAPATH_KEY), info.content_handle.as_str());

    for MetadataEntry { key, value } in &info.metadata {
        let entry = meta_entry(key)?;
        if !row.insert(entry, value.as_str()) {
            return Err(CoreError::InvalidPackage(format!(
                "duplicate metadata key {:?}",
                key
            )));
        }
    }

    Ok((table, row))
}

/// Build the select for exactly one package.
pub fn build_get_query(info: &PackageInfo) -> Result<Query> {
    if info.name.is_empty() {
        return Err(CoreError::InvalidPackage("name is empty".into()));
    }
    let table = system_table(&info.system)?;
    Ok(Query::select(
        table,
        Some(Predicate::KeyEquals(info.name.clone())),
    ))
}

/// Build the select for a search.
pub fn build_search_query(term: &SearchTerm) -> Result<Query> {
    if term.system.is_empty() {
        return Err(CoreError::InvalidSearchTerm("system is empty".into()));
    }
    let table = system_table(&term.system)?;

    match term.criterion {
        SearchCriterion::SystemExact => Ok(Query::select(table, None)),
        SearchCriterion::NameWildcard => {
            if term.pattern.is_empty() {
                return Err(CoreError::InvalidSearchTerm(
                    "name search requires a pattern".into(),
                ));
            }
            let pattern = GlobPattern::new(&term.pattern)?;
            Ok(Query::select(table, Some(Predicate::KeyGlob(pattern))))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decode
// ─────────────────────────────────────────────────────────────────────────────

/// Decode every row of an add response.
pub fn decode_add_result(response: &Response) -> Result<Vec<PackageInfo>> {
    Ok(decode_rows(response.rows()))
}

/// Decode a get response; exactly one package must come back.
pub fn decode_get_result(response: &Response) -> Result<PackageInfo> {
    let mut infos = decode_rows(response.rows());
    if infos.len() != 1 {
        return Err(CoreError::UnexpectedCardinality { count: infos.len() });
    }
    Ok(infos.remove(0))
}

/// Decode every row of a search response.
pub fn decode_search_result(response: &Response) -> Result<Vec<PackageInfo>> {
    Ok(decode_rows(response.rows()))
}

/// Decode a sequence of rows into packages.
///
/// Rows that cannot be decoded are logged and skipped; they never fail the
/// whole decode. A row whose payload entry holds several distinct handles
/// (concurrent writers merged by the store) yields one package per handle,
/// so callers that expect a single match see the conflict.
pub fn decode_rows<'a, I>(rows: I) -> Vec<PackageInfo>
where
    I: IntoIterator<Item = RowView<'a>>,
{
    let mut infos = Vec::new();
    for row in rows {
        match decode_row(row) {
            Ok(mut decoded) => infos.append(&mut decoded),
            Err(e) => {
                tracing::warn!(table = %row.table, key = %row.key, "skipping row: {}", e);
            }
        }
    }
    infos
}

/// Decode one row.
pub fn decode_row(row: RowView<'_>) -> Result<Vec<PackageInfo>> {
    let system = system_from_table(row.table).ok_or_else(|| {
        CoreError::MalformedResponse(format!("table {:?} is not a system table", row.table.as_str()))
    })?;
    if row.key.is_empty() {
        return Err(CoreError::MalformedResponse("row key is empty".into()));
    }

    let mut metadata = Vec::new();
    for (name, values) in row.entries {
        if name.as_str() == DATAPATH_KEY {
            continue;
        }
        let Some(key) = name.as_str().strip_prefix(META_DATA_PREFIX) else {
            tracing::trace!(entry = %name, "ignoring unknown entry");
            continue;
        };
        // Values are ordered; on a merged conflict the greatest wins.
        let Some(value) = values.last() else {
            continue;
        };
        if values.len() > 1 {
            tracing::warn!(
                key = %row.key,
                entry = %name,
                "metadata has {} values, keeping {:?}",
                values.len(),
                value
            );
        }
        metadata.push(MetadataEntry::new(key, value.as_str()));
    }

    let template = PackageInfo {
        name: row.key.as_str().to_owned(),
        system: system.to_owned(),
        content_handle: ContentHandle::default(),
        metadata,
        signatures: Vec::new(),
    };

    let handles = row.values(DATAPATH_KEY).unwrap_or_default();
    if handles.is_empty() {
        return Ok(vec![template]);
    }

    Ok(handles
        .iter()
        .map(|handle| PackageInfo {
            content_handle: ContentHandle::new(handle.as_str()),
            ..template.clone()
        })
        .collect())
}
