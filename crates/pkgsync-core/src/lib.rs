//! # pkgsync Core
//!
//! Pure primitives for pkgsync: package entities, compiled queries, store
//! responses, and the mapper between them.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`PackageInfo`] / [`Package`] - A package's identity, and its payload
//! - [`SearchTerm`] - What a search asks for
//! - [`Query`] - An opaque compiled query, built only by [`mapper`]
//! - [`Response`] - Rows returned by the tuple store
//!
//! ## Namespace Layout
//!
//! Packages live in one table per system (`system_<system>`), one row per
//! package name. The payload handle is stored under the reserved `datapath`
//! entry and every metadata pair under `meta_<key>`. See [`mapper`].

pub mod error;
pub mod mapper;
pub mod package;
pub mod query;
pub mod response;
pub mod types;

pub use error::{CoreError, Result};
pub use mapper::{
    build_add_query, build_get_query, build_search_query, decode_add_result, decode_get_result,
    decode_search_result, validate_package, DATAPATH_KEY, META_DATA_PREFIX, SYSTEM_TABLE_PREFIX,
};
pub use package::{
    KeyReference, KeyType, MetadataEntry, Package, PackageInfo, SearchCriterion, SearchTerm,
    Signature, ARCHITECTURE_KEY, VERSION_KEY,
};
pub use query::{GlobPattern, Predicate, Query, QueryBody, RowJoin};
pub use response::{Response, ResponseRow, RowView};
pub use types::{ContentHandle, EntryName, KeyFingerprint, RowKey, TableName};
