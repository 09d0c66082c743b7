//! Golden query vectors.
//!
//! The rendered text of a compiled query is what a text-based tuple-store
//! transport sends over the wire, so it must not drift. Each vector pins the
//! template and the fully quoted rendering of one query.

use bytes::Bytes;

use pkgsync_core::{
    build_add_query, build_get_query, build_search_query, ContentHandle, Package, PackageInfo,
    Query, SearchTerm,
};

/// A golden query vector.
#[derive(Debug, Clone)]
pub struct QueryVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// The compiled query.
    pub query: Query,
    /// Expected template, with `?` placeholders.
    pub expected_template: &'static str,
    /// Expected rendering with every parameter quoted.
    pub expected_text: &'static str,
}

fn curl() -> PackageInfo {
    PackageInfo::new("curl", "ubuntu16.04").with_metadata("version", "7.47.0-1ubuntu2")
}

/// Get all golden query vectors.
///
/// Panics if a vector's input is rejected by the mapper; the inputs are
/// fixed and valid.
pub fn all_vectors() -> Vec<QueryVector> {
    let mut added = curl().with_metadata("architecture", "amd64");
    added.content_handle = ContentHandle::new("9f2c");

    vec![
        QueryVector {
            name: "get by name",
            query: build_get_query(&curl()).expect("valid get"),
            expected_template: "select ? where str_eq(@key, ?)",
            expected_text: r#"select "system_ubuntu16.04" where str_eq(@key, "curl")"#,
        },
        QueryVector {
            name: "search whole system",
            query: build_search_query(&SearchTerm::system("ubuntu16.04")).expect("valid search"),
            expected_template: "select ?",
            expected_text: r#"select "system_ubuntu16.04""#,
        },
        QueryVector {
            name: "search name wildcard",
            query: build_search_query(&SearchTerm::name_wildcard("ubuntu16.04", "lib*"))
                .expect("valid search"),
            expected_template: "select ? where str_glob(@key, ?)",
            expected_text: r#"select "system_ubuntu16.04" where str_glob(@key, "lib*")"#,
        },
        QueryVector {
            name: "add with metadata",
            query: build_add_query(&Package::new(added, Bytes::new())).expect("valid add"),
            expected_template: "join ? rows (@key=?, ?=?, ?=?, ?=?)",
            expected_text: r#"join "system_ubuntu16.04" rows (@key="curl", "datapath"="9f2c", "meta_architecture"="amd64", "meta_version"="7.47.0-1ubuntu2")"#,
        },
        QueryVector {
            name: "get with quote in name",
            query: build_get_query(&PackageInfo::new(r#"a"b\c"#, "ubuntu16.04"))
                .expect("valid get"),
            expected_template: "select ? where str_eq(@key, ?)",
            expected_text: r#"select "system_ubuntu16.04" where str_eq(@key, "a\"b\\c")"#,
        },
    ]
}

/// Check every vector; returns `(name, passed, rendered)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .into_iter()
        .map(|v| {
            let rendered = v.query.to_string();
            let passed =
                v.query.template() == v.expected_template && rendered == v.expected_text;
            (v.name.to_owned(), passed, rendered)
        })
        .collect()
}
