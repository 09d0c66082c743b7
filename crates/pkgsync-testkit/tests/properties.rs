//! Property tests for the package manager over in-memory stores.

use std::collections::BTreeSet;

use proptest::prelude::*;
use tokio::runtime::Runtime;

use pkgsync::{PackageError, PackageInfo, SearchTerm};
use pkgsync_core::{MetadataEntry, DATAPATH_KEY};
use pkgsync_testkit::generators::{
    metadata, package_from_params, package_name, payload, system_name, PackageParams,
};
use pkgsync_testkit::TestFixture;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

fn sorted(mut metadata: Vec<MetadataEntry>) -> Vec<MetadataEntry> {
    metadata.sort_by(|a, b| a.key.cmp(&b.key));
    metadata
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_add_then_get_round_trips(params: PackageParams) {
        let fixture = TestFixture::with_system(params.system.as_str());
        let pack = package_from_params(&params);

        let (added, got) = runtime().block_on(async {
            let added = fixture.manager.add(pack.clone()).await.unwrap();
            let got = fixture
                .manager
                .get(&PackageInfo::new(params.name.as_str(), params.system.as_str()))
                .await
                .unwrap();
            (added, got)
        });

        prop_assert!(!added.content_handle.is_empty());
        prop_assert_eq!(&got.info.name, &pack.info.name);
        prop_assert_eq!(&got.info.system, &pack.info.system);
        prop_assert_eq!(&got.info.content_handle, &added.content_handle);
        prop_assert_eq!(got.info.metadata, sorted(pack.info.metadata));
        prop_assert_eq!(got.payload, pack.payload);
    }

    #[test]
    fn test_search_returns_every_added_package(
        system in system_name(),
        names in prop::collection::btree_set(package_name(), 0..12),
    ) {
        let fixture = TestFixture::with_system(system.as_str());
        let found = runtime().block_on(async {
            for name in &names {
                fixture.manager.add(fixture.package(name)).await.unwrap();
            }
            fixture.manager.search(&SearchTerm::system(system.as_str())).await.unwrap()
        });

        let found: BTreeSet<String> = found.into_iter().map(|i| i.name).collect();
        prop_assert_eq!(found, names);
    }

    #[test]
    fn test_wildcard_matches_prefix(
        names in prop::collection::btree_set(package_name(), 1..12),
        prefix in "[a-z0-9]{0,2}",
    ) {
        let fixture = TestFixture::new();
        let pattern = format!("{}*", prefix);
        let found = runtime().block_on(async {
            for name in &names {
                fixture.manager.add(fixture.package(name)).await.unwrap();
            }
            fixture
                .manager
                .search_by("name", fixture.system.as_str(), &pattern)
                .await
                .unwrap()
        });

        let found: BTreeSet<String> = found.into_iter().map(|i| i.name).collect();
        let expected: BTreeSet<String> = names
            .iter()
            .filter(|n| n.starts_with(prefix.as_str()))
            .cloned()
            .collect();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn test_systems_are_isolated(
        a in system_name(),
        b in system_name(),
        name in package_name(),
    ) {
        prop_assume!(a != b);
        let fixture = TestFixture::with_system(a.as_str());

        let (in_a, in_b, get_b) = runtime().block_on(async {
            fixture.manager.add(fixture.package(&name)).await.unwrap();
            let in_a = fixture.manager.search(&SearchTerm::system(a.as_str())).await.unwrap();
            let in_b = fixture.manager.search(&SearchTerm::system(b.as_str())).await.unwrap();
            let get_b = fixture.manager.get(&PackageInfo::new(name.as_str(), b.as_str())).await;
            (in_a, in_b, get_b)
        });

        prop_assert_eq!(in_a.len(), 1);
        prop_assert!(in_b.is_empty());
        let is_not_found = matches!(get_b, Err(PackageError::NotFound { .. }));
        prop_assert!(is_not_found);
    }

    #[test]
    fn test_reserved_key_rejected_before_io(
        name in package_name(),
        metadata in metadata(),
        bytes in payload(64),
    ) {
        let fixture = TestFixture::new();
        let mut pack = fixture.package(&name);
        pack.info.metadata = metadata;
        pack.info.metadata.push(MetadataEntry::new(DATAPATH_KEY, "spoofed"));
        pack.payload = bytes.into();

        let result = runtime().block_on(fixture.manager.add(pack));

        let is_invalid = matches!(result, Err(PackageError::InvalidPackage { op: "add", .. }));
        prop_assert!(is_invalid);
        prop_assert!(fixture.manager.blob_store().is_empty());
    }
}
