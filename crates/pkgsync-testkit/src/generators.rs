//! Proptest generators for property-based testing.

use std::collections::BTreeMap;

use bytes::Bytes;
use proptest::prelude::*;

use pkgsync_core::{MetadataEntry, Package, PackageInfo, DATAPATH_KEY};

/// Generate a package name: lowercase, digits and `+.-`, no glob syntax.
pub fn package_name() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9+.-]{0,23}".prop_map(String::from)
}

/// Generate a system label such as `ubuntu16.04` or `debian9-arm64`.
pub fn system_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,11}(-[a-z0-9]{1,6})?".prop_map(String::from)
}

/// Generate a metadata key that does not collide with the payload entry.
pub fn metadata_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,11}".prop_filter("reserved entry name", |k| k != DATAPATH_KEY)
}

/// Generate a metadata value, including characters that need quoting.
pub fn metadata_value() -> impl Strategy<Value = String> {
    "[ -~]{0,24}".prop_map(String::from)
}

/// Generate metadata with unique keys, in arbitrary order.
pub fn metadata() -> impl Strategy<Value = Vec<MetadataEntry>> {
    prop::collection::btree_map(metadata_key(), metadata_value(), 0..6)
        .prop_map(|m: BTreeMap<String, String>| {
            m.into_iter().map(|(k, v)| MetadataEntry::new(k, v)).collect::<Vec<_>>()
        })
        .prop_shuffle()
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Parameters for generating a package.
#[derive(Debug, Clone)]
pub struct PackageParams {
    pub name: String,
    pub system: String,
    pub metadata: Vec<MetadataEntry>,
    pub payload: Vec<u8>,
}

impl Arbitrary for PackageParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (package_name(), system_name(), metadata(), payload(512))
            .prop_map(|(name, system, metadata, payload)| PackageParams {
                name,
                system,
                metadata,
                payload,
            })
            .boxed()
    }
}

/// Generate a package from parameters. The content handle is left empty.
pub fn package_from_params(params: &PackageParams) -> Package {
    let mut info = PackageInfo::new(params.name.as_str(), params.system.as_str());
    info.metadata = params.metadata.clone();
    Package::new(info, Bytes::from(params.payload.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pkgsync_core::{build_add_query, validate_package};

    proptest! {
        #[test]
        fn test_generated_packages_are_valid(params: PackageParams) {
            let pack = package_from_params(&params);
            prop_assert!(validate_package(&pack.info).is_ok());
            prop_assert!(build_add_query(&pack).is_ok());
        }

        #[test]
        fn test_metadata_keys_unique(metadata in metadata()) {
            let mut keys: Vec<_> = metadata.iter().map(|m| m.key.as_str()).collect();
            let len = keys.len();
            keys.sort();
            keys.dedup();
            prop_assert_eq!(keys.len(), len);
        }
    }
}
