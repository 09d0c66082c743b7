//! Package entities: the records that flow between the host, the facade,
//! and the tuple store.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ContentHandle, KeyFingerprint};

/// Metadata key used for the package version.
pub const VERSION_KEY: &str = "version";

/// Metadata key used for the package architecture.
pub const ARCHITECTURE_KEY: &str = "architecture";

/// A single `(key, value)` metadata pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub key: String,
    pub value: String,
}

impl MetadataEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Discriminator for the kind of signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum KeyType {
    /// Key held by the tuple-store node.
    StoreNode = 0,
}

/// Reference to a signing key: its type and fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyReference {
    pub key_type: KeyType,
    pub fingerprint: KeyFingerprint,
}

/// A detached signature over a package.
///
/// Carried as data; nothing in pkgsync verifies it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub key: KeyReference,
    pub data: Vec<u8>,
}

/// Identity and metadata for a package, independent of its payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package name, unique within `system`.
    pub name: String,
    /// Target ecosystem, e.g. `ubuntu16.04-amd64`.
    pub system: String,
    /// Blob-store handle for the payload. Empty until stored.
    pub content_handle: ContentHandle,
    /// Ordered metadata; keys are unique.
    pub metadata: Vec<MetadataEntry>,
    /// Not persisted: the store layout has no entry for signatures, so a
    /// decoded info always has none.
    pub signatures: Vec<Signature>,
}

impl PackageInfo {
    /// Create an info with just a name and system.
    pub fn new(name: impl Into<String>, system: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: system.into(),
            ..Self::default()
        }
    }

    /// Append a metadata pair.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.push(MetadataEntry::new(key, value));
        self
    }

    /// Look up a metadata value by key.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|m| m.key == key)
            .map(|m| m.value.as_str())
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.system, self.name)?;
        if let Some(version) = self.metadata_value(VERSION_KEY) {
            write!(f, "@{}", version)?;
        }
        Ok(())
    }
}

/// A package together with its payload bytes.
///
/// The payload only lives here while it is being staged to or loaded from
/// the blob store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    pub info: PackageInfo,
    pub payload: Bytes,
}

impl Package {
    pub fn new(info: PackageInfo, payload: impl Into<Bytes>) -> Self {
        Self {
            info,
            payload: payload.into(),
        }
    }
}

/// Which query shape a search builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchCriterion {
    /// Rows in the system's table whose name matches a glob pattern.
    NameWildcard,
    /// Every row in the system's table.
    SystemExact,
}

impl FromStr for SearchCriterion {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "name" => Ok(Self::NameWildcard),
            "system" => Ok(Self::SystemExact),
            other => Err(CoreError::UnknownCriterion(other.to_owned())),
        }
    }
}

/// A package search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchTerm {
    pub criterion: SearchCriterion,
    pub system: String,
    /// Glob pattern; ignored for [`SearchCriterion::SystemExact`].
    pub pattern: String,
}

impl SearchTerm {
    /// Search every package of a system.
    pub fn system(system: impl Into<String>) -> Self {
        Self {
            criterion: SearchCriterion::SystemExact,
            system: system.into(),
            pattern: String::new(),
        }
    }

    /// Search a system for names matching a glob pattern.
    pub fn name_wildcard(system: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            criterion: SearchCriterion::NameWildcard,
            system: system.into(),
            pattern: pattern.into(),
        }
    }

    /// Build a term from the text form of its criterion (`"name"` or `"system"`).
    pub fn parse(
        criterion: &str,
        system: impl Into<String>,
        pattern: impl Into<String>,
    ) -> Result<Self, CoreError> {
        Ok(Self {
            criterion: criterion.parse()?,
            system: system.into(),
            pattern: pattern.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_lookup() {
        let info = PackageInfo::new("curl", "ubuntu16.04")
            .with_metadata(VERSION_KEY, "7.47.0")
            .with_metadata(ARCHITECTURE_KEY, "amd64");

        assert_eq!(info.metadata_value(VERSION_KEY), Some("7.47.0"));
        assert_eq!(info.metadata_value(ARCHITECTURE_KEY), Some("amd64"));
        assert_eq!(info.metadata_value("maintainer"), None);
    }

    #[test]
    fn test_display() {
        let info = PackageInfo::new("curl", "ubuntu16.04");
        assert_eq!(info.to_string(), "ubuntu16.04/curl");

        let info = info.with_metadata(VERSION_KEY, "7.47.0");
        assert_eq!(info.to_string(), "ubuntu16.04/curl@7.47.0");
    }

    #[test]
    fn test_parse_criterion() {
        assert_eq!("name".parse::<SearchCriterion>().unwrap(), SearchCriterion::NameWildcard);
        assert_eq!("system".parse::<SearchCriterion>().unwrap(), SearchCriterion::SystemExact);
        assert_eq!(
            "author".parse::<SearchCriterion>().unwrap_err(),
            CoreError::UnknownCriterion("author".into())
        );
    }

    #[test]
    fn test_parse_search_term() {
        let term = SearchTerm::parse("name", "ubuntu16.04", "lib*").unwrap();
        assert_eq!(term, SearchTerm::name_wildcard("ubuntu16.04", "lib*"));
        assert!(SearchTerm::parse("Name", "ubuntu16.04", "").is_err());
    }

    #[test]
    fn test_info_serde() {
        let info = PackageInfo::new("curl", "ubuntu16.04").with_metadata(VERSION_KEY, "1");
        let json = serde_json::to_string(&info).unwrap();
        let back: PackageInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
    }
}
