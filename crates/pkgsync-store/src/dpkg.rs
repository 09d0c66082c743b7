//! Host package source backed by dpkg.
//!
//! Lists installed packages with `dpkg -l` and repackages one with
//! `fakeroot -u dpkg-repack <name>`, reading the resulting `.deb`.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::process::Command;

use pkgsync_core::{Package, PackageInfo, ARCHITECTURE_KEY, VERSION_KEY};

use crate::error::{Result, StoreError};
use crate::traits::{PackageGetter, PackageLister};

const DPKG: &str = "dpkg";
const FAKEROOT: &str = "fakeroot";
const DPKG_REPACK: &str = "dpkg-repack";

/// Status column of a fully installed package in `dpkg -l`.
const INSTALLED: &str = "ii";

/// dpkg-backed package source for Debian-family systems.
#[derive(Debug, Clone)]
pub struct DpkgSource {
    system: String,
}

impl DpkgSource {
    /// Create a source that labels every package with `system`.
    pub fn new(system: impl Into<String>) -> Self {
        Self {
            system: system.into(),
        }
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    /// Parse `dpkg -l` output into package infos.
    ///
    /// Only rows whose status is exactly `ii` are kept. Lines with fewer than
    /// four fields (headers, blank lines) are logged and skipped.
    pub fn parse_list(&self, text: &str) -> Vec<PackageInfo> {
        let mut infos = Vec::new();

        for line in text.lines() {
            let mut fields = line.split_whitespace();
            let (Some(status), Some(name), Some(version), Some(arch)) =
                (fields.next(), fields.next(), fields.next(), fields.next())
            else {
                tracing::warn!(line, "skipping dpkg line with fewer than 4 fields");
                continue;
            };
            if status != INSTALLED {
                continue;
            }

            infos.push(
                PackageInfo::new(name, self.system.as_str())
                    .with_metadata(VERSION_KEY, version)
                    .with_metadata(ARCHITECTURE_KEY, arch),
            );
        }

        infos
    }
}

/// File name dpkg-repack writes for a package: `<name>_<version>_<arch>.deb`.
///
/// The multiarch qualifier (`libc6:amd64`) and version epoch (`1:2.0`) do
/// not appear in the file name.
pub fn deb_file_name(info: &PackageInfo) -> String {
    let name = info.name.split(':').next().unwrap_or_default();
    let version = info.metadata_value(VERSION_KEY).unwrap_or_default();
    let version = version.split_once(':').map_or(version, |(_, v)| v);
    let arch = info.metadata_value(ARCHITECTURE_KEY).unwrap_or_default();
    format!("{}_{}_{}.deb", name, version, arch)
}

async fn run(command: &mut Command, display: String) -> Result<Vec<u8>> {
    let output = command.output().await.map_err(|e| StoreError::Command {
        command: display.clone(),
        message: e.to_string(),
    })?;

    if !output.status.success() {
        return Err(StoreError::Command {
            command: display,
            message: format!(
                "{}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ),
        });
    }

    Ok(output.stdout)
}

#[async_trait]
impl PackageLister for DpkgSource {
    type Error = StoreError;

    async fn installed_packages(&self) -> Result<Vec<PackageInfo>> {
        let stdout = run(Command::new(DPKG).arg("-l"), format!("{} -l", DPKG)).await?;

        let infos = self.parse_list(&String::from_utf8_lossy(&stdout));
        tracing::info!(count = infos.len(), system = %self.system, "listed installed packages");
        Ok(infos)
    }
}

#[async_trait]
impl PackageGetter for DpkgSource {
    type Error = StoreError;

    async fn get(&self, info: &PackageInfo) -> Result<Package> {
        // Each repack gets its own directory; the process cwd is never changed.
        let dir = tempfile::Builder::new().prefix("pkgsync").tempdir()?;

        run(
            Command::new(FAKEROOT)
                .args(["-u", DPKG_REPACK, info.name.as_str()])
                .current_dir(dir.path()),
            format!("{} -u {} {}", FAKEROOT, DPKG_REPACK, info.name),
        )
        .await?;

        let path = dir.path().join(deb_file_name(info));
        let contents = tokio::fs::read(&path).await?;
        tracing::debug!(package = %info, bytes = contents.len(), "repacked");

        Ok(Package::new(info.clone(), Bytes::from(contents)))
    }
}
