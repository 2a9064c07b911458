//! Package version and staging directory naming

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::release::Release;

/// Native package version `{upstream}.{revision}~{release}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    /// Upstream part, `0` unless read from build metadata
    pub upstream: String,
    /// Version-control revision
    pub revision: String,
    /// Target release
    pub release: Release,
}

impl PackageVersion {
    /// Build a version, rejecting empty components
    pub fn new(
        upstream: impl Into<String>,
        revision: impl Into<String>,
        release: Release,
    ) -> Result<Self> {
        let upstream = upstream.into().trim().to_string();
        let revision = revision.into().trim().to_string();

        if revision.is_empty() {
            return Err(Error::missing_revision("revision is empty"));
        }
        if upstream.is_empty() {
            return Err(Error::missing_version("upstream version is empty"));
        }
        if let Some(c) = upstream
            .chars()
            .chain(revision.chars())
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '~')))
        {
            return Err(Error::parse(format!(
                "character '{c}' is not allowed in a native Debian version ({upstream}.{revision})"
            )));
        }

        Ok(Self { upstream, revision, release })
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}~{}", self.upstream, self.revision, self.release)
    }
}

/// Names derived from the package name and its version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagingName {
    package: String,
    version: PackageVersion,
}

impl StagingName {
    /// Create names for `package` at `version`
    pub fn new(package: impl Into<String>, version: PackageVersion) -> Self {
        Self { package: package.into(), version }
    }

    /// Package name
    pub fn package(&self) -> &str {
        &self.package
    }

    /// Package version
    pub fn version(&self) -> &PackageVersion {
        &self.version
    }

    /// Staging directory name, `qstlink2-0.412~precise`
    pub fn directory(&self) -> String {
        format!("{}-{}", self.package, self.version)
    }

    /// Base name shared by the generated source artifacts, `qstlink2_0.412~precise`
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}", self.package, self.version)
    }

    /// `.changes` file produced by a source build
    pub fn source_changes(&self) -> String {
        format!("{}_source.changes", self.artifact_stem())
    }

    /// `.dsc` file produced by a source build
    pub fn dsc(&self) -> String {
        format!("{}.dsc", self.artifact_stem())
    }
}

impl fmt::Display for StagingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.directory())
    }
}
