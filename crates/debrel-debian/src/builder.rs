//! debuild, sbuild and dput invocations

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use debrel_core::{CommandRunner, Invocation, StagingName};
use tracing::{debug, info};

use crate::error::{DebianError, Result};

/// Which package to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildKind {
    /// Signed source package, ready for a PPA
    Source,
    /// Unsigned local binary package
    #[default]
    Binary,
    /// Unsigned source package built in a clean chroot by sbuild
    Sbuild,
}

impl BuildKind {
    /// Whether the result can be uploaded with dput
    pub fn is_uploadable(&self) -> bool {
        matches!(self, Self::Source)
    }
}

impl FromStr for BuildKind {
    type Err = DebianError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "source" => Ok(Self::Source),
            "binary" | "bin" => Ok(Self::Binary),
            "sbuild" => Ok(Self::Sbuild),
            _ => Err(DebianError::UnknownVariant {
                what: "build kind",
                value: s.to_string(),
                expected: "source, binary, sbuild",
            }),
        }
    }
}

impl fmt::Display for BuildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Source => "source",
            Self::Binary => "binary",
            Self::Sbuild => "sbuild",
        })
    }
}

/// External tools a run of `kind` needs on `PATH`
pub fn required_tools(kind: BuildKind, upload: bool) -> Vec<&'static str> {
    let mut tools = vec!["svn", "dh_make", "debuild"];
    if kind == BuildKind::Sbuild {
        tools.push("sbuild");
    }
    if upload && kind.is_uploadable() {
        tools.push("dput");
    }
    tools
}

/// Runs the package build inside a staging directory
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    work_dir: PathBuf,
    jobs: usize,
}

impl PackageBuilder {
    /// Staging directories live directly under `work_dir`
    pub fn new(work_dir: &Path, jobs: usize) -> Self {
        Self { work_dir: work_dir.to_path_buf(), jobs: jobs.max(1) }
    }

    /// Staging directory for `name`
    pub fn staging_dir(&self, name: &StagingName) -> PathBuf {
        self.work_dir.join(name.directory())
    }

    /// Commands a build of `kind` runs, in order
    pub fn invocations(&self, kind: BuildKind, name: &StagingName) -> Vec<Invocation> {
        let staging = self.staging_dir(name);
        let jobs = format!("-j{}", self.jobs);
        let debuild = Invocation::new("debuild").arg(&jobs).current_dir(&staging).streaming();

        match kind {
            BuildKind::Source => vec![debuild.args(["-S", "-sa"])],
            BuildKind::Binary => vec![debuild.args(["-b", "-uc", "-us"])],
            BuildKind::Sbuild => vec![
                debuild.args(["-S", "-us", "-uc"]),
                Invocation::new("sbuild")
                    .arg("-d")
                    .arg(name.version().release.as_str())
                    .arg(&jobs)
                    .arg(name.dsc())
                    .current_dir(&self.work_dir)
                    .streaming(),
            ],
        }
    }

    /// Build and return the artifacts left in the work directory
    pub async fn build(
        &self,
        runner: &dyn CommandRunner,
        kind: BuildKind,
        name: &StagingName,
    ) -> Result<Vec<PathBuf>> {
        info!("Building {kind} package for {}", name.version());
        for invocation in self.invocations(kind, name) {
            debug!("Running {invocation}");
            runner.run_checked(&invocation).await?;
        }

        let artifacts = self.collect_artifacts(name)?;
        info!("Build produced {} artifacts", artifacts.len());
        Ok(artifacts)
    }

    /// Files in the work directory belonging to `name`
    pub fn collect_artifacts(&self, name: &StagingName) -> Result<Vec<PathBuf>> {
        let stem = name.artifact_stem();
        let mut artifacts = Vec::new();
        if !self.work_dir.is_dir() {
            return Ok(artifacts);
        }

        for entry in std::fs::read_dir(&self.work_dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            if entry.file_type()?.is_file() && file_name.to_string_lossy().starts_with(&stem) {
                artifacts.push(entry.path());
            }
        }

        artifacts.sort();
        Ok(artifacts)
    }
}

/// Sends a source upload to a PPA
#[derive(Debug, Clone)]
pub struct Uploader {
    target: String,
}

impl Uploader {
    /// Upload to dput `target`, e.g. `ppa:owner/archive`
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into() }
    }

    /// The dput command for `name`
    pub fn invocation(&self, work_dir: &Path, name: &StagingName) -> Invocation {
        Invocation::new("dput")
            .arg(&self.target)
            .arg(name.source_changes())
            .current_dir(work_dir)
            .streaming()
    }

    /// Upload the `.changes` of `name` from `work_dir`
    pub async fn upload(
        &self,
        runner: &dyn CommandRunner,
        work_dir: &Path,
        name: &StagingName,
    ) -> Result<()> {
        info!("Uploading {} to {}", name.source_changes(), self.target);
        runner.run_checked(&self.invocation(work_dir, name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use debrel_core::release::DEFAULT_RELEASES;
    use debrel_core::{PackageVersion, Release};

    use super::*;

    fn name() -> StagingName {
        let release = Release::parse("quantal", DEFAULT_RELEASES).unwrap();
        StagingName::new("qstlink2", PackageVersion::new("0", "412", release).unwrap())
    }

    #[test]
    fn test_binary_invocation() {
        let builder = PackageBuilder::new(Path::new("/work"), 4);
        let invocations = builder.invocations(BuildKind::Binary, &name());
        assert_eq!(invocations.len(), 1);
        assert_eq!(invocations[0].command_line(), "debuild -j4 -b -uc -us");
        assert_eq!(invocations[0].cwd.as_deref(), Some(Path::new("/work/qstlink2-0.412~quantal")));
        assert!(!invocations[0].capture);
    }

    #[test]
    fn test_source_and_sbuild_invocations() {
        let builder = PackageBuilder::new(Path::new("/work"), 2);
        let source = builder.invocations(BuildKind::Source, &name());
        assert_eq!(source[0].command_line(), "debuild -j2 -S -sa");

        let sbuild = builder.invocations(BuildKind::Sbuild, &name());
        assert_eq!(sbuild[0].command_line(), "debuild -j2 -S -us -uc");
        assert_eq!(sbuild[1].command_line(), "sbuild -d quantal -j2 qstlink2_0.412~quantal.dsc");
        assert_eq!(sbuild[1].cwd.as_deref(), Some(Path::new("/work")));
    }

    #[test]
    fn test_upload_invocation() {
        let uploader = Uploader::new("ppa:mobyfab/qstlink2");
        let invocation = uploader.invocation(Path::new("/work"), &name());
        assert_eq!(
            invocation.command_line(),
            "dput ppa:mobyfab/qstlink2 qstlink2_0.412~quantal_source.changes"
        );
    }

    #[test]
    fn test_required_tools() {
        assert_eq!(required_tools(BuildKind::Binary, true), vec!["svn", "dh_make", "debuild"]);
        assert!(required_tools(BuildKind::Source, true).contains(&"dput"));
        assert!(!required_tools(BuildKind::Source, false).contains(&"dput"));
        assert!(required_tools(BuildKind::Sbuild, false).contains(&"sbuild"));
    }

    #[test]
    fn test_build_kind_from_str() {
        assert_eq!("bin".parse::<BuildKind>().unwrap(), BuildKind::Binary);
        assert_eq!("SOURCE".parse::<BuildKind>().unwrap(), BuildKind::Source);
        assert!("rpm".parse::<BuildKind>().is_err());
    }
}
