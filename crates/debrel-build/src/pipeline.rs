//! The packaging pipeline for one release, and for all of them

use std::path::PathBuf;
use std::time::Instant;

use debrel_config::Config;
use debrel_core::{CommandRunner, PackageVersion, Release, StagingName};
use debrel_debian::{
    changelog, BuildKind, ChangelogMode, ChangelogWriter, DebianValidator, PackageBuilder,
    Stager, Uploader,
};
use debrel_vcs::{read_version_file, Subversion};
use tracing::{error, info, warn};

use crate::context::{ReleaseOutcome, RunContext, RunState};
use crate::error::Result;
use crate::guard::StagingGuard;

/// What to build
#[derive(Debug, Clone, Default)]
pub struct PackageRequest {
    /// Target release, ignored by [`ReleasePipeline::run_all`]
    pub release: String,
    /// Package kind
    pub kind: BuildKind,
    /// Send the source package to the configured PPA
    pub upload: bool,
    /// Use this revision instead of asking version control
    pub revision: Option<String>,
    /// How the changelog is produced
    pub changelog: ChangelogMode,
}

/// Version of a run plus the `svn info` document it came from
#[derive(Debug, Clone)]
pub struct ResolvedVersion {
    /// Package version
    pub version: PackageVersion,
    /// `svn info --xml` output, when version control was queried
    pub info_xml: Option<String>,
}

/// Runs the packaging steps with the configured tools
pub struct ReleasePipeline<'a> {
    config: &'a Config,
    runner: &'a dyn CommandRunner,
}

impl<'a> ReleasePipeline<'a> {
    /// Create a pipeline for `config`
    pub fn new(config: &'a Config, runner: &'a dyn CommandRunner) -> Self {
        Self { config, runner }
    }

    fn svn(&self) -> Subversion<'a> {
        Subversion::new(self.runner)
    }

    /// Package `request.release`
    ///
    /// The release is checked and the version resolved before anything is
    /// written. The staging directory is removed whether the build succeeds,
    /// fails or the returned future is dropped. `context` is left
    /// `Completed` or `Failed` according to all outcomes recorded so far.
    pub async fn run(
        &self,
        request: &PackageRequest,
        context: &mut RunContext,
    ) -> Result<ReleaseOutcome> {
        let started = Instant::now();
        let mut outcome = ReleaseOutcome::new(request.release.clone());

        let result = self.run_release(request, context, &mut outcome).await;
        outcome.duration = started.elapsed();
        match &result {
            Ok(()) => outcome.success = true,
            Err(e) => {
                error!("Packaging for {} failed: {e}", request.release);
                outcome.error = Some(e.to_string());
            }
        }
        context.add_outcome(outcome.clone());
        context.finish();
        result.map(|()| outcome)
    }

    async fn run_release(
        &self,
        request: &PackageRequest,
        context: &mut RunContext,
        outcome: &mut ReleaseOutcome,
    ) -> Result<()> {
        context.set_state(RunState::Resolving);
        let release = self.config.release(&request.release)?;
        let resolved = self.resolve_version(release, request.revision.as_deref()).await?;
        let name = StagingName::new(&self.config.package_name, resolved.version.clone());
        outcome.version = Some(resolved.version.to_string());
        info!("Package version: {}", name.directory());

        context.set_state(RunState::Staging);
        let (stanzas, skipped) = self.update_changelog(request.changelog, &resolved.version).await?;
        outcome.changelog_stanzas = stanzas;
        outcome.skipped_log_entries = skipped;

        let builder = PackageBuilder::new(&self.config.work_dir, self.config.parallel_jobs);
        let guard = StagingGuard::create(builder.staging_dir(&name))?;

        let info_xml = match (&self.config.svn_info_path, resolved.info_xml) {
            (None, _) => None,
            (Some(_), Some(xml)) => Some(xml),
            (Some(_), None) => Some(self.svn().info_xml(&self.config.source_dir).await?),
        };
        self.stager()?
            .populate(self.runner, guard.path(), &resolved.version.revision, info_xml.as_deref())
            .await?;

        let validation = DebianValidator::new(false)
            .validate_debian_directory(&guard.path().join("debian"), &self.config.package_name)?;
        for warning in &validation.warnings {
            warn!("debian/: {warning}");
        }

        context.set_state(RunState::Building);
        outcome.artifacts = builder.build(self.runner, request.kind, &name).await?;

        if request.upload {
            if request.kind.is_uploadable() {
                context.set_state(RunState::Uploading);
                Uploader::new(&self.config.ppa)
                    .upload(self.runner, &self.config.work_dir, &name)
                    .await?;
                outcome.uploaded = true;
            } else {
                warn!("Only source packages can be sent to a PPA; skipping upload of {} build", request.kind);
            }
        }

        guard.finish()?;
        Ok(())
    }

    /// Package every configured release in order
    ///
    /// A failed release does not stop the others; check the returned
    /// context with [`RunContext::ensure_success`]. Validation errors, such
    /// as a missing revision, end the run at once.
    pub async fn run_all(&self, request: &PackageRequest) -> Result<RunContext> {
        let mut context = RunContext::new();
        let releases = self.config.all_releases()?;

        for release in &releases {
            info!("Packaging release {release}");
            let request = PackageRequest { release: release.to_string(), ..request.clone() };
            if let Err(e) = self.run(&request, &mut context).await {
                if e.is_validation() {
                    return Err(e);
                }
            }
        }

        Ok(context)
    }

    /// Determine the package version for `release`
    pub async fn resolve_version(
        &self,
        release: Release,
        revision_override: Option<&str>,
    ) -> Result<ResolvedVersion> {
        let (revision, info_xml) = match revision_override {
            Some(revision) => (revision.to_string(), None),
            None => {
                let info = self.svn().revision_info(&self.config.source_dir).await?;
                (info.revision, Some(info.xml))
            }
        };
        info!("Using revision {revision}");

        let upstream = match self.config.version_file_path() {
            Some(path) => {
                let key = self.config.version_file.as_ref().map_or("VERSION", |vf| vf.key.as_str());
                read_version_file(&path, key)?
            }
            None => self.config.upstream_version.clone(),
        };

        let version = PackageVersion::new(upstream, revision, release)?;
        Ok(ResolvedVersion { version, info_xml })
    }

    /// Produce the template changelog according to `mode`
    ///
    /// Returns the number of stanzas written and log entries skipped.
    pub async fn update_changelog(
        &self,
        mode: ChangelogMode,
        version: &PackageVersion,
    ) -> Result<(usize, usize)> {
        let path = self.changelog_path();
        match mode {
            ChangelogMode::Skip => {
                info!("Keeping existing {}", path.display());
                Ok((0, 0))
            }
            ChangelogMode::Rewrite => {
                changelog::rewrite_file(&path, &self.config.package_name, version, &self.config.urgency)?;
                Ok((1, 0))
            }
            ChangelogMode::Generate => {
                let log = self.svn().log(&self.config.source_dir, self.config.log_limit).await?;
                let writer = ChangelogWriter::new(
                    &self.config.package_name,
                    &version.upstream,
                    &self.config.urgency,
                    self.config.maintainer_line(),
                );
                let rendered = writer.render(&version.release, &log.entries);
                if rendered.is_empty() {
                    warn!("No usable log entries; keeping existing {}", path.display());
                    return Ok((0, log.skipped));
                }
                changelog::write_changelog(&path, &rendered.text)?;
                Ok((rendered.stanzas, log.skipped))
            }
        }
    }

    /// Changelog inside the template `debian/` directory
    pub fn changelog_path(&self) -> PathBuf {
        self.config.template_debian_dir().join("changelog")
    }

    fn stager(&self) -> Result<Stager> {
        let stager = Stager::new(
            &self.config.source_dir,
            self.config.template_debian_dir(),
            &self.config.maintainer.email,
            &self.config.license,
        )
        .with_exclude(&self.config.exclude)?
        .with_svn_info_path(self.config.svn_info_path.clone());
        Ok(stager)
    }
}
