//! Package command implementation

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Result};
use debrel_build::{PackageRequest, ReleasePipeline, RunContext};
use debrel_core::SystemRunner;
use debrel_debian::{BuildKind, ChangelogMode};
use tracing::info;

use super::{load_config, shutdown_signal, until_interrupted};

/// Package command implementation
pub struct PackageCommand {
    config_path: PathBuf,
    release: Option<String>,
    kind: BuildKind,
    upload: bool,
    revision: Option<String>,
    changelog: ChangelogMode,
}

impl PackageCommand {
    /// `release` of `None` packages every configured release
    pub fn new(
        config_path: PathBuf,
        release: Option<String>,
        kind: BuildKind,
        upload: bool,
        revision: Option<String>,
        changelog: ChangelogMode,
    ) -> Self {
        Self { config_path, release, kind, upload, revision, changelog }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = load_config(&self.config_path)?;
        println!("✓ Configuration loaded and validated");
        info!("Build kind: {}, changelog: {}", self.kind, self.changelog);

        let runner = SystemRunner;
        let pipeline = ReleasePipeline::new(&config, &runner);
        let request = PackageRequest {
            release: self.release.clone().unwrap_or_default(),
            kind: self.kind,
            upload: self.upload,
            revision: self.revision.clone(),
            changelog: self.changelog,
        };

        let work = async {
            let context = match &self.release {
                Some(release) => {
                    let mut context = RunContext::new();
                    let outcome = pipeline.run(&request, &mut context).await?;
                    println!("✓ Packaged {} for {}", outcome.version.as_deref().unwrap_or("?"), release);
                    context
                }
                None => pipeline.run_all(&request).await?,
            };
            Ok::<_, color_eyre::Report>(context)
        };
        let context = until_interrupted(work, shutdown_signal()).await?;

        for outcome in context.outcomes() {
            for artifact in &outcome.artifacts {
                println!("  {}", artifact.display());
            }
            if outcome.uploaded {
                println!("✓ Uploaded {} to {}", outcome.release, config.ppa);
            }
        }

        println!("\n{}", context.summary());
        context.ensure_success().map_err(|e| eyre!("Packaging failed: {e}"))
    }
}
