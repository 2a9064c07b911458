//! Changelog command implementation

use std::path::PathBuf;
use std::time::Duration;

use color_eyre::eyre::{Context, Result};
use debrel_build::ReleasePipeline;
use debrel_core::SystemRunner;
use debrel_debian::{write_changelog, ChangelogWriter};
use debrel_vcs::Subversion;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use super::load_config;

/// Changelog command implementation
pub struct ChangelogCommand {
    config_path: PathBuf,
    release: String,
    output: Option<PathBuf>,
}

impl ChangelogCommand {
    pub fn new(config_path: PathBuf, release: String, output: Option<PathBuf>) -> Self {
        Self { config_path, release, output }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = load_config(&self.config_path)?;
        let release = config.release(&self.release)?;

        let runner = SystemRunner;
        let pipeline = ReleasePipeline::new(&config, &runner);

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner.set_message("Querying Subversion...");

        let queried = async {
            let resolved = pipeline.resolve_version(release.clone(), None).await?;
            let log = Subversion::new(&runner).log(&config.source_dir, config.log_limit).await?;
            Ok::<_, color_eyre::Report>((resolved, log))
        }
        .await;
        spinner.finish_and_clear();
        let (resolved, log) = queried.context("Failed to query Subversion")?;

        let writer = ChangelogWriter::new(
            &config.package_name,
            &resolved.version.upstream,
            &config.urgency,
            config.maintainer_line(),
        );
        let rendered = writer.render(&release, &log.entries);
        if log.skipped > 0 {
            warn!("Skipped {} unusable log entries", log.skipped);
        }
        if rendered.is_empty() {
            warn!("No usable log entries, nothing written");
            return Ok(());
        }

        let path = self.output.clone().unwrap_or_else(|| pipeline.changelog_path());
        write_changelog(&path, &rendered.text)
            .with_context(|| format!("Failed to write changelog to {}", path.display()))?;
        info!("Latest version {}", resolved.version);

        println!("✓ Wrote {} stanzas to {}", rendered.stanzas, path.display());
        Ok(())
    }
}
