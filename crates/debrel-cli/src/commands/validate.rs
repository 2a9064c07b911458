//! Validate command implementation

use std::path::PathBuf;

use color_eyre::eyre::{eyre, Context, Result};
use debrel_config::Config;
use debrel_debian::{required_tools, BuildKind, DebianValidator};
use tracing::{error, info, warn};

/// Validate command implementation
pub struct ValidateCommand {
    config_path: PathBuf,
}

impl ValidateCommand {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        info!("Validating configuration and packaging templates");

        let config = Config::from_file(&self.config_path).with_context(|| {
            format!("Failed to load config from {}", self.config_path.display())
        })?;
        println!("✓ Configuration loaded successfully");

        if !config.source_dir.is_dir() {
            error!("Source directory does not exist: {}", config.source_dir.display());
            return Err(eyre!("Source directory does not exist"));
        }
        println!("✓ Source directory exists: {}", config.source_dir.display());

        if !config.work_dir.is_dir() {
            warn!("Work directory does not exist: {}", config.work_dir.display());
        } else {
            println!("✓ Work directory: {}", config.work_dir.display());
        }

        if let Some(path) = config.version_file_path() {
            if !path.is_file() {
                warn!("Version file does not exist: {}", path.display());
            } else {
                println!("✓ Version file: {}", path.display());
            }
        }

        let templates = config.template_debian_dir();
        let result = DebianValidator::new(false)
            .validate_debian_directory(&templates, &config.package_name)
            .with_context(|| format!("Failed to validate {}", templates.display()))?;
        for warning in &result.warnings {
            warn!("debian/: {}", warning);
        }
        if !result.missing_files.is_empty() {
            info!("Templates missing {} (dh_make provides them)", result.missing_files.join(", "));
        }
        println!("✓ Packaging templates: {}", result.summary());

        println!("✓ Releases: {}", config.releases.join(", "));

        let missing = missing_tools(&required_tools(BuildKind::Sbuild, false), &["dput"]);
        if missing.is_empty() {
            println!("✓ All packaging tools found");
        } else {
            for tool in &missing {
                warn!("Tool not found on PATH: {}", tool);
            }
        }

        println!("\n✓ All validation checks passed!");
        Ok(())
    }
}

/// Tools from `tools` and `extra` that are not on `PATH`
fn missing_tools(tools: &[&'static str], extra: &[&'static str]) -> Vec<&'static str> {
    tools
        .iter()
        .chain(extra)
        .copied()
        .filter(|tool| which::which(tool).is_err())
        .collect()
}
