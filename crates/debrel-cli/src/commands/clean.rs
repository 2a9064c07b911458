//! Clean command implementation

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result};
use tracing::info;

use super::load_config;

/// Clean command implementation
pub struct CleanCommand {
    config_path: PathBuf,
}

impl CleanCommand {
    pub fn new(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = load_config(&self.config_path)?;
        info!("Cleaning staging directories in {}", config.work_dir.display());

        let removed = remove_staging_dirs(&config.work_dir, &config.package_name)?;
        if removed.is_empty() {
            println!("  No staging directories found");
        } else {
            for dir in &removed {
                println!("  Removed {}", dir.display());
            }
        }

        println!("✓ Cleanup completed");
        Ok(())
    }
}

/// Delete every `{package}-*` directory directly under `work_dir`
pub fn remove_staging_dirs(work_dir: &Path, package: &str) -> Result<Vec<PathBuf>> {
    if !work_dir.is_dir() {
        info!("Work directory does not exist, nothing to clean: {}", work_dir.display());
        return Ok(Vec::new());
    }

    let prefix = format!("{package}-");
    let entries = std::fs::read_dir(work_dir)
        .with_context(|| format!("Failed to read directory: {}", work_dir.display()))?;

    let mut removed = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with(&prefix) && name.len() > prefix.len());
        if matches {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove directory: {}", path.display()))?;
            removed.push(path);
        }
    }

    removed.sort();
    Ok(removed)
}
