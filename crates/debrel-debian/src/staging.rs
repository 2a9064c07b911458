//! Staging copy of the source tree
//!
//! The staging directory gets a copy of the project without the packaging
//! folder, a `debian/` skeleton from `dh_make`, the project's own templates
//! on top, and a `version` file carrying the revision.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use debrel_core::{CommandRunner, Invocation};
use glob::Pattern;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{DebianError, Result};

/// Example files `dh_make` leaves in `debian/`
const DH_MAKE_EXAMPLES: &[&str] = &["*.ex", "*.EX", "ex.*"];

fn example_patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        DH_MAKE_EXAMPLES.iter().map(|p| Pattern::new(p).expect("Invalid pattern")).collect()
    })
}

/// What a staging run produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StagingReport {
    /// Files copied from the source tree
    pub copied_files: usize,
    /// Template files laid over the generated `debian/`
    pub overlaid_files: Vec<String>,
    /// dh_make example files removed
    pub removed_examples: Vec<String>,
}

/// Prepares a staging directory
#[derive(Debug, Clone)]
pub struct Stager {
    source_dir: PathBuf,
    template_dir: PathBuf,
    exclude: Vec<Pattern>,
    email: String,
    license: String,
    svn_info_path: Option<PathBuf>,
}

impl Stager {
    /// Copy from `source_dir`, overlay templates from `template_dir`
    pub fn new(
        source_dir: impl Into<PathBuf>,
        template_dir: impl Into<PathBuf>,
        email: impl Into<String>,
        license: impl Into<String>,
    ) -> Self {
        Self {
            source_dir: source_dir.into(),
            template_dir: template_dir.into(),
            exclude: Vec::new(),
            email: email.into(),
            license: license.into(),
            svn_info_path: None,
        }
    }

    /// Top-level names (glob patterns) left out of the copy
    pub fn with_exclude<I, S>(mut self, exclude: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.exclude = exclude
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Pattern::new(pattern).map_err(|e| DebianError::invalid_pattern(pattern, e.msg))
            })
            .collect::<Result<_>>()?;
        Ok(self)
    }

    /// Whether the top-level entry `name` is left out of the copy
    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclude.iter().any(|pattern| pattern.matches(name))
    }

    /// Where `svn info --xml` is written inside the staging tree
    pub fn with_svn_info_path(mut self, path: Option<PathBuf>) -> Self {
        self.svn_info_path = path;
        self
    }

    /// Fill `dest`, which must already exist and be empty
    pub async fn populate(
        &self,
        runner: &dyn CommandRunner,
        dest: &Path,
        revision: &str,
        svn_info: Option<&str>,
    ) -> Result<StagingReport> {
        info!("Staging source tree into {}", dest.display());

        let mut report = StagingReport { copied_files: self.copy_source(dest)?, ..Default::default() };
        self.run_dh_make(runner, dest).await?;
        report.overlaid_files = self.overlay_templates(dest)?;
        report.removed_examples = remove_examples(&dest.join("debian"))?;

        if let (Some(relative), Some(xml)) = (&self.svn_info_path, svn_info) {
            let path = dest.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, xml)?;
            debug!("Wrote {}", path.display());
        }

        fs::write(dest.join("version"), revision)?;

        info!(
            "Staged {} files, {} templates, removed {} examples",
            report.copied_files,
            report.overlaid_files.len(),
            report.removed_examples.len()
        );
        Ok(report)
    }

    /// Copy the source tree into `dest`, skipping excluded top-level entries
    ///
    /// Symbolic links are recreated as links, never followed.
    pub fn copy_source(&self, dest: &Path) -> Result<usize> {
        let dest_canonical = dest.canonicalize()?;
        let mut copied = 0;

        let mut entries: Vec<_> = fs::read_dir(&self.source_dir)
            .map_err(|e| DebianError::staging_failed(&self.source_dir, e.to_string()))?
            .collect::<std::io::Result<_>>()?;
        entries.sort_by_key(|entry| entry.file_name());

        for entry in entries {
            let name = entry.file_name();
            let path = entry.path();
            let target = dest.join(&name);

            if self.is_excluded(&name.to_string_lossy()) {
                debug!("Excluding {}", path.display());
                continue;
            }

            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                copy_symlink(&path, &target)?;
                copied += 1;
            } else if file_type.is_dir() {
                if is_dir_at(&path, &dest_canonical) {
                    continue;
                }
                copied += copy_tree(&path, &target, &dest_canonical)?;
            } else {
                copy_file(&path, &target)?;
                copied += 1;
            }
        }

        Ok(copied)
    }

    async fn run_dh_make(&self, runner: &dyn CommandRunner, dest: &Path) -> Result<()> {
        let invocation = Invocation::new("dh_make")
            .args(["-n", "--single", "-e"])
            .arg(&self.email)
            .arg("-c")
            .arg(&self.license)
            .current_dir(dest)
            .stdin("\n");
        let output = runner.run_checked(&invocation).await?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("dh_make: {line}");
        }
        Ok(())
    }

    /// Copy every template file over the generated `debian/`
    pub fn overlay_templates(&self, dest: &Path) -> Result<Vec<String>> {
        if !self.template_dir.is_dir() {
            warn!("No debian templates at {}, keeping dh_make output", self.template_dir.display());
            return Ok(Vec::new());
        }

        let target = dest.join("debian");
        let mut overlaid = Vec::new();
        for entry in WalkDir::new(&self.template_dir).min_depth(1).sort_by_file_name() {
            let entry = entry?;
            let relative = entry
                .path()
                .strip_prefix(&self.template_dir)
                .map_err(|e| DebianError::staging_failed(entry.path(), e.to_string()))?;
            let target_path = target.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target_path)?;
            } else {
                if let Some(parent) = target_path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target_path)?;
                overlaid.push(relative.to_string_lossy().into_owned());
            }
        }

        Ok(overlaid)
    }
}

/// Copy the directory `source` to `target`, skipping the directory `skip`
fn copy_tree(source: &Path, target: &Path, skip: &Path) -> Result<usize> {
    let mut copied = 0;
    let walker = WalkDir::new(source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !(entry.file_type().is_dir() && is_dir_at(entry.path(), skip)));

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| DebianError::staging_failed(entry.path(), e.to_string()))?;
        let target_path = target.join(relative);

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            copy_symlink(entry.path(), &target_path)?;
            copied += 1;
        } else if file_type.is_dir() {
            fs::create_dir_all(&target_path)?;
        } else {
            copy_file(entry.path(), &target_path)?;
            copied += 1;
        }
    }

    Ok(copied)
}

/// Whether the directory `path` resolves to `canonical`
fn is_dir_at(path: &Path, canonical: &Path) -> bool {
    path.canonicalize().map_or(false, |p| p == canonical)
}

fn copy_file(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(source, target).map_err(|e| {
        DebianError::staging_failed(source, format!("copy to {}: {e}", target.display()))
    })?;
    Ok(())
}

/// Recreate the link at `source` as `target`, pointing at the same place
#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    let link = fs::read_link(source)?;
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    std::os::unix::fs::symlink(&link, target).map_err(|e| {
        DebianError::staging_failed(source, format!("link {} -> {}: {e}", target.display(), link.display()))
    })
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> Result<()> {
    if source.is_dir() {
        copy_tree(source, target, Path::new("")).map(|_| ())
    } else {
        copy_file(source, target)
    }
}

/// Delete dh_make's example templates from `debian_dir`
fn remove_examples(debian_dir: &Path) -> Result<Vec<String>> {
    let mut removed = Vec::new();
    if !debian_dir.is_dir() {
        return Ok(removed);
    }

    for entry in fs::read_dir(debian_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_file() && example_patterns().iter().any(|p| p.matches(&name)) {
            fs::remove_file(entry.path())?;
            removed.push(name);
        }
    }

    removed.sort();
    Ok(removed)
}
