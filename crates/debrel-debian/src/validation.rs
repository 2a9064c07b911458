//! Sanity checks on a staged `debian/` directory

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DebianError, Result};

/// Required files in a debian directory
const REQUIRED_FILES: &[&str] = &["control", "changelog", "copyright", "rules"];

/// Fields every binary stanza in `debian/control` needs
const CONTROL_FIELDS: &[&str] = &["Source", "Package", "Architecture", "Maintainer", "Description"];

/// Debian directory validator
#[derive(Debug, Default)]
pub struct DebianValidator {
    /// Missing files are errors rather than findings
    strict_mode: bool,
}

impl DebianValidator {
    /// Create a new validator
    pub fn new(strict_mode: bool) -> Self {
        Self { strict_mode }
    }

    /// Validate a debian directory
    pub fn validate_debian_directory(
        &self,
        debian_dir: &Path,
        package_name: &str,
    ) -> Result<ValidationResult> {
        if !debian_dir.is_dir() {
            return Err(DebianError::missing_required_file(package_name, "debian directory"));
        }

        let mut result = ValidationResult::default();

        for &required_file in REQUIRED_FILES {
            let file_path = debian_dir.join(required_file);
            if !file_path.exists() {
                if self.strict_mode {
                    return Err(DebianError::missing_required_file(package_name, required_file));
                }
                result.missing_files.push(required_file.to_string());
                continue;
            }

            result.found_files.push(required_file.to_string());
            let content = fs::read_to_string(&file_path)?;
            match required_file {
                "control" => validate_control(&content, &mut result.warnings),
                "changelog" => result.warnings.extend(validate_changelog(&content, package_name)),
                "rules" => validate_rules(&file_path, &content, &mut result.warnings)?,
                _ => {}
            }
        }

        let format_file = debian_dir.join("source").join("format");
        if format_file.exists() {
            let format = fs::read_to_string(&format_file)?;
            if format.trim() != "3.0 (native)" {
                result
                    .warnings
                    .push(format!("Native version used with source format {}", format.trim()));
            }
        }

        result.is_valid = result.missing_files.is_empty();
        debug!("Validated {}: {}", debian_dir.display(), result.summary());
        Ok(result)
    }
}

/// Findings for changelog `content` of `package_name`
pub fn validate_changelog(content: &str, package_name: &str) -> Vec<String> {
    let mut warnings = Vec::new();

    if content.trim().is_empty() {
        warnings.push("Changelog file is empty".to_string());
        return warnings;
    }

    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if !first_line.starts_with(&format!("{package_name} (")) {
        warnings.push(format!("Changelog doesn't start with a {package_name} entry"));
    }
    if !first_line.contains("urgency=") {
        warnings.push("Changelog header has no urgency".to_string());
    }

    let headers = content.lines().filter(|l| !l.starts_with(' ') && l.contains(") ")).count();
    let trailers = content.lines().filter(|l| l.starts_with(" -- ")).count();
    if trailers == 0 {
        warnings.push("Changelog missing proper signature line".to_string());
    } else if trailers != headers {
        warnings.push(format!("Changelog has {headers} headers but {trailers} signature lines"));
    }

    warnings
}

fn validate_control(content: &str, warnings: &mut Vec<String>) {
    for field in CONTROL_FIELDS {
        if !content.lines().any(|l| l.starts_with(&format!("{field}:"))) {
            warnings.push(format!("Missing required field in control: {field}"));
        }
    }
}

fn validate_rules(rules_path: &Path, content: &str, warnings: &mut Vec<String>) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if fs::metadata(rules_path)?.permissions().mode() & 0o111 == 0 {
            warnings.push("Rules file is not executable".to_string());
        }
    }
    #[cfg(not(unix))]
    let _ = rules_path;

    if !content.starts_with("#!") {
        warnings.push("Rules file missing shebang".to_string());
    }

    Ok(())
}

/// Result of debian directory validation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Whether every required file is present
    pub is_valid: bool,
    /// Files that were found
    pub found_files: Vec<String>,
    /// Files that are missing
    pub missing_files: Vec<String>,
    /// Validation warnings
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Check if validation passed without warnings
    pub fn is_clean(&self) -> bool {
        self.is_valid && self.warnings.is_empty()
    }

    /// Get summary of validation
    pub fn summary(&self) -> String {
        format!(
            "Valid: {}, Found: {}, Missing: {}, Warnings: {}",
            self.is_valid,
            self.found_files.len(),
            self.missing_files.len(),
            self.warnings.len()
        )
    }
}
