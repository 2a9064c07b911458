//! Upstream version from a build metadata file
//!
//! Project files such as qmake's `.pro` carry a line like
//! `VERSION = 1.2.0`; the first matching line wins.

use std::path::Path;

use debrel_core::{Error, Result};

/// Read `key` from the file at `path`
pub fn read_version_file(path: &Path, key: &str) -> Result<String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::context(format!("Failed to read {}", path.display()), e))?;

    parse_version_line(&content, key).ok_or_else(|| {
        Error::missing_version(format!("no non-empty {key} line in {}", path.display()))
    })
}

/// Find the value of the first `KEY = value`, `KEY: value` or `KEY value` line
pub fn parse_version_line(content: &str, key: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let line = line.trim();
        if line.starts_with('#') {
            return None;
        }
        let rest = line.strip_prefix(key)?;
        // `VERSIONS = ...` must not match `VERSION`
        if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let rest = rest.trim_start();
        let value = rest
            .strip_prefix("+=")
            .or_else(|| rest.strip_prefix('='))
            .or_else(|| rest.strip_prefix(':'))
            .unwrap_or(rest);
        let value = value.trim().trim_matches('"').trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_qmake_version() {
        let pro = "TEMPLATE = app\n# VERSION = 9.9\nVERSIONS = x\nVERSION = 1.2.0\nVERSION = 2.0\n";
        assert_eq!(parse_version_line(pro, "VERSION").as_deref(), Some("1.2.0"));
    }

    #[test]
    fn test_parse_other_separators() {
        assert_eq!(parse_version_line("version: \"0.3\"\n", "version").as_deref(), Some("0.3"));
        assert_eq!(parse_version_line("VERSION 4\n", "VERSION").as_deref(), Some("4"));
        assert_eq!(parse_version_line("VERSION =\n", "VERSION"), None);
    }

    #[test]
    fn test_read_version_file_missing_key() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("qstlink2.pro");
        std::fs::write(&path, "TARGET = qstlink2\n").unwrap();

        let err = read_version_file(&path, "VERSION").unwrap_err();
        assert!(matches!(err, Error::MissingVersion { .. }));
    }
}
