//! Configuration management for deb-release
//!
//! This crate handles YAML configuration parsing, defaults, validation,
//! and environment variable substitution in paths.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use debrel_core::error::{Error, Result};
use debrel_core::release::DEFAULT_RELEASES;
use debrel_core::Release;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "debrel.yaml";

/// Urgency values accepted in a changelog header
const URGENCIES: &[&str] = &["low", "medium", "high", "emergency", "critical"];

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Source package name
    pub package_name: String,

    /// Maintainer written into every changelog trailer and passed to dh_make
    pub maintainer: Maintainer,

    /// Releases a package may be built for
    pub releases: Vec<String>,

    /// Upload target for dput
    pub ppa: String,

    /// Root of the tree to package
    pub source_dir: PathBuf,

    /// Directory holding the `debian/` templates
    pub packaging_dir: PathBuf,

    /// Directory the staging tree and build artifacts are created in
    pub work_dir: PathBuf,

    /// Upstream part of the version when no version file is configured
    pub upstream_version: String,

    /// Build metadata file to read the upstream version from
    pub version_file: Option<VersionFile>,

    /// Top-level entries of `source_dir` left out of the staging copy
    pub exclude: Vec<String>,

    /// Parallel jobs handed to debuild and sbuild
    pub parallel_jobs: usize,

    /// Number of log entries turned into changelog stanzas
    pub log_limit: usize,

    /// Changelog urgency
    pub urgency: String,

    /// License name handed to dh_make
    pub license: String,

    /// Where `svn info --xml` is written inside the staging tree
    pub svn_info_path: Option<PathBuf>,
}

/// Changelog maintainer identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Maintainer {
    /// Full name
    pub name: String,

    /// E-mail address, must match the signing key
    pub email: String,
}

/// A `KEY = value` line in a build metadata file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionFile {
    /// File path, relative paths resolve against `source_dir`
    pub path: PathBuf,

    /// Key whose value is the version
    #[serde(default = "default_version_key")]
    pub key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package_name: "qstlink2".to_string(),
            maintainer: Maintainer {
                name: "Fabien Poussin".to_string(),
                email: "fabien.poussin@gmail.com".to_string(),
            },
            releases: DEFAULT_RELEASES.iter().map(|r| r.to_string()).collect(),
            ppa: "ppa:mobyfab/qstlink2".to_string(),
            source_dir: PathBuf::from(".."),
            packaging_dir: PathBuf::from("."),
            work_dir: PathBuf::from("."),
            upstream_version: "0".to_string(),
            version_file: None,
            exclude: vec!["package".to_string(), "*.pro.user*".to_string()],
            parallel_jobs: 4,
            log_limit: 10,
            urgency: "medium".to_string(),
            license: "gpl3".to_string(),
            svn_info_path: Some(PathBuf::from("res/svn-info.xml")),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::context(format!("Failed to read config file {}", path.display()), e)
        })?;

        Self::from_yaml(&content)
    }

    /// Load configuration from `path`, or use defaults when the file does not exist
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            debug!("No config file at {}, using defaults", path.display());
            let mut config = Self::default();
            config.expand_env_vars()?;
            config.validate()?;
            Ok(config)
        }
    }

    /// Parse, expand and validate YAML content
    pub fn from_yaml(content: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(content)
            .map_err(|e| Error::context("Failed to parse YAML", e))?;

        config.expand_env_vars()?;
        config.validate()?;

        Ok(config)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::context("Failed to serialize config", e))
    }

    /// Expand environment variables in paths
    fn expand_env_vars(&mut self) -> Result<()> {
        self.source_dir = expand_path(&self.source_dir)?;
        self.packaging_dir = expand_path(&self.packaging_dir)?;
        self.work_dir = expand_path(&self.work_dir)?;

        if let Some(version_file) = &mut self.version_file {
            version_file.path = expand_path(&version_file.path)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.package_name.trim().is_empty() {
            return Err(config_error("package_name cannot be empty"));
        }

        if self.releases.is_empty() {
            return Err(config_error("at least one release must be allowed"));
        }

        if self.maintainer.name.trim().is_empty() {
            return Err(config_error("maintainer name cannot be empty"));
        }

        if !self.maintainer.email.contains('@') {
            return Err(config_error(format!(
                "maintainer email is not an address: {}",
                self.maintainer.email
            )));
        }

        if self.parallel_jobs == 0 {
            return Err(config_error("parallel_jobs must be at least 1"));
        }

        if self.log_limit == 0 {
            return Err(config_error("log_limit must be at least 1"));
        }

        if !URGENCIES.contains(&self.urgency.as_str()) {
            return Err(config_error(format!(
                "urgency must be one of {}, got {}",
                URGENCIES.join(", "),
                self.urgency
            )));
        }

        for pattern in &self.exclude {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(config_error(format!("invalid exclude pattern '{pattern}': {}", e.msg)));
            }
        }

        if self.upstream_version.trim().is_empty() && self.version_file.is_none() {
            return Err(config_error("upstream_version cannot be empty"));
        }

        Ok(())
    }

    /// Check `name` against the configured releases
    pub fn release(&self, name: &str) -> Result<Release> {
        Release::parse(name, &self.releases)
    }

    /// Every configured release, in order
    pub fn all_releases(&self) -> Result<Vec<Release>> {
        self.releases.iter().map(|name| self.release(name)).collect()
    }

    /// `Name <email>` as used in changelog trailers
    pub fn maintainer_line(&self) -> String {
        format!("{} <{}>", self.maintainer.name, self.maintainer.email)
    }

    /// Template `debian/` directory
    pub fn template_debian_dir(&self) -> PathBuf {
        self.packaging_dir.join("debian")
    }

    /// Resolved path of the version file, if any
    pub fn version_file_path(&self) -> Option<PathBuf> {
        self.version_file.as_ref().map(|vf| {
            if vf.path.is_absolute() {
                vf.path.clone()
            } else {
                self.source_dir.join(&vf.path)
            }
        })
    }
}

fn config_error(message: impl Into<String>) -> Error {
    Error::parse(format!("Configuration error: {}", message.into()))
}

fn default_version_key() -> String {
    "VERSION".to_string()
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("Invalid regex")
    })
}

/// Expand environment variables in a path
fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();

    let mut result = path_str.to_string();
    for cap in env_var_regex().captures_iter(&path_str) {
        let Some(var) = cap.get(1).or_else(|| cap.get(2)) else {
            continue;
        };
        let var_name = var.as_str();
        let var_value = std::env::var(var_name).map_err(|_| {
            config_error(format!("Environment variable not found: {var_name}"))
        })?;

        result = result.replace(&cap[0], &var_value);
    }

    Ok(PathBuf::from(result))
}
