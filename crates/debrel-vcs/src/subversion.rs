//! Subversion client driven through a [`CommandRunner`]

use std::path::Path;

use debrel_core::{CommandRunner, Error, Invocation, Result};
use tracing::{debug, info};

use crate::log::{parse_info_revision, parse_log, LogParse};

/// Head revision and the document it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionInfo {
    /// Working copy revision
    pub revision: String,
    /// Raw `svn info --xml` output
    pub xml: String,
}

/// Runs `svn` queries against a working copy
pub struct Subversion<'a> {
    runner: &'a dyn CommandRunner,
    program: String,
}

impl<'a> Subversion<'a> {
    /// Create a client using `svn` from `PATH`
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner, program: "svn".to_string() }
    }

    /// Use a different `svn` executable
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Raw `svn info --xml` output for `path`
    pub async fn info_xml(&self, path: &Path) -> Result<String> {
        let invocation = Invocation::new(&self.program)
            .arg("info")
            .arg(path.to_string_lossy())
            .arg("--xml");
        let output = self.runner.run_checked(&invocation).await?;
        Ok(output.stdout)
    }

    /// Revision of the working copy at `path`
    pub async fn head_revision(&self, path: &Path) -> Result<String> {
        Ok(self.revision_info(path).await?.revision)
    }

    /// Revision of the working copy at `path` along with the `svn info` document
    pub async fn revision_info(&self, path: &Path) -> Result<RevisionInfo> {
        let xml = self.info_xml(path).await.map_err(|e| match e {
            Error::CommandFailed { stderr, .. } => Error::missing_revision(stderr.trim().to_string()),
            other => other,
        })?;
        let revision = parse_info_revision(&xml)?;
        info!("Last revision: {revision}");
        Ok(RevisionInfo { revision, xml })
    }

    /// The `limit` most recent log entries for `path`
    pub async fn log(&self, path: &Path, limit: usize) -> Result<LogParse> {
        info!("Building changelog file from svn logs");
        let invocation = Invocation::new(&self.program)
            .arg("log")
            .arg(path.to_string_lossy())
            .args(["--limit".to_string(), limit.to_string(), "--xml".to_string()]);
        let output = self.runner.run_checked(&invocation).await?;
        let parsed = parse_log(&output.stdout)?;
        debug!("svn log returned {} usable entries", parsed.entries.len());
        Ok(parsed)
    }
}
