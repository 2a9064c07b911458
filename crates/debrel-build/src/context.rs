//! Run state and per-release results

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BuildError, Result};

/// Pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    /// Initial state
    Idle,
    /// Determining release and version
    Resolving,
    /// Writing the changelog and staging the tree
    Staging,
    /// Running the package build
    Building,
    /// Sending the source package to the PPA
    Uploading,
    /// Every release finished successfully
    Completed,
    /// At least one release failed
    Failed,
}

/// Result of packaging one release
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    /// Release name
    pub release: String,
    /// Full package version, when it could be resolved
    pub version: Option<String>,
    /// Success status
    pub success: bool,
    /// Error message if failed
    pub error: Option<String>,
    /// Changelog stanzas written
    pub changelog_stanzas: usize,
    /// Log entries dropped while generating the changelog
    pub skipped_log_entries: usize,
    /// Files produced by the build
    pub artifacts: Vec<PathBuf>,
    /// Whether the source package was uploaded
    pub uploaded: bool,
    /// Time spent on this release
    pub duration: Duration,
}

impl ReleaseOutcome {
    /// Empty outcome for `release`
    pub fn new(release: impl Into<String>) -> Self {
        Self {
            release: release.into(),
            version: None,
            success: false,
            error: None,
            changelog_stanzas: 0,
            skipped_log_entries: 0,
            artifacts: Vec::new(),
            uploaded: false,
            duration: Duration::ZERO,
        }
    }
}

/// State of a packaging run over one or more releases
#[derive(Debug, Clone)]
pub struct RunContext {
    state: RunState,
    outcomes: Vec<ReleaseOutcome>,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RunContext {
    /// Create a new run context
    pub fn new() -> Self {
        Self { state: RunState::Idle, outcomes: Vec::new(), start_time: None, end_time: None }
    }

    /// Current state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Move to `state`, stamping start and end times
    pub fn set_state(&mut self, state: RunState) {
        debug!("Run state {:?} -> {:?}", self.state, state);
        self.state = state;

        match state {
            RunState::Resolving if self.start_time.is_none() => {
                self.start_time = Some(Utc::now());
            }
            RunState::Completed | RunState::Failed => {
                self.end_time = Some(Utc::now());
            }
            _ => {}
        }
    }

    /// Record the outcome of one release
    pub fn add_outcome(&mut self, outcome: ReleaseOutcome) {
        self.outcomes.push(outcome);
    }

    /// Outcomes in run order
    pub fn outcomes(&self) -> &[ReleaseOutcome] {
        &self.outcomes
    }

    /// Releases that failed
    pub fn failed_releases(&self) -> Vec<String> {
        self.outcomes.iter().filter(|o| !o.success).map(|o| o.release.clone()).collect()
    }

    /// Whether every recorded release succeeded
    pub fn is_successful(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.success)
    }

    /// Error listing the failed releases, if any
    pub fn ensure_success(&self) -> Result<()> {
        let failed = self.failed_releases();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(BuildError::ReleasesFailed { failed, total: self.outcomes.len() })
        }
    }

    /// Mark the run finished according to its outcomes
    pub fn finish(&mut self) {
        let state = if self.is_successful() { RunState::Completed } else { RunState::Failed };
        self.set_state(state);
    }

    /// Wall-clock duration of the run so far
    pub fn duration(&self) -> Option<Duration> {
        let start = self.start_time?;
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - start).to_std().ok()
    }

    /// Get run summary
    pub fn summary(&self) -> String {
        let built = self.outcomes.iter().filter(|o| o.success).count();
        let duration = self
            .duration()
            .map(|d| format!(" in {:.1}s", d.as_secs_f32()))
            .unwrap_or_default();

        format!(
            "Packaged {}/{} releases successfully{}. {} failed.",
            built,
            self.outcomes.len(),
            duration,
            self.outcomes.len() - built
        )
    }
}
