//! `debian/changelog` generation and in-place rewriting

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use debrel_core::{PackageVersion, Release};
use debrel_vcs::LogEntry;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::{DebianError, Result};

/// Date layout of a changelog trailer, e.g. `Sat, 20 Apr 2013 18:02:11 +0000`
const TRAILER_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

/// How the changelog is produced for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangelogMode {
    /// Regenerate from the version-control log
    #[default]
    Generate,
    /// Leave the template changelog untouched
    Skip,
    /// Edit the newest stanza header to the new version and release
    Rewrite,
}

impl FromStr for ChangelogMode {
    type Err = DebianError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "generate" => Ok(Self::Generate),
            "skip" => Ok(Self::Skip),
            "rewrite" => Ok(Self::Rewrite),
            _ => Err(DebianError::UnknownVariant {
                what: "changelog mode",
                value: s.to_string(),
                expected: "generate, skip, rewrite",
            }),
        }
    }
}

impl fmt::Display for ChangelogMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Generate => "generate",
            Self::Skip => "skip",
            Self::Rewrite => "rewrite",
        })
    }
}

/// Formats log entries as changelog stanzas
#[derive(Debug, Clone)]
pub struct ChangelogWriter {
    package: String,
    upstream: String,
    urgency: String,
    maintainer: String,
}

impl ChangelogWriter {
    /// `maintainer` is the full `Name <email>` used in every trailer
    pub fn new(
        package: impl Into<String>,
        upstream: impl Into<String>,
        urgency: impl Into<String>,
        maintainer: impl Into<String>,
    ) -> Self {
        Self {
            package: package.into(),
            upstream: upstream.into(),
            urgency: urgency.into(),
            maintainer: maintainer.into(),
        }
    }

    /// One stanza for `entry`
    ///
    /// The trailer always names the configured maintainer, never the
    /// commit author.
    pub fn stanza(&self, release: &Release, entry: &LogEntry) -> Result<String> {
        let version =
            PackageVersion::new(&self.upstream, entry.revision.to_string(), release.clone())?;
        let body = entry.message.replace('\n', "\n    ");

        Ok(format!(
            "{package} ({version}) {release}; urgency={urgency}\n\n  * {body}\n -- {maintainer}  {date}\n\n",
            package = self.package,
            urgency = self.urgency,
            maintainer = self.maintainer,
            date = entry.date.format(TRAILER_DATE_FORMAT),
        ))
    }

    /// Changelog text for `entries`, newest revision first
    ///
    /// An entry that cannot be formatted, or repeats a revision already
    /// written, is logged and left out.
    pub fn render(&self, release: &Release, entries: &[LogEntry]) -> RenderedChangelog {
        let mut sorted: Vec<&LogEntry> = entries.iter().collect();
        sorted.sort_by(|a, b| b.revision.cmp(&a.revision));

        let mut rendered = RenderedChangelog::default();
        let mut previous = None;
        for entry in sorted {
            if previous == Some(entry.revision) {
                warn!("Dropping duplicate r{} from changelog", entry.revision);
                continue;
            }
            previous = Some(entry.revision);

            match self.stanza(release, entry) {
                Ok(stanza) => {
                    rendered.text.push_str(&stanza);
                    rendered.stanzas += 1;
                }
                Err(e) => warn!("Dropping r{} from changelog: {e}", entry.revision),
            }
        }
        rendered
    }
}

/// Output of [`ChangelogWriter::render`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedChangelog {
    /// Concatenated stanzas
    pub text: String,
    /// Number of stanzas in `text`
    pub stanzas: usize,
}

impl RenderedChangelog {
    /// Whether no stanza was written
    pub fn is_empty(&self) -> bool {
        self.stanzas == 0
    }
}

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<package>[a-z0-9][a-z0-9+.-]*) \((?P<version>[^)]+)\) (?P<dists>[^;]+);(?P<rest>.*)$")
            .expect("Invalid regex")
    })
}

/// Replace the newest stanza header of `text` with `version` for `package`
///
/// The body and trailer are kept, so an existing entry is re-targeted at
/// another release without regenerating it.
pub fn rewrite_header(
    text: &str,
    package: &str,
    version: &PackageVersion,
    urgency: &str,
) -> std::result::Result<String, String> {
    let mut lines: Vec<&str> = text.split_inclusive('\n').collect();
    let index = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .ok_or_else(|| "changelog is empty".to_string())?;

    let header = lines[index].trim_end();
    if !header_regex().is_match(header) {
        return Err(format!("first line is not a changelog header: {header}"));
    }

    let replacement =
        format!("{package} ({version}) {release}; urgency={urgency}\n", release = version.release);
    debug!("Rewriting changelog header '{header}' to '{}'", replacement.trim_end());
    lines[index] = &replacement;

    Ok(lines.concat())
}

/// Rewrite the header of the changelog file at `path` in place
pub fn rewrite_file(path: &Path, package: &str, version: &PackageVersion, urgency: &str) -> Result<()> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| DebianError::invalid_changelog(path, format!("cannot read: {e}")))?;
    let updated = rewrite_header(&text, package, version, urgency)
        .map_err(|reason| DebianError::invalid_changelog(path, reason))?;
    std::fs::write(path, updated)?;
    info!("Rewrote {} for {version}", path.display());
    Ok(())
}

/// Write changelog `text` to `path`, creating parent directories
pub fn write_changelog(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    info!("Wrote {}", path.display());
    Ok(())
}
