//! Parsing of `svn log --xml` and `svn info --xml`

use chrono::{DateTime, FixedOffset};
use debrel_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
enum XmlError {
    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("Invalid UTF-8 in XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// One revision from the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Revision number
    pub revision: u64,
    /// Committer, if recorded
    pub author: Option<String>,
    /// Commit time
    pub date: DateTime<FixedOffset>,
    /// Commit message, trimmed
    pub message: String,
}

/// Outcome of parsing a log document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogParse {
    /// Well-formed entries in document order
    pub entries: Vec<LogEntry>,
    /// Entries dropped because a field was missing or malformed
    pub skipped: usize,
}

/// Fields collected while inside one `<logentry>`
#[derive(Debug, Default)]
struct RawEntry {
    revision: Option<String>,
    author: Option<String>,
    date: Option<String>,
    msg: Option<String>,
}

impl RawEntry {
    fn field_mut(&mut self, element: &str) -> Option<&mut Option<String>> {
        match element {
            "author" => Some(&mut self.author),
            "date" => Some(&mut self.date),
            "msg" => Some(&mut self.msg),
            _ => None,
        }
    }

    fn into_entry(self) -> std::result::Result<LogEntry, String> {
        let revision = self.revision.ok_or("missing revision attribute")?;
        let revision = revision
            .trim()
            .parse::<u64>()
            .map_err(|e| format!("revision '{revision}' is not a number: {e}"))?;

        let date = self.date.ok_or_else(|| format!("r{revision} has no date"))?;
        let date = DateTime::parse_from_rfc3339(date.trim())
            .map_err(|e| format!("r{revision} has unparsable date '{}': {e}", date.trim()))?;

        let message = self
            .msg
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .ok_or_else(|| format!("r{revision} has an empty message"))?;

        let author = self.author.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());

        Ok(LogEntry { revision, author, date, message })
    }
}

/// Parse `svn log --xml` output
///
/// Malformed entries are logged and counted in [`LogParse::skipped`]
/// instead of failing the whole document.
pub fn parse_log(xml: &str) -> Result<LogParse> {
    parse_log_internal(xml).map_err(|e| Error::parse(format!("svn log: {e}")))
}

fn parse_log_internal(xml: &str) -> std::result::Result<LogParse, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    let mut parsed = LogParse::default();
    let mut current: Option<RawEntry> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name_bytes = e.name();
                let name = std::str::from_utf8(name_bytes.as_ref())?;
                if name == "logentry" {
                    current = Some(RawEntry { revision: revision_attr(e)?, ..Default::default() });
                } else {
                    current_element = name.to_string();
                }
            }
            Ok(Event::Empty(ref e)) => {
                let name_bytes = e.name();
                if name_bytes.as_ref() == b"logentry" {
                    let entry = RawEntry { revision: revision_attr(e)?, ..Default::default() };
                    finish_entry(entry, &mut parsed);
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(field) =
                    current.as_mut().and_then(|entry| entry.field_mut(&current_element))
                {
                    let text = e.unescape()?;
                    field.get_or_insert_with(String::new).push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(field) =
                    current.as_mut().and_then(|entry| entry.field_mut(&current_element))
                {
                    let text = std::str::from_utf8(&e)?;
                    field.get_or_insert_with(String::new).push_str(text);
                }
            }
            Ok(Event::End(ref e)) => {
                let name_bytes = e.name();
                if name_bytes.as_ref() == b"logentry" {
                    if let Some(entry) = current.take() {
                        finish_entry(entry, &mut parsed);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    debug!("Parsed {} log entries, skipped {}", parsed.entries.len(), parsed.skipped);
    Ok(parsed)
}

fn finish_entry(entry: RawEntry, parsed: &mut LogParse) {
    match entry.into_entry() {
        Ok(entry) => parsed.entries.push(entry),
        Err(reason) => {
            warn!("Skipping log entry: {reason}");
            parsed.skipped += 1;
        }
    }
}

fn revision_attr(e: &BytesStart) -> std::result::Result<Option<String>, XmlError> {
    match e.try_get_attribute("revision")? {
        Some(attr) => Ok(Some(attr.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

/// Extract `entry@revision` from `svn info --xml` output
pub fn parse_info_revision(xml: &str) -> Result<String> {
    let revision = parse_info_internal(xml).map_err(|e| Error::parse(format!("svn info: {e}")))?;
    match revision {
        Some(revision) if !revision.trim().is_empty() => Ok(revision.trim().to_string()),
        _ => Err(Error::missing_revision("svn info reported no entry revision")),
    }
}

fn parse_info_internal(xml: &str) -> std::result::Result<Option<String>, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => {
                if e.name().as_ref() == b"entry" {
                    return revision_attr(e);
                }
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
}
