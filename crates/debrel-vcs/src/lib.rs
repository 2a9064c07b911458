//! Version-control queries for deb-release
//!
//! This crate reads the head revision and recent log entries from
//! Subversion's XML output, and the upstream version from a build
//! metadata file.

pub mod log;
pub mod subversion;
pub mod version_file;

pub use log::{parse_info_revision, parse_log, LogEntry, LogParse};
pub use subversion::{RevisionInfo, Subversion};
pub use version_file::{parse_version_line, read_version_file};
