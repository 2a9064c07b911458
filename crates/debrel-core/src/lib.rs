//! Core types and traits for deb-release
//!
//! This crate provides the version identifiers, release allow-list,
//! error types and the external command seam shared by the other
//! deb-release crates.

pub mod error;
pub mod process;
pub mod release;
pub mod version;

pub use error::{Error, Result};
pub use process::{CommandOutput, CommandRunner, Invocation, SystemRunner};
pub use release::Release;
pub use version::{PackageVersion, StagingName};
