//! Debian packaging steps for deb-release
//!
//! This crate turns version-control history into `debian/changelog`
//! stanzas, prepares a staging copy of the source tree with `dh_make`
//! and the project's `debian/` templates, and drives `debuild`,
//! `sbuild` and `dput`.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//!
//! use debrel_core::{PackageVersion, Release, StagingName, SystemRunner};
//! use debrel_debian::{BuildKind, PackageBuilder};
//!
//! let release = Release::parse("precise", &["precise"])?;
//! let name = StagingName::new("qstlink2", PackageVersion::new("0", "412", release)?);
//!
//! let builder = PackageBuilder::new(Path::new("."), 4);
//! let artifacts = builder.build(&SystemRunner, BuildKind::Binary, &name).await?;
//! println!("built {} files", artifacts.len());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod changelog;
pub mod error;
pub mod staging;
pub mod validation;

pub use builder::{required_tools, BuildKind, PackageBuilder, Uploader};
pub use changelog::{
    rewrite_file, rewrite_header, write_changelog, ChangelogMode, ChangelogWriter, RenderedChangelog,
};
pub use error::{DebianError, Result};
pub use staging::{StagingReport, Stager};
pub use validation::{DebianValidator, ValidationResult};
