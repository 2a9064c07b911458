//! Release pipeline for deb-release
//!
//! This crate runs the packaging steps for one or every configured
//! release: resolve the version, update the changelog, stage the tree,
//! build, upload and clean up.

pub mod context;
pub mod error;
pub mod guard;
pub mod pipeline;

pub use context::{ReleaseOutcome, RunContext, RunState};
pub use error::{BuildError, Result};
pub use guard::StagingGuard;
pub use pipeline::{PackageRequest, ReleasePipeline, ResolvedVersion};
