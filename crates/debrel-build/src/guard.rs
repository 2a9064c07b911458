//! Staging directory lifetime

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;

/// Owns a staging directory and removes it when dropped
///
/// Call [`StagingGuard::finish`] on the success path to surface removal
/// errors; any other exit (an error returned with `?`, a panic) removes
/// the directory in `Drop` and only logs a failure.
#[derive(Debug)]
pub struct StagingGuard {
    path: PathBuf,
    armed: bool,
}

impl StagingGuard {
    /// Create an empty directory at `path`, replacing a stale one
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            warn!("Removing stale staging directory {}", path.display());
            std::fs::remove_dir_all(&path)?;
        }
        std::fs::create_dir_all(&path)?;
        info!("Created staging directory {}", path.display());
        Ok(Self { path, armed: true })
    }

    /// Staging directory path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        remove(&self.path)?;
        Ok(())
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        if self.armed {
            debug!("Staging guard dropped for {}", self.path.display());
            if let Err(e) = remove(&self.path) {
                warn!("Failed to remove staging directory {}: {}", self.path.display(), e);
            }
        }
    }
}

fn remove(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => {
            info!("Removed staging directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_finish_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("qstlink2-0.1~precise");

        let guard = StagingGuard::create(&path).unwrap();
        std::fs::write(guard.path().join("version"), "1").unwrap();
        assert!(path.is_dir());

        guard.finish().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_removes_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stage");
        {
            let guard = StagingGuard::create(&path).unwrap();
            std::fs::create_dir_all(guard.path().join("debian")).unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_stale_directory_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stage");
        std::fs::create_dir_all(path.join("old")).unwrap();

        let guard = StagingGuard::create(&path).unwrap();
        assert!(!guard.path().join("old").exists());
    }

    #[test]
    fn test_finish_tolerates_vanished_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("stage");
        let guard = StagingGuard::create(&path).unwrap();
        std::fs::remove_dir_all(&path).unwrap();
        assert!(guard.finish().is_ok());
    }
}
