//! Target release names

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Ubuntu series the packaging has historically targeted
pub const DEFAULT_RELEASES: &[&str] = &["oneiric", "precise", "quantal", "raring"];

/// A target distribution release that has been checked against an allow-list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Release(String);

impl Release {
    /// Accept `name` only if it appears in `allowed`
    pub fn parse<S: AsRef<str>>(name: &str, allowed: &[S]) -> Result<Self> {
        let name = name.trim();
        if allowed.iter().any(|r| r.as_ref() == name) {
            Ok(Self(name.to_string()))
        } else {
            Err(Error::UnknownRelease {
                name: name.to_string(),
                allowed: allowed.iter().map(|r| r.as_ref().to_string()).collect(),
            })
        }
    }

    /// Release name, e.g. `precise`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Release {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
