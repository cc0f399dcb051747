//! Repository identity: the `org/repo` key used for every remote query.
//!
//! [`RepoPath::parse_url`] accepts these shapes:
//!
//! - `https://<host>/<org>/<repo>` (or `http://`, `ssh://`)
//! - any of the above followed by `.git`, a trailing `/`, or more path
//!   segments, e.g. `https://github.com/FreeRTOS/coreMQTT/tree/<sha>`
//! - scp-style `git@<host>:<org>/<repo>.git`
//!
//! Everything else is rejected with a [`RepoPathError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a repository locator could not be turned into a [`RepoPath`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepoPathError {
    #[error("repository locator is empty")]
    Empty,

    #[error("unsupported scheme '{scheme}' in '{input}'")]
    UnsupportedScheme { scheme: String, input: String },

    #[error("no host in '{input}'")]
    MissingHost { input: String },

    #[error("expected <org>/<repo> in '{input}'")]
    MissingSegments { input: String },
}

/// Normalized `org/repo` identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoPath {
    org: String,
    name: String,
}

impl RepoPath {
    pub fn new(org: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            name: name.into(),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse a repository URL (see module docs for the accepted shapes).
    pub fn parse_url(input: &str) -> Result<Self, RepoPathError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(RepoPathError::Empty);
        }

        let path = if let Some((scheme, rest)) = trimmed.split_once("://") {
            if !matches!(scheme, "https" | "http" | "ssh") {
                return Err(RepoPathError::UnsupportedScheme {
                    scheme: scheme.to_string(),
                    input: trimmed.to_string(),
                });
            }
            let (host, path) = rest.split_once('/').unwrap_or((rest, ""));
            if host.is_empty() {
                return Err(RepoPathError::MissingHost {
                    input: trimmed.to_string(),
                });
            }
            path
        } else if let Some((user_host, path)) = trimmed.split_once(':') {
            // scp-style: user@host:org/repo
            let host = user_host.rsplit('@').next().unwrap_or_default();
            if !user_host.contains('@') || host.is_empty() {
                return Err(RepoPathError::MissingHost {
                    input: trimmed.to_string(),
                });
            }
            path
        } else {
            return Err(RepoPathError::MissingHost {
                input: trimmed.to_string(),
            });
        };

        Self::from_segments(path, trimmed, false)
    }

    fn from_segments(path: &str, input: &str, exact: bool) -> Result<Self, RepoPathError> {
        let missing = || RepoPathError::MissingSegments {
            input: input.to_string(),
        };

        let mut segments = path.trim_start_matches('/').trim_end_matches('/').split('/');
        let org = segments.next().ok_or_else(missing)?;
        let name = segments.next().ok_or_else(missing)?;
        let name = name.strip_suffix(".git").unwrap_or(name);

        if exact && segments.next().is_some() {
            return Err(missing());
        }
        let valid = |s: &str| !s.is_empty() && !s.chars().any(char::is_whitespace);
        if !valid(org) || !valid(name) {
            return Err(missing());
        }

        Ok(Self::new(org, name))
    }
}

impl fmt::Display for RepoPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// Parses the bare `org/repo` form.
impl FromStr for RepoPath {
    type Err = RepoPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(RepoPathError::Empty);
        }
        Self::from_segments(trimmed, trimmed, true)
    }
}

impl TryFrom<String> for RepoPath {
    type Error = RepoPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoPath> for String {
    fn from(value: RepoPath) -> Self {
        value.to_string()
    }
}
