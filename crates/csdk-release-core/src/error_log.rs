//! Run-scoped accumulation of validation failures.
//!
//! Every check records into one [`ErrorLog`] and keeps going; the verdict is
//! read once at the end. When created with [`ErrorLog::create`] each record is
//! also written as one line to a file that is truncated at creation, so the
//! file always reflects exactly one run.

use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::{ReleaseError, Result};

/// Default name of the error log written next to the working directory.
pub const ERROR_LOG_FILE: &str = "errors.log";

/// Category of a recorded validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorKind {
    /// A manifest version differs from the expected one.
    ManifestMismatch,
    /// A required library appears zero or several times in the manifest.
    MissingDependency,
    /// A commit status, check-run or remote query did not succeed.
    FailedCheck,
    /// The release-candidate branch does not exist.
    MissingBranch,
    /// A CI job's last completed build was not successful.
    CiFailure,
    /// A branch outside the allow-list exists.
    InvalidBranch,
    /// An open pull request targets the release-candidate branch.
    PendingPr,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::ManifestMismatch => "manifest-mismatch",
            ErrorKind::MissingDependency => "missing-dependency",
            ErrorKind::FailedCheck => "failed-check",
            ErrorKind::MissingBranch => "missing-branch",
            ErrorKind::CiFailure => "ci-failure",
            ErrorKind::InvalidBranch => "invalid-branch",
            ErrorKind::PendingPr => "pending-pr",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded failure. Never mutated after it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub kind: ErrorKind,
    /// The offending repository, branch, check, job or pull request.
    pub subject: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]: {}", self.kind, self.subject, self.message)
    }
}

/// Pass/fail outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        *self == Verdict::Pass
    }
}

/// Append-only log of validation failures and non-failing notices.
#[derive(Debug, Default)]
pub struct ErrorLog {
    errors: Vec<ValidationError>,
    notices: Vec<String>,
    sink: Option<(PathBuf, File)>,
}

impl ErrorLog {
    /// A log that only keeps records in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// A log mirrored into `path`, truncating whatever a previous run left there.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).map_err(|source| ReleaseError::ErrorLog {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            sink: Some((path.to_path_buf(), file)),
            ..Self::default()
        })
    }

    /// Record a validation failure.
    pub fn record(&mut self, kind: ErrorKind, subject: impl Into<String>, message: impl Into<String>) {
        let entry = ValidationError {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        error!(kind = %entry.kind, subject = %entry.subject, "{}", entry.message);

        if let Some((path, file)) = self.sink.as_mut() {
            if let Err(e) = writeln!(file, "{entry}").and_then(|_| file.flush()) {
                warn!(path = %path.display(), error = %e, "failed to write error log line");
            }
        }
        self.errors.push(entry);
    }

    /// Keep an informational notice. Notices never affect the verdict.
    pub fn notice(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.notices.push(message);
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Number of recorded errors of one kind.
    pub fn count_of(&self, kind: ErrorKind) -> usize {
        self.errors.iter().filter(|e| e.kind == kind).count()
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.sink.as_ref().map(|(path, _)| path.as_path())
    }

    pub fn verdict(&self) -> Verdict {
        if self.errors.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}
