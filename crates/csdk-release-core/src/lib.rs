//! CSDK release verification library.
//!
//! Validates the aggregator manifest against the expected library versions
//! and checks commit statuses, CI jobs, branch hygiene and pending pull
//! requests across every repository of the release. Failures accumulate in an
//! [`ErrorLog`]; only configuration problems abort a run.

pub mod checks;
pub mod config;
pub mod docs_review;
pub mod error;
pub mod error_log;
pub mod fakes;
pub mod github;
pub mod jenkins;
pub mod manifest;
pub mod repo_path;
pub mod telemetry;
pub mod verifier;

pub use checks::LibraryDocs;
pub use config::{Credentials, ReleaseConfig, ReleaseTarget};
pub use docs_review::{render_docs_review, write_docs_review};
pub use error::{ApiError, ApiResult, ReleaseError, Result};
pub use error_log::{ErrorKind, ErrorLog, ValidationError, Verdict, ERROR_LOG_FILE};
pub use github::{GitHubClient, SourceHost};
pub use jenkins::{CiServer, JenkinsClient};
pub use manifest::{validate_manifest, Dependency, Manifest};
pub use repo_path::{RepoPath, RepoPathError};
pub use verifier::{ReleaseVerifier, VerificationReport};

/// Crate version, reported in the HTTP user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
