//! Commit status and check-run verification.
//!
//! Libraries are checked at the commit the aggregator pins on the
//! release-candidate branch, found by walking the configured library
//! directories through the contents API. The aggregator itself is checked at
//! the head of the release-candidate branch.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ReleaseTarget;
use crate::error_log::{ErrorKind, ErrorLog};
use crate::github::SourceHost;
use crate::repo_path::RepoPath;

/// Documentation links of one pinned library, for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LibraryDocs {
    pub repo: RepoPath,
    pub commit: String,
    pub readme_url: String,
    pub changelog_url: String,
}

impl LibraryDocs {
    pub fn new(web_url: &str, repo: RepoPath, commit: &str) -> Self {
        let blob = format!("{}/{}/blob/{}", web_url.trim_end_matches('/'), repo, commit);
        Self {
            readme_url: format!("{blob}/README.md"),
            changelog_url: format!("{blob}/CHANGELOG.md"),
            repo,
            commit: commit.to_string(),
        }
    }
}

/// Verify status and check-runs for every pinned library and for the
/// aggregator's release-candidate branch. Returns the libraries that were
/// resolved, for the documentation review.
///
/// A missing release-candidate branch is recorded once and ends the check.
pub async fn check_statuses(
    host: &dyn SourceHost,
    target: &ReleaseTarget,
    log: &mut ErrorLog,
) -> Vec<LibraryDocs> {
    let aggregator = &target.aggregator;
    let rc = target.release_candidate_branch.as_str();
    let mut libraries = Vec::new();

    for dir in &target.library_dirs {
        let entries = match host.list_directory(aggregator, dir, rc).await {
            Ok(Some(entries)) => entries,
            Ok(None) => {
                log.record(
                    ErrorKind::MissingBranch,
                    format!("{aggregator}:{rc}"),
                    format!(
                        "The {rc} branch does not exist in {aggregator}. Please create the {rc} branch."
                    ),
                );
                return libraries;
            }
            Err(e) => {
                log.record(
                    ErrorKind::FailedCheck,
                    format!("{aggregator}/{dir}"),
                    format!("Could not list {dir} on {rc} in {aggregator}: {e}."),
                );
                continue;
            }
        };
        debug!(%dir, entries = entries.len(), "listed library directory");

        for entry in entries {
            let path = format!("{dir}/{}", entry.name);
            if let Some(docs) = check_library(host, target, &path, log).await {
                libraries.push(docs);
            }
        }
    }

    check_commit(host, aggregator, rc, &format!("{aggregator}@{rc}"), log).await;
    info!(libraries = libraries.len(), "status checks complete");
    libraries
}

async fn check_library(
    host: &dyn SourceHost,
    target: &ReleaseTarget,
    path: &str,
    log: &mut ErrorLog,
) -> Option<LibraryDocs> {
    let aggregator = &target.aggregator;
    let rc = target.release_candidate_branch.as_str();
    let subject = format!("{aggregator}/{path}");

    let entry = match host.get_entry(aggregator, path, rc).await {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            log.record(
                ErrorKind::FailedCheck,
                subject,
                format!("{path} disappeared from {rc} in {aggregator} while it was being checked."),
            );
            return None;
        }
        Err(e) => {
            log.record(
                ErrorKind::FailedCheck,
                subject,
                format!("Could not fetch {path} on {rc} in {aggregator}: {e}."),
            );
            return None;
        }
    };

    // Plain files and directories next to the submodules are not libraries.
    if entry.kind != "submodule" {
        debug!(%path, kind = %entry.kind, "skipping non-submodule entry");
        return None;
    }

    let (Some(sha), Some(html_url)) = (entry.sha.as_deref(), entry.html_url.as_deref()) else {
        log.record(
            ErrorKind::FailedCheck,
            subject,
            format!("Submodule {path} has no pinned commit or html_url on {rc}."),
        );
        return None;
    };

    let repo = match RepoPath::parse_url(html_url) {
        Ok(repo) => repo,
        Err(e) => {
            log.record(
                ErrorKind::FailedCheck,
                subject,
                format!("Cannot derive the repository of submodule {path} from {html_url}: {e}."),
            );
            return None;
        }
    };

    check_commit(host, &repo, sha, html_url, log).await;
    Some(LibraryDocs::new(&target.github_web_url, repo, sha))
}

/// Record a failure for a non-success combined status and for every
/// non-success check-run of `git_ref`.
async fn check_commit(
    host: &dyn SourceHost,
    repo: &RepoPath,
    git_ref: &str,
    label: &str,
    log: &mut ErrorLog,
) {
    match host.combined_status(repo, git_ref).await {
        Ok(status) if status.is_success() => {}
        Ok(status) => log.record(
            ErrorKind::FailedCheck,
            repo.to_string(),
            format!("The commit status checks are '{}' for {label}.", status.state),
        ),
        Err(e) => log.record(
            ErrorKind::FailedCheck,
            repo.to_string(),
            format!("Could not fetch the commit status for {label}: {e}."),
        ),
    }

    match host.check_runs(repo, git_ref).await {
        Ok(runs) => {
            debug!(%repo, %git_ref, runs = runs.len(), "fetched check-runs");
            for run in runs.iter().filter(|run| !run.is_success()) {
                log.record(
                    ErrorKind::FailedCheck,
                    format!("{repo}:{}", run.name),
                    format!(
                        "The {} check concluded '{}' for {label}.",
                        run.name,
                        run.conclusion.as_deref().unwrap_or("in progress")
                    ),
                );
            }
        }
        Err(e) => log.record(
            ErrorKind::FailedCheck,
            repo.to_string(),
            format!("Could not fetch the check-runs for {label}: {e}."),
        ),
    }
}
