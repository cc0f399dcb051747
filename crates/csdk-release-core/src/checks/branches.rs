//! Branch hygiene: only allow-listed branches may exist.

use tracing::{debug, info};

use crate::config::ReleaseTarget;
use crate::error_log::{ErrorKind, ErrorLog};
use crate::github::{Branch, SourceHost};
use crate::repo_path::RepoPath;

/// Names in `branches` that are not in `allowed`, in listing order.
pub fn invalid_branches<'a>(branches: &'a [Branch], allowed: &[&str]) -> Vec<&'a str> {
    branches
        .iter()
        .map(|b| b.name.as_str())
        .filter(|name| !allowed.contains(name))
        .collect()
}

/// Record an `invalid-branch` for every branch outside the repository's
/// allow-list, across all `repos`.
pub async fn check_branches(
    host: &dyn SourceHost,
    repos: &[RepoPath],
    target: &ReleaseTarget,
    log: &mut ErrorLog,
) {
    for repo in repos {
        let allowed = target.allowed_branches(repo);
        let branches = match host.branches(repo).await {
            Ok(branches) => branches,
            Err(e) => {
                log.record(
                    ErrorKind::FailedCheck,
                    repo.to_string(),
                    format!("Could not list the branches of {repo}: {e}."),
                );
                continue;
            }
        };
        debug!(%repo, branches = branches.len(), "listed branches");

        for name in invalid_branches(&branches, &allowed) {
            log.record(
                ErrorKind::InvalidBranch,
                format!("{repo}:{name}"),
                format!(
                    "Invalid branch {name} found in {repo}. Allowed: {}.",
                    allowed.join(", ")
                ),
            );
        }
    }
    info!(repos = repos.len(), "branch checks complete");
}
