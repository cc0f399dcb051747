//! In-memory fakes for the remote traits (testing only)
//!
//! `MemorySourceHost` and `MemoryCiServer` answer from maps filled through
//! builder methods. Anything not configured behaves the way the real service
//! does for a resource that does not exist.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::config::ReleaseTarget;
use crate::error::{ApiError, ApiResult};
use crate::github::{Branch, CheckRun, CombinedStatus, ContentEntry, PullRequest, SourceHost};
use crate::jenkins::{BuildInfo, CiServer};
use crate::repo_path::RepoPath;

fn key(repo: &RepoPath, rest: &str) -> String {
    format!("{repo}|{rest}")
}

fn not_found(what: String) -> ApiError {
    ApiError::NotFound {
        url: format!("memory://{what}"),
    }
}

// ---------------------------------------------------------------------------
// MemorySourceHost
// ---------------------------------------------------------------------------

/// In-memory source host.
///
/// Unconfigured lookups: directories and entries are `Ok(None)`, statuses and
/// branch lists are `NotFound`, check-runs and pull requests are empty.
#[derive(Debug, Default, Clone)]
pub struct MemorySourceHost {
    directories: HashMap<String, Vec<ContentEntry>>,
    entries: HashMap<String, ContentEntry>,
    statuses: HashMap<String, CombinedStatus>,
    check_runs: HashMap<String, Vec<CheckRun>>,
    branches: HashMap<String, Vec<Branch>>,
    pulls: HashMap<String, Vec<PullRequest>>,
    failing: HashSet<String>,
}

impl MemorySourceHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `dir` exist (possibly empty) on `git_ref`.
    pub fn with_directory(mut self, repo: &RepoPath, dir: &str, git_ref: &str) -> Self {
        self.directories
            .entry(key(repo, &format!("{dir}@{git_ref}")))
            .or_default();
        self
    }

    fn add_entry(&mut self, repo: &RepoPath, dir: &str, git_ref: &str, entry: ContentEntry) {
        let listed = ContentEntry {
            // Directory listings report submodules as plain files.
            kind: "file".to_string(),
            ..entry.clone()
        };
        self.directories
            .entry(key(repo, &format!("{dir}@{git_ref}")))
            .or_default()
            .push(listed);
        self.entries
            .insert(key(repo, &format!("{}@{git_ref}", entry.path)), entry);
    }

    /// Pin `library` at `sha` as a submodule under `dir` on the aggregator's
    /// release-candidate branch.
    pub fn with_library(
        mut self,
        target: &ReleaseTarget,
        dir: &str,
        library: &RepoPath,
        sha: &str,
    ) -> Self {
        let entry = ContentEntry {
            name: library.name().to_string(),
            path: format!("{dir}/{}", library.name()),
            sha: Some(sha.to_string()),
            kind: "submodule".to_string(),
            html_url: Some(format!(
                "{}/{}/tree/{}",
                target.github_web_url.trim_end_matches('/'),
                library,
                sha
            )),
        };
        self.add_entry(
            &target.aggregator,
            dir,
            &target.release_candidate_branch,
            entry,
        );
        self
    }

    /// Add a regular file `name` under `dir`.
    pub fn with_file(mut self, repo: &RepoPath, dir: &str, name: &str, git_ref: &str) -> Self {
        let entry = ContentEntry {
            name: name.to_string(),
            path: format!("{dir}/{name}"),
            sha: Some("0000000000000000000000000000000000000000".to_string()),
            kind: "file".to_string(),
            html_url: None,
        };
        self.add_entry(repo, dir, git_ref, entry);
        self
    }

    /// List `name` under `dir` without an entry behind it, as when the tree
    /// moves between the listing and the lookup.
    pub fn with_listing(mut self, repo: &RepoPath, dir: &str, name: &str, git_ref: &str) -> Self {
        self.directories
            .entry(key(repo, &format!("{dir}@{git_ref}")))
            .or_default()
            .push(ContentEntry {
                name: name.to_string(),
                path: format!("{dir}/{name}"),
                sha: None,
                kind: "file".to_string(),
                html_url: None,
            });
        self
    }

    /// Add a raw entry, e.g. a submodule with a missing sha.
    pub fn with_entry(mut self, repo: &RepoPath, dir: &str, git_ref: &str, entry: ContentEntry) -> Self {
        self.add_entry(repo, dir, git_ref, entry);
        self
    }

    pub fn with_status(mut self, repo: &RepoPath, git_ref: &str, state: &str) -> Self {
        self.statuses.insert(
            key(repo, git_ref),
            CombinedStatus {
                state: state.to_string(),
                total_count: 1,
            },
        );
        self
    }

    /// `(name, conclusion)` pairs; a `None` conclusion is an in-progress run.
    pub fn with_check_runs(
        mut self,
        repo: &RepoPath,
        git_ref: &str,
        runs: &[(&str, Option<&str>)],
    ) -> Self {
        let runs = runs
            .iter()
            .map(|(name, conclusion)| CheckRun {
                name: name.to_string(),
                status: Some(
                    match conclusion {
                        Some(_) => "completed",
                        None => "in_progress",
                    }
                    .to_string(),
                ),
                conclusion: conclusion.map(str::to_string),
                html_url: None,
            })
            .collect();
        self.check_runs.insert(key(repo, git_ref), runs);
        self
    }

    pub fn with_branches(mut self, repo: &RepoPath, names: &[&str]) -> Self {
        let branches = names
            .iter()
            .map(|name| Branch {
                name: name.to_string(),
            })
            .collect();
        self.branches.insert(repo.to_string(), branches);
        self
    }

    pub fn with_pull_requests(mut self, repo: &RepoPath, base: &str, prs: Vec<PullRequest>) -> Self {
        self.pulls.insert(key(repo, base), prs);
        self
    }

    /// Every call about `repo` fails with HTTP 500.
    pub fn with_failing_repo(mut self, repo: &RepoPath) -> Self {
        self.failing.insert(repo.to_string());
        self
    }

    fn check_reachable(&self, repo: &RepoPath) -> ApiResult<()> {
        if self.failing.contains(&repo.to_string()) {
            return Err(ApiError::UnexpectedStatus {
                status: 500,
                url: format!("memory://{repo}"),
            });
        }
        Ok(())
    }
}

/// An open pull request with predictable URLs.
pub fn pull_request(repo: &RepoPath, number: u64, title: &str) -> PullRequest {
    PullRequest {
        number,
        title: title.to_string(),
        url: format!("https://api.github.com/repos/{repo}/pulls/{number}"),
        html_url: format!("https://github.com/{repo}/pull/{number}"),
    }
}

#[async_trait]
impl SourceHost for MemorySourceHost {
    async fn list_directory(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<Vec<ContentEntry>>> {
        self.check_reachable(repo)?;
        Ok(self
            .directories
            .get(&key(repo, &format!("{path}@{git_ref}")))
            .cloned())
    }

    async fn get_entry(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<ContentEntry>> {
        self.check_reachable(repo)?;
        Ok(self
            .entries
            .get(&key(repo, &format!("{path}@{git_ref}")))
            .cloned())
    }

    async fn combined_status(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<CombinedStatus> {
        self.check_reachable(repo)?;
        self.statuses
            .get(&key(repo, git_ref))
            .cloned()
            .ok_or_else(|| not_found(format!("{repo}/commits/{git_ref}/status")))
    }

    async fn check_runs(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<Vec<CheckRun>> {
        self.check_reachable(repo)?;
        Ok(self
            .check_runs
            .get(&key(repo, git_ref))
            .cloned()
            .unwrap_or_default())
    }

    async fn branches(&self, repo: &RepoPath) -> ApiResult<Vec<Branch>> {
        self.check_reachable(repo)?;
        self.branches
            .get(&repo.to_string())
            .cloned()
            .ok_or_else(|| not_found(format!("{repo}/branches")))
    }

    async fn open_pull_requests(&self, repo: &RepoPath, base: &str) -> ApiResult<Vec<PullRequest>> {
        self.check_reachable(repo)?;
        Ok(self.pulls.get(&key(repo, base)).cloned().unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// MemoryCiServer
// ---------------------------------------------------------------------------

/// In-memory CI server. Unknown jobs are `NotFound`.
#[derive(Debug, Clone)]
pub struct MemoryCiServer {
    base_url: String,
    builds: HashMap<String, BuildInfo>,
}

impl Default for MemoryCiServer {
    fn default() -> Self {
        Self {
            base_url: "https://ci.example.com".to_string(),
            builds: HashMap::new(),
        }
    }
}

impl MemoryCiServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the last completed build result of `job_path`; `None` is in progress.
    pub fn with_build(mut self, job_path: &str, result: Option<&str>) -> Self {
        let number = self.builds.len() as u64 + 1;
        self.builds.insert(
            job_path.to_string(),
            BuildInfo {
                result: result.map(str::to_string),
                number: Some(number),
                url: Some(format!("{}/{job_path}/{number}/", self.base_url)),
            },
        );
        self
    }

    /// Every job in `jobs` last completed with `SUCCESS`.
    pub fn all_passing(jobs: &[String]) -> Self {
        jobs.iter()
            .fold(Self::new(), |ci, job| ci.with_build(job, Some("SUCCESS")))
    }
}

#[async_trait]
impl CiServer for MemoryCiServer {
    async fn last_completed_build(&self, job_path: &str) -> ApiResult<BuildInfo> {
        self.builds
            .get(job_path)
            .cloned()
            .ok_or_else(|| not_found(format!("{}/lastCompletedBuild", self.job_url(job_path))))
    }

    fn job_url(&self, job_path: &str) -> String {
        format!("{}/{}", self.base_url, job_path)
    }
}
