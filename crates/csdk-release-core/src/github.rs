//! Source-hosting API access (GitHub REST v3, read-only).
//!
//! [`SourceHost`] is the seam the checks are written against; [`GitHubClient`]
//! is the real implementation and `fakes::MemorySourceHost` the test one.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ApiError, ApiResult, ReleaseError, Result};
use crate::repo_path::RepoPath;

/// Page size requested from list endpoints (GitHub's maximum).
const PER_PAGE: usize = 100;

/// Upper bound on pages fetched from one list endpoint.
const MAX_PAGES: usize = 50;

/// Conclusion/state string GitHub uses for a passing result.
pub const SUCCESS: &str = "success";

/// One entry of a repository contents response.
///
/// For a submodule, `sha` is the pinned commit and `html_url` points at the
/// submodule repository's tree at that commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub sha: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub html_url: Option<String>,
}

/// Combined commit status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedStatus {
    /// `success`, `failure`, `pending` or `error`.
    pub state: String,
    #[serde(default)]
    pub total_count: u64,
}

impl CombinedStatus {
    pub fn is_success(&self) -> bool {
        self.state == SUCCESS
    }
}

/// A single named check-run attached to a commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRun {
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    /// `None` while the run is still in progress.
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
}

impl CheckRun {
    pub fn is_success(&self) -> bool {
        self.conclusion.as_deref() == Some(SUCCESS)
    }
}

#[derive(Debug, Deserialize)]
struct CheckRunPage {
    total_count: usize,
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// API URL of the pull request.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub html_url: String,
}

/// Read-only view of the source-hosting service.
#[async_trait]
pub trait SourceHost: Send + Sync {
    /// List a directory at `git_ref`. `Ok(None)` when the path or ref does not exist.
    async fn list_directory(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<Vec<ContentEntry>>>;

    /// Fetch a single entry at `git_ref`. `Ok(None)` when it does not exist.
    async fn get_entry(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<ContentEntry>>;

    /// Combined status of a commit sha or branch name.
    async fn combined_status(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<CombinedStatus>;

    /// All check-runs of a commit sha or branch name.
    async fn check_runs(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<Vec<CheckRun>>;

    /// Every branch of the repository.
    async fn branches(&self, repo: &RepoPath) -> ApiResult<Vec<Branch>>;

    /// Open pull requests whose base branch is `base`.
    async fn open_pull_requests(&self, repo: &RepoPath, base: &str) -> ApiResult<Vec<PullRequest>>;
}

/// HTTP implementation of [`SourceHost`] against the GitHub REST API.
///
/// Repository names, paths and refs are percent-encoded as path segments and
/// query values, so branch names with reserved characters reach the API intact.
pub struct GitHubClient {
    api_url: Url,
    http: reqwest::Client,
}

impl GitHubClient {
    /// Build a client authenticating every request with `token` as a bearer token.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let client_error = |detail: String| ReleaseError::Client {
            service: "GitHub".to_string(),
            detail,
        };

        let api_url = Url::parse(api_url)
            .map_err(|e| client_error(format!("invalid API URL '{api_url}': {e}")))?;
        if api_url.cannot_be_a_base() {
            return Err(client_error(format!("API URL '{api_url}' cannot carry a path")));
        }

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| client_error(format!("invalid access token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );

        let http = reqwest::Client::builder()
            .user_agent(format!("csdk-release-verify/{}", crate::VERSION))
            .default_headers(headers)
            .build()
            .map_err(|e| client_error(e.to_string()))?;

        Ok(Self { api_url, http })
    }

    /// `{api}/repos/{org}/{repo}/{segments..}` with every segment encoded.
    fn repo_url(&self, repo: &RepoPath, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("{} cannot carry a path", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", repo.org(), repo.name()])
            .extend(segments);
        Ok(url)
    }

    /// Contents endpoint for `path` at `git_ref`.
    fn contents_url(&self, repo: &RepoPath, path: &str, git_ref: &str) -> ApiResult<Url> {
        let mut segments = vec!["contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        let mut url = self.repo_url(repo, &segments)?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        Ok(url)
    }

    /// GET and decode; a 404 is `Ok(None)`.
    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<Option<T>> {
        debug!(%url, "GET");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|e| ApiError::Decode {
                url: url.to_string(),
                detail: e.to_string(),
            })
    }

    /// GET where a 404 is an error.
    async fn get_required<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<T> {
        self.get_json(url).await?.ok_or_else(|| ApiError::NotFound {
            url: url.to_string(),
        })
    }

    /// Follow `page=` pagination of an endpoint returning a JSON array.
    async fn get_paged<T: DeserializeOwned>(&self, url: &Url) -> ApiResult<Vec<T>> {
        let mut items = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: Vec<T> = self.get_required(&paged_url(url, page)).await?;
            let len = batch.len();
            items.extend(batch);
            if len < PER_PAGE {
                break;
            }
        }
        Ok(items)
    }
}

fn paged_url(url: &Url, page: usize) -> Url {
    let mut url = url.clone();
    url.query_pairs_mut()
        .append_pair("per_page", &PER_PAGE.to_string())
        .append_pair("page", &page.to_string());
    url
}

#[async_trait]
impl SourceHost for GitHubClient {
    async fn list_directory(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<Vec<ContentEntry>>> {
        let url = self.contents_url(repo, path, git_ref)?;
        self.get_json(&url).await
    }

    async fn get_entry(
        &self,
        repo: &RepoPath,
        path: &str,
        git_ref: &str,
    ) -> ApiResult<Option<ContentEntry>> {
        let url = self.contents_url(repo, path, git_ref)?;
        self.get_json(&url).await
    }

    async fn combined_status(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<CombinedStatus> {
        let url = self.repo_url(repo, &["commits", git_ref, "status"])?;
        self.get_required(&url).await
    }

    async fn check_runs(&self, repo: &RepoPath, git_ref: &str) -> ApiResult<Vec<CheckRun>> {
        let url = self.repo_url(repo, &["commits", git_ref, "check-runs"])?;
        let mut runs = Vec::new();
        for page in 1..=MAX_PAGES {
            let batch: CheckRunPage = self.get_required(&paged_url(&url, page)).await?;
            let len = batch.check_runs.len();
            runs.extend(batch.check_runs);
            if len < PER_PAGE || runs.len() >= batch.total_count {
                break;
            }
        }
        Ok(runs)
    }

    async fn branches(&self, repo: &RepoPath) -> ApiResult<Vec<Branch>> {
        let url = self.repo_url(repo, &["branches"])?;
        self.get_paged(&url).await
    }

    async fn open_pull_requests(&self, repo: &RepoPath, base: &str) -> ApiResult<Vec<PullRequest>> {
        let mut url = self.repo_url(repo, &["pulls"])?;
        url.query_pairs_mut()
            .append_pair("state", "open")
            .append_pair("base", base);
        self.get_paged(&url).await
    }
}
