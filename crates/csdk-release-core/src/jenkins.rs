//! CI server access (Jenkins JSON API, read-only).

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult, ReleaseError, Result};

/// `result` value Jenkins reports for a passing build.
pub const BUILD_SUCCESS: &str = "SUCCESS";

/// Subset of Jenkins' build JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// `SUCCESS`, `FAILURE`, `UNSTABLE`, `ABORTED`, or null while running.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub number: Option<u64>,
    #[serde(default)]
    pub url: Option<String>,
}

impl BuildInfo {
    pub fn is_success(&self) -> bool {
        self.result.as_deref() == Some(BUILD_SUCCESS)
    }
}

/// Read-only view of the CI server.
#[async_trait]
pub trait CiServer: Send + Sync {
    /// Latest completed build of the job at `job_path` (e.g. `job/csdk/job/nightly`).
    async fn last_completed_build(&self, job_path: &str) -> ApiResult<BuildInfo>;

    /// Human-facing URL of a job, used to tag findings.
    fn job_url(&self, job_path: &str) -> String;
}

/// HTTP implementation of [`CiServer`] using basic auth.
pub struct JenkinsClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl JenkinsClient {
    /// `verify_tls = false` accepts any server certificate, for hosts whose CA
    /// is not in the local trust store.
    pub fn new(base_url: &str, username: &str, password: &str, verify_tls: bool) -> Result<Self> {
        if !verify_tls {
            warn!(%base_url, "TLS certificate verification disabled for the CI server");
        }
        let http = reqwest::Client::builder()
            .user_agent(format!("csdk-release-verify/{}", crate::VERSION))
            .danger_accept_invalid_certs(!verify_tls)
            .build()
            .map_err(|e| ReleaseError::Client {
                service: "Jenkins".to_string(),
                detail: e.to_string(),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            username: username.to_string(),
            password: password.to_string(),
            http,
        })
    }

    fn build_api_url(&self, job_path: &str) -> String {
        format!("{}/lastCompletedBuild/api/json", self.job_url(job_path))
    }
}

#[async_trait]
impl CiServer for JenkinsClient {
    async fn last_completed_build(&self, job_path: &str) -> ApiResult<BuildInfo> {
        let url = self.build_api_url(job_path);
        debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound { url });
        }
        if !status.is_success() {
            return Err(ApiError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::Decode {
            url,
            detail: e.to_string(),
        })
    }

    fn job_url(&self, job_path: &str) -> String {
        format!("{}/{}", self.base_url, job_path.trim_matches('/'))
    }
}
