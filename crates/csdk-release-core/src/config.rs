//! Release configuration: `tools/release/config.yml` plus credential resolution.
//!
//! Credentials resolve through fixed layers, first hit wins:
//!
//! 1. a non-empty environment variable (`GITHUB_ACCESS_TOKEN`,
//!    `JENKINS_USERNAME`, `JENKINS_PASSWORD`)
//! 2. a non-empty value in the config file
//!
//! Nothing found is a fatal [`ReleaseError::MissingSetting`].
//!
//! Version values are compared as written, so they should be quoted. Bare
//! integers (`csdk_version: 4`) are accepted and kept as text; a bare decimal
//! such as `202012.00` is a YAML float whose trailing zeros are already gone
//! when it is read, and is rejected as a parse error.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

use crate::error::{ReleaseError, Result};
use crate::repo_path::RepoPath;

/// Location of the release config relative to the CSDK root.
pub const CONFIG_RELATIVE_PATH: &str = "tools/release/config.yml";

/// Location of the manifest relative to the CSDK root.
pub const MANIFEST_FILE: &str = "manifest.yml";

pub const GITHUB_TOKEN_ENV: &str = "GITHUB_ACCESS_TOKEN";
pub const JENKINS_USERNAME_ENV: &str = "JENKINS_USERNAME";
pub const JENKINS_PASSWORD_ENV: &str = "JENKINS_PASSWORD";

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_RELATIVE_PATH)
}

pub fn manifest_path(root: &Path) -> PathBuf {
    root.join(MANIFEST_FILE)
}

/// Read and deserialize a YAML document.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|source| ReleaseError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ReleaseError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// A version as it may appear in YAML.
#[derive(Deserialize)]
#[serde(untagged)]
enum VersionScalar {
    Text(String),
    Integer(u64),
    Float(f64),
}

impl VersionScalar {
    fn into_text<E: de::Error>(self) -> std::result::Result<String, E> {
        match self {
            VersionScalar::Text(text) => Ok(text),
            VersionScalar::Integer(n) => Ok(n.to_string()),
            VersionScalar::Float(f) => Err(E::custom(format!(
                "unquoted version {f} was read as a number and may have lost digits; quote it"
            ))),
        }
    }
}

/// Deserialize a version string, accepting bare integers.
pub(crate) fn version_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    VersionScalar::deserialize(deserializer)?.into_text()
}

fn version_map<'de, D>(deserializer: D) -> std::result::Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, VersionScalar>::deserialize(deserializer)?
        .into_iter()
        .map(|(library, version)| Ok((library, version.into_text::<D::Error>()?)))
        .collect()
}

/// Contents of `config.yml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseConfig {
    /// Version the aggregator manifest must declare.
    #[serde(deserialize_with = "version_string")]
    pub csdk_version: String,
    /// Required library name → expected version.
    #[serde(deserialize_with = "version_map")]
    pub versions: BTreeMap<String, String>,
    #[serde(default)]
    pub github_access_token: Option<String>,
    #[serde(default)]
    pub jenkins_username: Option<String>,
    #[serde(default)]
    pub jenkins_password: Option<String>,
    #[serde(default)]
    pub disable_jenkins_server_verify: bool,
    #[serde(default)]
    pub target: ReleaseTarget,
}

impl ReleaseConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let config: Self = read_yaml(path)?;
        debug!(
            path = %path.display(),
            libraries = config.versions.len(),
            "loaded release config"
        );
        Ok(config)
    }
}

/// Where the release lives: repositories, branches and CI jobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReleaseTarget {
    /// The aggregator repository that tracks every library as a submodule.
    pub aggregator: RepoPath,
    pub github_api_url: String,
    pub github_web_url: String,
    pub default_branch: String,
    pub deprecated_branch: String,
    pub release_candidate_branch: String,
    /// Aggregator directories whose entries are library submodules.
    pub library_dirs: Vec<String>,
    pub jenkins_url: String,
    /// Jenkins job paths, relative to `jenkins_url`.
    pub ci_jobs: Vec<String>,
}

impl Default for ReleaseTarget {
    fn default() -> Self {
        Self {
            aggregator: RepoPath::new("aws", "aws-iot-device-sdk-embedded-c"),
            github_api_url: "https://api.github.com".to_string(),
            github_web_url: "https://github.com".to_string(),
            default_branch: "master".to_string(),
            deprecated_branch: "v4_beta_deprecated".to_string(),
            release_candidate_branch: "release-candidate".to_string(),
            library_dirs: vec!["libraries/aws".to_string(), "libraries/standard".to_string()],
            jenkins_url: "https://amazon-freertos-ci.corp.amazon.com".to_string(),
            ci_jobs: vec![
                "job/csdk/job/demo_pipeline".to_string(),
                "job/csdk/job/nightly".to_string(),
            ],
        }
    }
}

impl ReleaseTarget {
    /// Branches allowed to exist on `repo`.
    pub fn allowed_branches(&self, repo: &RepoPath) -> Vec<&str> {
        let mut allowed = vec![self.default_branch.as_str()];
        if *repo == self.aggregator {
            allowed.push(self.deprecated_branch.as_str());
            allowed.push(self.release_candidate_branch.as_str());
        }
        allowed
    }
}

/// Resolve one setting from the environment, then the config file.
pub fn resolve_setting(
    key: &str,
    env_var: &str,
    file_value: Option<&str>,
    env: &dyn Fn(&str) -> Option<String>,
) -> Result<String> {
    let non_empty = |v: &str| !v.trim().is_empty();

    if let Some(value) = env(env_var).filter(|v| non_empty(v.as_str())) {
        debug!(key, source = "env", "resolved setting");
        return Ok(value);
    }
    if let Some(value) = file_value.filter(|v| non_empty(*v)) {
        debug!(key, source = "config", "resolved setting");
        return Ok(value.to_string());
    }
    Err(ReleaseError::MissingSetting {
        key: key.to_string(),
        env_var: env_var.to_string(),
    })
}

/// Resolved secrets for the remote services.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub github_token: String,
    pub jenkins_username: String,
    pub jenkins_password: String,
    pub verify_ci_tls: bool,
}

impl Credentials {
    /// Resolve every credential. `disable_ci_tls_verify` comes from the CLI and
    /// is OR-ed with the config toggle.
    pub fn resolve(
        config: &ReleaseConfig,
        env: &dyn Fn(&str) -> Option<String>,
        disable_ci_tls_verify: bool,
    ) -> Result<Self> {
        Ok(Self {
            github_token: resolve_setting(
                "github_access_token",
                GITHUB_TOKEN_ENV,
                config.github_access_token.as_deref(),
                env,
            )?,
            jenkins_username: resolve_setting(
                "jenkins_username",
                JENKINS_USERNAME_ENV,
                config.jenkins_username.as_deref(),
                env,
            )?,
            jenkins_password: resolve_setting(
                "jenkins_password",
                JENKINS_PASSWORD_ENV,
                config.jenkins_password.as_deref(),
                env,
            )?,
            verify_ci_tls: !(config.disable_jenkins_server_verify || disable_ci_tls_verify),
        })
    }

    /// Resolve against the process environment.
    pub fn from_env(config: &ReleaseConfig, disable_ci_tls_verify: bool) -> Result<Self> {
        Self::resolve(config, &|key| std::env::var(key).ok(), disable_ci_tls_verify)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("github_token", &"<redacted>")
            .field("jenkins_username", &self.jenkins_username)
            .field("jenkins_password", &"<redacted>")
            .field("verify_ci_tls", &self.verify_ci_tls)
            .finish()
    }
}
