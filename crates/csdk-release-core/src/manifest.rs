//! The aggregator's `manifest.yml` and its validation against `config.yml`.
//!
//! The canonical dependency shape nests the URL under `repository`:
//!
//! ```yaml
//! dependencies:
//!   - name: "coreMQTT"
//!     version: "v1.1.0"
//!     repository:
//!       type: "git"
//!       url: "https://github.com/FreeRTOS/coreMQTT"
//!       path: "libraries/standard/coreMQTT"
//! ```
//!
//! Older manifests carried a bare `url` next to `name`. Those are rejected at
//! load time with a message pointing at the nested form rather than being
//! accepted silently.
//!
//! Versions follow the same rule as `config.yml`: quote them. Bare integers
//! are kept as text and bare decimals are rejected.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{read_yaml, version_string};
use crate::error::{ReleaseError, Result};
use crate::error_log::{ErrorKind, ErrorLog};
use crate::repo_path::RepoPath;

/// Subject used for findings about the manifest as a whole.
const MANIFEST_SUBJECT: &str = "manifest.yml";

/// Where a dependency is released from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRef {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    pub url: String,
    /// Submodule path inside the aggregator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One library tracked by the aggregator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: String,
    pub version: String,
    pub repository: RepositoryRef,
}

impl Dependency {
    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Parsed `manifest.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawManifest")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub version: String,
    pub dependencies: Vec<Dependency>,
}

#[derive(Deserialize)]
struct RawManifest {
    #[serde(default)]
    name: Option<String>,
    #[serde(deserialize_with = "version_string")]
    version: String,
    #[serde(default)]
    dependencies: Vec<RawDependency>,
}

#[derive(Deserialize)]
struct RawDependency {
    name: String,
    #[serde(deserialize_with = "version_string")]
    version: String,
    #[serde(default)]
    repository: Option<RepositoryRef>,
    #[serde(default)]
    url: Option<String>,
}

impl TryFrom<RawManifest> for Manifest {
    type Error = ReleaseError;

    fn try_from(raw: RawManifest) -> Result<Self> {
        let dependencies = raw
            .dependencies
            .into_iter()
            .map(|dep| match (dep.repository, dep.url) {
                (Some(repository), _) => Ok(Dependency {
                    name: dep.name,
                    version: dep.version,
                    repository,
                }),
                (None, Some(url)) => Err(ReleaseError::UnsupportedManifest {
                    dependency: dep.name,
                    reason: format!("bare 'url: {url}' is no longer accepted; use 'repository: {{ url: ... }}'"),
                }),
                (None, None) => Err(ReleaseError::UnsupportedManifest {
                    dependency: dep.name,
                    reason: "missing 'repository.url'".to_string(),
                }),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: raw.name,
            version: raw.version,
            dependencies,
        })
    }
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self> {
        let manifest: Self = read_yaml(path)?;
        debug!(
            path = %path.display(),
            version = %manifest.version,
            dependencies = manifest.dependencies.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// All dependencies whose name matches `name` case-insensitively.
    pub fn find(&self, name: &str) -> Vec<&Dependency> {
        self.dependencies.iter().filter(|d| d.is_named(name)).collect()
    }

    /// Repositories to query: every dependency's repo followed by the
    /// aggregator, de-duplicated in first-seen order. A dependency whose URL
    /// does not parse is recorded and left out.
    pub fn repo_paths(&self, aggregator: &RepoPath, log: &mut ErrorLog) -> Vec<RepoPath> {
        let mut paths: Vec<RepoPath> = Vec::with_capacity(self.dependencies.len() + 1);
        for dep in &self.dependencies {
            match RepoPath::parse_url(&dep.repository.url) {
                Ok(repo) => {
                    if !paths.contains(&repo) {
                        paths.push(repo);
                    }
                }
                Err(e) => log.record(
                    ErrorKind::ManifestMismatch,
                    dep.name.as_str(),
                    format!(
                        "Invalid manifest.yml. Repository URL '{}' for {} is malformed: {}.",
                        dep.repository.url, dep.name, e
                    ),
                ),
            }
        }
        if !paths.contains(aggregator) {
            paths.push(aggregator.clone());
        }
        paths
    }
}

/// Reconcile the manifest against the expected release version and library
/// versions. Every library is checked even after a failure.
pub fn validate_manifest(
    manifest: &Manifest,
    expected_version: &str,
    expected_libraries: &BTreeMap<String, String>,
    log: &mut ErrorLog,
) {
    if manifest.version != expected_version {
        log.record(
            ErrorKind::ManifestMismatch,
            MANIFEST_SUBJECT,
            format!(
                "Invalid manifest.yml. CSDK version {} should be {}.",
                manifest.version, expected_version
            ),
        );
    }

    for (library, expected) in expected_libraries {
        let found = manifest.find(library);
        match found.as_slice() {
            [dep] => {
                if dep.version != *expected {
                    log.record(
                        ErrorKind::ManifestMismatch,
                        dep.name.as_str(),
                        format!(
                            "Invalid manifest.yml. Invalid version {} for {}, expected {}.",
                            dep.version, dep.name, expected
                        ),
                    );
                }
            }
            _ => log.record(
                ErrorKind::MissingDependency,
                library.as_str(),
                format!(
                    "Invalid manifest.yml. Found {} occurrences of required library {}.",
                    found.len(),
                    library
                ),
            ),
        }
    }
}
