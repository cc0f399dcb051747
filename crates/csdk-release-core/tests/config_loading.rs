//! Loading config.yml and manifest.yml from a CSDK checkout on disk.

use std::fs;
use std::path::Path;

use csdk_release_core::config::{config_path, manifest_path};
use csdk_release_core::{Credentials, Manifest, ReleaseConfig, ReleaseError, RepoPath};

const CONFIG: &str = r#"
csdk_version: "202012.00"
versions:
  coremqtt: "v1.1.0"
  corehttp: "v1.0.0"
github_access_token: "file-token"
jenkins_username: "release-bot"
jenkins_password: "hunter2"
"#;

const MANIFEST: &str = r#"
name: aws-iot-device-sdk-embedded-c
version: "202012.00"
dependencies:
  - name: "coreMQTT"
    version: "v1.1.0"
    repository:
      type: "git"
      url: "https://github.com/FreeRTOS/coreMQTT"
      path: "libraries/standard/coreMQTT"
  - name: "coreHTTP"
    version: "v1.0.0"
    repository:
      type: "git"
      url: "https://github.com/FreeRTOS/coreHTTP.git"
      path: "libraries/standard/coreHTTP"
"#;

fn write_checkout(root: &Path, config: &str, manifest: &str) {
    fs::create_dir_all(root.join("tools/release")).unwrap();
    fs::write(config_path(root), config).unwrap();
    fs::write(manifest_path(root), manifest).unwrap();
}

#[test]
fn loads_checkout_with_default_target() {
    let dir = tempfile::tempdir().unwrap();
    write_checkout(dir.path(), CONFIG, MANIFEST);

    let config = ReleaseConfig::load(&config_path(dir.path())).unwrap();
    let manifest = Manifest::load(&manifest_path(dir.path())).unwrap();

    assert_eq!(config.csdk_version, "202012.00");
    assert_eq!(config.versions["corehttp"], "v1.0.0");
    assert_eq!(
        config.target.aggregator,
        RepoPath::new("aws", "aws-iot-device-sdk-embedded-c")
    );
    assert_eq!(manifest.dependencies.len(), 2);
    assert_eq!(manifest.find("COREHTTP").len(), 1);
}

#[test]
fn target_block_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = format!(
        "{CONFIG}target:\n  aggregator: example/sdk\n  release_candidate_branch: rc\n  ci_jobs: [job/sdk]\n"
    );
    write_checkout(dir.path(), &config, MANIFEST);

    let config = ReleaseConfig::load(&config_path(dir.path())).unwrap();

    assert_eq!(config.target.aggregator, RepoPath::new("example", "sdk"));
    assert_eq!(config.target.release_candidate_branch, "rc");
    assert_eq!(config.target.ci_jobs, vec!["job/sdk".to_string()]);
    assert_eq!(config.target.default_branch, "master");
}

#[test]
fn malformed_aggregator_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = format!("{CONFIG}target:\n  aggregator: not-a-repo\n");
    write_checkout(dir.path(), &config, MANIFEST);

    let err = ReleaseConfig::load(&config_path(dir.path())).unwrap_err();
    assert!(matches!(err, ReleaseError::Parse { .. }), "{err}");
}

#[test]
fn missing_config_is_a_read_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReleaseConfig::load(&config_path(dir.path())).unwrap_err();
    assert!(matches!(err, ReleaseError::Read { .. }));
    assert!(err.to_string().contains("config.yml"));
}

#[test]
fn bare_url_manifest_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = r#"
version: "202012.00"
dependencies:
  - name: "coreMQTT"
    version: "v1.1.0"
    url: "https://github.com/FreeRTOS/coreMQTT"
"#;
    write_checkout(dir.path(), CONFIG, manifest);

    let err = Manifest::load(&manifest_path(dir.path())).unwrap_err();
    assert!(err.to_string().contains("repository"), "{err}");
}

#[test]
fn file_credentials_are_used_when_env_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_checkout(dir.path(), CONFIG, MANIFEST);
    let config = ReleaseConfig::load(&config_path(dir.path())).unwrap();

    let creds = Credentials::resolve(&config, &|_| Some(String::new()), true).unwrap();

    assert_eq!(creds.github_token, "file-token");
    assert_eq!(creds.jenkins_username, "release-bot");
    assert!(!creds.verify_ci_tls);
    assert!(!format!("{creds:?}").contains("hunter2"));
}
