//! End-to-end verification runs against in-memory GitHub and Jenkins.

use std::collections::BTreeMap;
use std::sync::Arc;

use csdk_release_core::fakes::{pull_request, MemoryCiServer, MemorySourceHost};
use csdk_release_core::manifest::RepositoryRef;
use csdk_release_core::{
    Dependency, ErrorKind, ErrorLog, Manifest, ReleaseConfig, ReleaseTarget, ReleaseVerifier,
    RepoPath, Verdict,
};

const SHA: &str = "5b4d3e2f1a0b9c8d7e6f5a4b3c2d1e0f9a8b7c6d";
const RC: &str = "release-candidate";

fn core_mqtt() -> RepoPath {
    RepoPath::new("FreeRTOS", "coreMQTT")
}

fn config(coremqtt: &str) -> ReleaseConfig {
    ReleaseConfig {
        csdk_version: "4.0.0".to_string(),
        versions: BTreeMap::from([("coremqtt".to_string(), coremqtt.to_string())]),
        github_access_token: None,
        jenkins_username: None,
        jenkins_password: None,
        disable_jenkins_server_verify: false,
        target: ReleaseTarget::default(),
    }
}

fn manifest() -> Manifest {
    Manifest {
        name: Some("aws-iot-device-sdk-embedded-c".to_string()),
        version: "4.0.0".to_string(),
        dependencies: vec![Dependency {
            name: "coreMQTT".to_string(),
            version: "1.2.0".to_string(),
            repository: RepositoryRef {
                kind: Some("git".to_string()),
                url: "https://github.com/FreeRTOS/coreMQTT".to_string(),
                path: Some("libraries/standard/coreMQTT".to_string()),
            },
        }],
    }
}

/// Everything remote is green.
fn green_host(target: &ReleaseTarget) -> MemorySourceHost {
    MemorySourceHost::new()
        .with_directory(&target.aggregator, "libraries/aws", RC)
        .with_library(target, "libraries/standard", &core_mqtt(), SHA)
        .with_status(&core_mqtt(), SHA, "success")
        .with_check_runs(&core_mqtt(), SHA, &[("unittest", Some("success"))])
        .with_status(&target.aggregator, RC, "success")
        .with_branches(&core_mqtt(), &["master"])
        .with_branches(&target.aggregator, &["master", RC])
}

fn verifier(host: MemorySourceHost, ci: MemoryCiServer) -> ReleaseVerifier {
    ReleaseVerifier::new(Arc::new(host), Arc::new(ci), ReleaseTarget::default())
}

#[tokio::test]
async fn green_release_passes() {
    let target = ReleaseTarget::default();
    let verifier = verifier(green_host(&target), MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.2.0"), &manifest(), &mut log).await;

    assert_eq!(report.error_count, 0, "{:?}", report.errors);
    assert_eq!(report.verdict, Verdict::Pass);
    assert_eq!(report.libraries.len(), 1);
    assert_eq!(report.libraries[0].commit, SHA);
    // No open pull requests is only a notice.
    assert_eq!(report.notices.len(), 1);
    assert_eq!(
        report.summary_line("errors.log"),
        "All release verification passed."
    );
}

#[tokio::test]
async fn library_version_mismatch_fails() {
    let target = ReleaseTarget::default();
    let verifier = verifier(green_host(&target), MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.3.0"), &manifest(), &mut log).await;

    assert_eq!(report.verdict, Verdict::Fail);
    assert_eq!(report.error_count, 1);
    let err = &report.errors[0];
    assert_eq!(err.kind, ErrorKind::ManifestMismatch);
    assert!(err.message.contains("1.2.0"));
    assert!(err.message.contains("1.3.0"));
}

#[tokio::test]
async fn stray_branch_fails() {
    let target = ReleaseTarget::default();
    let host = green_host(&target).with_branches(&core_mqtt(), &["master", "feature-x"]);
    let verifier = verifier(host, MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.2.0"), &manifest(), &mut log).await;

    assert_eq!(report.error_count, 1);
    assert_eq!(report.errors[0].kind, ErrorKind::InvalidBranch);
    assert!(report.errors[0].message.contains("feature-x"));
}

#[tokio::test]
async fn every_kind_of_failure_is_accumulated() {
    let target = ReleaseTarget::default();
    let host = green_host(&target)
        .with_check_runs(&core_mqtt(), SHA, &[("complexity", Some("failure"))])
        .with_branches(&target.aggregator, &["master", RC, "hotfix"])
        .with_pull_requests(
            &target.aggregator,
            RC,
            vec![pull_request(&target.aggregator, 1300, "Update coreMQTT")],
        );
    let ci = MemoryCiServer::new()
        .with_build("job/csdk/job/demo_pipeline", Some("SUCCESS"))
        .with_build("job/csdk/job/nightly", Some("UNSTABLE"));
    let verifier = verifier(host, ci);
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.3.0"), &manifest(), &mut log).await;

    let kinds: Vec<ErrorKind> = report.errors.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ErrorKind::ManifestMismatch,
            ErrorKind::FailedCheck,
            ErrorKind::CiFailure,
            ErrorKind::InvalidBranch,
            ErrorKind::PendingPr,
        ]
    );
    assert!(report.notices.is_empty());
    assert_eq!(
        report.summary_line("errors.log"),
        "Release verification failed with 5 error(s); see errors.log."
    );
}

#[tokio::test]
async fn missing_release_candidate_branch_is_reported() {
    let target = ReleaseTarget::default();
    let host = MemorySourceHost::new()
        .with_branches(&core_mqtt(), &["master"])
        .with_branches(&target.aggregator, &["master"]);
    let verifier = verifier(host, MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.2.0"), &manifest(), &mut log).await;

    assert_eq!(report.error_count, 1);
    assert_eq!(report.errors[0].kind, ErrorKind::MissingBranch);
    assert!(report.libraries.is_empty());
}

#[tokio::test]
async fn error_log_file_mirrors_every_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("errors.log");
    std::fs::write(&path, "left over from a previous run\n").unwrap();

    let target = ReleaseTarget::default();
    let host = green_host(&target).with_branches(&core_mqtt(), &["master", "feature-x"]);
    let verifier = verifier(host, MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::create(&path).unwrap();

    verifier.verify(&config("1.3.0"), &manifest(), &mut log).await;
    drop(log);

    let written = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("manifest-mismatch [coreMQTT]: "));
    assert!(lines[1].starts_with("invalid-branch [FreeRTOS/coreMQTT:feature-x]: "));
}

#[tokio::test]
async fn report_round_trips_through_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    let target = ReleaseTarget::default();
    let verifier = verifier(green_host(&target), MemoryCiServer::all_passing(&target.ci_jobs));
    let mut log = ErrorLog::in_memory();

    let report = verifier.verify(&config("1.2.0"), &manifest(), &mut log).await;
    report.write_json(&path).unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["verdict"], "pass");
    assert_eq!(raw["libraries"][0]["repo"], "FreeRTOS/coreMQTT");
}
