//! Runs every release check in order and turns the error log into a report.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};

use crate::checks::{
    check_branches, check_ci_jobs, check_pending_pulls, check_statuses, LibraryDocs,
};
use crate::config::{ReleaseConfig, ReleaseTarget};
use crate::error::Result;
use crate::error_log::{ErrorLog, ValidationError, Verdict};
use crate::github::SourceHost;
use crate::jenkins::CiServer;
use crate::manifest::{validate_manifest, Manifest};

/// Outcome of one verification run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub error_count: usize,
    pub errors: Vec<ValidationError>,
    pub notices: Vec<String>,
    pub libraries: Vec<LibraryDocs>,
    pub generated_at: DateTime<Utc>,
}

impl VerificationReport {
    pub fn from_log(log: &ErrorLog, libraries: Vec<LibraryDocs>) -> Self {
        Self {
            verdict: log.verdict(),
            error_count: log.error_count(),
            errors: log.errors().to_vec(),
            notices: log.notices().to_vec(),
            libraries,
            generated_at: Utc::now(),
        }
    }

    /// The closing line printed for the operator.
    pub fn summary_line(&self, error_log: &str) -> String {
        match self.verdict {
            Verdict::Pass => "All release verification passed.".to_string(),
            Verdict::Fail => format!(
                "Release verification failed with {} error(s); see {error_log}.",
                self.error_count
            ),
        }
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &std::path::Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Release verification pipeline over injectable remote clients.
pub struct ReleaseVerifier {
    host: Arc<dyn SourceHost>,
    ci: Arc<dyn CiServer>,
    target: ReleaseTarget,
}

impl ReleaseVerifier {
    pub fn new(host: Arc<dyn SourceHost>, ci: Arc<dyn CiServer>, target: ReleaseTarget) -> Self {
        Self { host, ci, target }
    }

    /// Run manifest, status, CI, branch and pull-request checks in that
    /// order. Never fails: every problem ends up in `log`.
    pub async fn verify(
        &self,
        config: &ReleaseConfig,
        manifest: &Manifest,
        log: &mut ErrorLog,
    ) -> VerificationReport {
        let started = Instant::now();
        info!(
            csdk_version = %config.csdk_version,
            aggregator = %self.target.aggregator,
            "starting release verification"
        );

        let repos = {
            let _span = info_span!("release.check", check = "manifest").entered();
            validate_manifest(manifest, &config.csdk_version, &config.versions, log);
            manifest.repo_paths(&self.target.aggregator, log)
        };

        let libraries = check_statuses(self.host.as_ref(), &self.target, log)
            .instrument(info_span!("release.check", check = "status"))
            .await;

        check_ci_jobs(self.ci.as_ref(), &self.target.ci_jobs, log)
            .instrument(info_span!("release.check", check = "ci"))
            .await;

        check_branches(self.host.as_ref(), &repos, &self.target, log)
            .instrument(info_span!("release.check", check = "branches"))
            .await;

        check_pending_pulls(self.host.as_ref(), &self.target, log)
            .instrument(info_span!("release.check", check = "pulls"))
            .await;

        let report = VerificationReport::from_log(log, libraries);
        info!(
            verdict = ?report.verdict,
            errors = report.error_count,
            notices = report.notices.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "release verification finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_log::ErrorKind;
    use crate::fakes::{MemoryCiServer, MemorySourceHost};

    fn report(verdict: Verdict, errors: usize) -> VerificationReport {
        VerificationReport {
            verdict,
            error_count: errors,
            errors: Vec::new(),
            notices: Vec::new(),
            libraries: Vec::new(),
            generated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_lines() {
        assert_eq!(
            report(Verdict::Pass, 0).summary_line("errors.log"),
            "All release verification passed."
        );
        assert_eq!(
            report(Verdict::Fail, 3).summary_line("out/errors.log"),
            "Release verification failed with 3 error(s); see out/errors.log."
        );
    }

    #[test]
    fn test_report_json_keys() {
        let raw = serde_json::to_value(report(Verdict::Fail, 1)).unwrap();
        assert_eq!(raw["verdict"], "fail");
        assert_eq!(raw["error_count"], 1);
        assert!(raw.get("generated_at").is_some());
    }

    #[tokio::test]
    async fn test_unreachable_services_do_not_abort_the_run() {
        let target = ReleaseTarget::default();
        let host = MemorySourceHost::new().with_failing_repo(&target.aggregator);
        let verifier = ReleaseVerifier::new(
            Arc::new(host),
            Arc::new(MemoryCiServer::new()),
            target.clone(),
        );
        let config = ReleaseConfig {
            csdk_version: "4.0.0".to_string(),
            versions: Default::default(),
            github_access_token: None,
            jenkins_username: None,
            jenkins_password: None,
            disable_jenkins_server_verify: false,
            target,
        };
        let manifest = Manifest {
            name: None,
            version: "4.0.0".to_string(),
            dependencies: Vec::new(),
        };
        let mut log = ErrorLog::in_memory();

        let report = verifier.verify(&config, &manifest, &mut log).await;

        assert_eq!(report.verdict, Verdict::Fail);
        // Two library dirs, the aggregator's status and check-runs, two CI
        // jobs, the branch list and the pull requests.
        assert_eq!(log.count_of(ErrorKind::FailedCheck), 8);
        assert_eq!(report.error_count, log.error_count());
    }
}
