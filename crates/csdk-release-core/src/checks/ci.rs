//! CI job verification.

use tracing::info;

use crate::error_log::{ErrorKind, ErrorLog};
use crate::jenkins::CiServer;

/// Record a `ci-failure` for every job whose last completed build did not
/// report `SUCCESS`.
pub async fn check_ci_jobs(ci: &dyn CiServer, jobs: &[String], log: &mut ErrorLog) {
    for job in jobs {
        let job_url = ci.job_url(job);
        match ci.last_completed_build(job).await {
            Ok(build) if build.is_success() => {
                info!(job = %job_url, build = ?build.number, "CI job passed");
            }
            Ok(build) => log.record(
                ErrorKind::CiFailure,
                job_url.as_str(),
                format!(
                    "Jenkins job failed: {job_url} (last completed build {}: {}).",
                    build
                        .number
                        .map(|n| format!("#{n}"))
                        .unwrap_or_else(|| "unknown".to_string()),
                    build.result.as_deref().unwrap_or("no result")
                ),
            ),
            Err(e) => log.record(
                ErrorKind::FailedCheck,
                job_url.as_str(),
                format!("Could not fetch the last completed build of {job_url}: {e}."),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::MemoryCiServer;

    const DEMOS: &str = "job/csdk/job/demo_pipeline";
    const NIGHTLY: &str = "job/csdk/job/nightly";

    fn jobs() -> Vec<String> {
        vec![DEMOS.to_string(), NIGHTLY.to_string()]
    }

    #[tokio::test]
    async fn test_passing_jobs_record_nothing() {
        let ci = MemoryCiServer::all_passing(&jobs());
        let mut log = ErrorLog::in_memory();
        check_ci_jobs(&ci, &jobs(), &mut log).await;
        assert_eq!(log.error_count(), 0);
    }

    #[tokio::test]
    async fn test_each_non_success_result_is_a_ci_failure() {
        for result in [Some("FAILURE"), Some("UNSTABLE"), Some("ABORTED"), None] {
            let ci = MemoryCiServer::new()
                .with_build(DEMOS, Some("SUCCESS"))
                .with_build(NIGHTLY, result);
            let mut log = ErrorLog::in_memory();

            check_ci_jobs(&ci, &jobs(), &mut log).await;

            assert_eq!(log.count_of(ErrorKind::CiFailure), 1, "result {result:?}");
            let err = &log.errors()[0];
            assert!(err.subject.ends_with(NIGHTLY));
            assert!(err.message.contains("Jenkins job failed"));
        }
    }

    #[tokio::test]
    async fn test_unreachable_job_is_failed_check_and_others_still_run() {
        let ci = MemoryCiServer::new().with_build(NIGHTLY, Some("FAILURE"));
        let mut log = ErrorLog::in_memory();

        check_ci_jobs(&ci, &jobs(), &mut log).await;

        assert_eq!(log.count_of(ErrorKind::FailedCheck), 1);
        assert_eq!(log.count_of(ErrorKind::CiFailure), 1);
        assert!(log.errors()[0].subject.ends_with(DEMOS));
    }
}
