//! Pending pull requests against the release-candidate branch.

use tracing::info;

use crate::config::ReleaseTarget;
use crate::error_log::{ErrorKind, ErrorLog};
use crate::github::{PullRequest, SourceHost};

fn identify(pr: &PullRequest, target: &ReleaseTarget) -> String {
    if !pr.html_url.is_empty() {
        pr.html_url.clone()
    } else if !pr.url.is_empty() {
        pr.url.clone()
    } else {
        format!("{}#{}", target.aggregator, pr.number)
    }
}

/// Record a `pending-pr` for every open pull request targeting the
/// release-candidate branch of the aggregator.
///
/// No pull requests at all is ambiguous with the branch not existing, so it
/// only produces a notice.
pub async fn check_pending_pulls(
    host: &dyn SourceHost,
    target: &ReleaseTarget,
    log: &mut ErrorLog,
) {
    let aggregator = &target.aggregator;
    let rc = target.release_candidate_branch.as_str();

    match host.open_pull_requests(aggregator, rc).await {
        Ok(prs) if prs.is_empty() => log.notice(format!(
            "No open pull requests target {rc} in {aggregator}; the {rc} branch may not exist yet."
        )),
        Ok(prs) => {
            info!(count = prs.len(), "open pull requests target the release candidate");
            for pr in &prs {
                let id = identify(pr, target);
                log.record(
                    ErrorKind::PendingPr,
                    id.as_str(),
                    format!("Pull request to {rc} {id}: {}.", pr.title),
                );
            }
        }
        Err(e) => log.record(
            ErrorKind::FailedCheck,
            format!("{aggregator}:{rc}"),
            format!("Could not list pull requests to {rc} in {aggregator}: {e}."),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{pull_request, MemorySourceHost};

    #[tokio::test]
    async fn test_each_open_pr_is_recorded() {
        let target = ReleaseTarget::default();
        let host = MemorySourceHost::new().with_pull_requests(
            &target.aggregator,
            "release-candidate",
            vec![
                pull_request(&target.aggregator, 1201, "Bump coreHTTP"),
                pull_request(&target.aggregator, 1202, "Fix demo config"),
            ],
        );
        let mut log = ErrorLog::in_memory();

        check_pending_pulls(&host, &target, &mut log).await;

        assert_eq!(log.count_of(ErrorKind::PendingPr), 2);
        assert!(log.errors()[0].subject.ends_with("/pull/1201"));
        assert!(log.errors()[1].message.contains("Fix demo config"));
        assert!(log.notices().is_empty());
    }

    #[tokio::test]
    async fn test_no_prs_is_notice_not_error() {
        let target = ReleaseTarget::default();
        let host = MemorySourceHost::new();
        let mut log = ErrorLog::in_memory();

        check_pending_pulls(&host, &target, &mut log).await;

        assert_eq!(log.error_count(), 0);
        assert_eq!(log.notices().len(), 1);
        assert!(log.notices()[0].contains("may not exist"));
    }

    #[tokio::test]
    async fn test_prs_to_other_bases_are_ignored() {
        let target = ReleaseTarget::default();
        let host = MemorySourceHost::new().with_pull_requests(
            &target.aggregator,
            "master",
            vec![pull_request(&target.aggregator, 7, "Docs")],
        );
        let mut log = ErrorLog::in_memory();

        check_pending_pulls(&host, &target, &mut log).await;

        assert_eq!(log.error_count(), 0);
    }

    #[test]
    fn test_identify_falls_back_to_number() {
        let target = ReleaseTarget::default();
        let pr = PullRequest {
            number: 9,
            title: String::new(),
            url: String::new(),
            html_url: String::new(),
        };
        assert_eq!(identify(&pr, &target), "aws/aws-iot-device-sdk-embedded-c#9");
    }

    #[tokio::test]
    async fn test_api_failure_is_failed_check() {
        let target = ReleaseTarget::default();
        let host = MemorySourceHost::new().with_failing_repo(&target.aggregator);
        let mut log = ErrorLog::in_memory();

        check_pending_pulls(&host, &target, &mut log).await;

        assert_eq!(log.count_of(ErrorKind::FailedCheck), 1);
        assert!(log.notices().is_empty());
    }
}
