//! The remote verification steps.
//!
//! Each check takes the remote view it needs plus the run's [`ErrorLog`] and
//! records every finding instead of returning early. Remote call failures are
//! recorded as `failed-check` so one unreachable repository does not hide the
//! state of the others.
//!
//! [`ErrorLog`]: crate::error_log::ErrorLog

pub mod branches;
pub mod ci;
pub mod pulls;
pub mod status;

pub use branches::{check_branches, invalid_branches};
pub use ci::check_ci_jobs;
pub use pulls::check_pending_pulls;
pub use status::{check_statuses, LibraryDocs};
