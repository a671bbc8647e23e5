pub mod config;
pub mod flatten;
pub mod preview;
pub mod resolve;

use regraph_core::resolve::{IssueKind, ResolutionIssue};
use regraph_core::console;

pub fn report_issues(issues: &[ResolutionIssue]) {
    for issue in issues {
        let message = match &issue.kind {
            IssueKind::InvalidIdentifier => {
                format!("{} is not a valid author/slug identifier", issue.identifier)
            }
            IssueKind::Cycle => format!("{} depends on itself, branch skipped", issue.identifier),
            IssueKind::DepthLimit => format!(
                "{} is {} levels deep, not resolved",
                issue.identifier, issue.depth
            ),
            IssueKind::UserNotFound => format!("{}: author not found", issue.identifier),
            IssueKind::ComponentNotFound => format!("{}: component not found", issue.identifier),
            IssueKind::FetchFailed { url } => {
                format!("{}: could not fetch {}", issue.identifier, url)
            }
        };
        console::warn(&message);
    }
}
