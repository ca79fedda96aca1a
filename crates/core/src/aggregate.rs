//! Project status aggregation.
//!
//! [`aggregate`] rolls the statuses of a project's child resources (its
//! sandboxes and databases, as one multiset) into a single project-level
//! status. It is a pure function: the repository layer re-reads children and
//! calls it after every child status change, persisting only when the result
//! differs from the stored value.

use crate::status::{ProjectStatus, ResourceStatus};

/// Precedence-ordered rollup of child resource statuses.
///
/// 1. Any child in ERROR dominates everything.
/// 2. Any child still CREATING keeps the whole project CREATING, even if
///    siblings are already RUNNING.
/// 3. All children sharing one status map to that status directly.
/// 4-6. Mixed in-flight combinations collapse to the in-flight side.
/// 7. Anything else is PARTIAL, which is never resolved automatically.
///
/// A project with no children yet is CREATING: its resource rows are
/// inserted in the same transaction that creates it, so this is only
/// observable mid-transaction.
pub fn aggregate(children: &[ResourceStatus]) -> ProjectStatus {
    use ResourceStatus::*;

    if children.is_empty() {
        return ProjectStatus::Creating;
    }

    if children.contains(&Error) {
        return ProjectStatus::Error;
    }

    if children.contains(&Creating) {
        return ProjectStatus::Creating;
    }

    let first = children[0];
    if children.iter().all(|s| *s == first) {
        // Resource and project statuses share ids 1..=8.
        return ProjectStatus::from_id(first.id())
            .expect("resource status ids are a subset of project status ids");
    }

    if children.iter().all(|s| matches!(s, Running | Starting)) {
        return ProjectStatus::Starting;
    }

    if children.iter().all(|s| matches!(s, Stopped | Stopping)) {
        return ProjectStatus::Stopping;
    }

    if children.iter().all(|s| matches!(s, Terminated | Terminating)) {
        return ProjectStatus::Terminating;
    }

    ProjectStatus::Partial
}
